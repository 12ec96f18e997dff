// In-memory stand-ins for the Google APIs, shared by the core tests.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use super::workspace_api::{CalendarApi, DocumentApi};
use super::workspace_models::{
    CalendarEvent, CreatedDocument, CreatedEvent, Credential, EventQuery, NewCalendarEvent,
};
use crate::core::errors::{ErrorKind, UpstreamError};

#[derive(Default)]
pub struct FakeCalendarApi {
    pub fail_with: Option<ErrorKind>,
    pub events: Vec<CalendarEvent>,
    inserted: Mutex<Vec<NewCalendarEvent>>,
    queries: Mutex<Vec<EventQuery>>,
}

impl FakeCalendarApi {
    pub fn with_events(events: Vec<CalendarEvent>) -> Self {
        Self {
            events,
            ..Default::default()
        }
    }

    pub fn failing(kind: ErrorKind) -> Self {
        Self {
            fail_with: Some(kind),
            ..Default::default()
        }
    }

    pub fn inserted(&self) -> Vec<NewCalendarEvent> {
        self.inserted.lock().unwrap().clone()
    }

    pub fn queries(&self) -> Vec<EventQuery> {
        self.queries.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.inserted.lock().unwrap().len() + self.queries.lock().unwrap().len()
    }

    fn check(&self) -> Result<(), UpstreamError> {
        match self.fail_with {
            Some(kind) => Err(UpstreamError::new("Calendar", kind, "simulated failure")),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl CalendarApi for FakeCalendarApi {
    async fn insert_event(
        &self,
        _credential: &Credential,
        event: &NewCalendarEvent,
    ) -> Result<CreatedEvent, UpstreamError> {
        self.inserted.lock().unwrap().push(event.clone());
        self.check()?;
        Ok(CreatedEvent {
            id: "evt-1".to_string(),
            html_link: Some("https://calendar.google.com/event?eid=evt-1".to_string()),
        })
    }

    async fn list_events(
        &self,
        _credential: &Credential,
        query: &EventQuery,
    ) -> Result<Vec<CalendarEvent>, UpstreamError> {
        self.queries.lock().unwrap().push(query.clone());
        self.check()?;
        Ok(self.events.clone())
    }
}

#[derive(Default)]
pub struct FakeDocumentApi {
    fail: bool,
    next_id: AtomicUsize,
    created: Mutex<Vec<String>>,
    inserts: Mutex<Vec<(String, String)>>,
}

impl FakeDocumentApi {
    pub const PDF_BYTES: &'static [u8] = b"%PDF-1.4 fake";

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn created_titles(&self) -> Vec<String> {
        self.created.lock().unwrap().clone()
    }

    pub fn inserts(&self) -> Vec<(String, String)> {
        self.inserts.lock().unwrap().clone()
    }
}

#[async_trait]
impl DocumentApi for FakeDocumentApi {
    async fn create_document(
        &self,
        _credential: &Credential,
        title: &str,
    ) -> Result<CreatedDocument, UpstreamError> {
        if self.fail {
            return Err(UpstreamError::from_status("Drive", 500, "backend error"));
        }
        // Yield so concurrent callers interleave inside the critical section.
        tokio::task::yield_now().await;
        self.created.lock().unwrap().push(title.to_string());
        let n = self.next_id.fetch_add(1, Ordering::SeqCst);
        Ok(CreatedDocument {
            id: format!("doc-{}", n + 1),
        })
    }

    async fn insert_text_at_start(
        &self,
        _credential: &Credential,
        document_id: &str,
        text: &str,
    ) -> Result<(), UpstreamError> {
        self.inserts
            .lock()
            .unwrap()
            .push((document_id.to_string(), text.to_string()));
        Ok(())
    }

    async fn export_pdf(
        &self,
        _credential: &Credential,
        _document_id: &str,
    ) -> Result<Vec<u8>, UpstreamError> {
        Ok(Self::PDF_BYTES.to_vec())
    }
}
