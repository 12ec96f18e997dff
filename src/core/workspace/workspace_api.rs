use async_trait::async_trait;

use super::workspace_models::{
    CalendarEvent, CreatedDocument, CreatedEvent, Credential, EventQuery, NewCalendarEvent,
};
use crate::core::errors::UpstreamError;

/// Calendar operations against the user's primary calendar.
#[async_trait]
pub trait CalendarApi: Send + Sync {
    async fn insert_event(
        &self,
        credential: &Credential,
        event: &NewCalendarEvent,
    ) -> Result<CreatedEvent, UpstreamError>;

    /// Lists events ordered by start time, recurring events expanded.
    async fn list_events(
        &self,
        credential: &Credential,
        query: &EventQuery,
    ) -> Result<Vec<CalendarEvent>, UpstreamError>;
}

/// Document operations (Drive for creation/export, Docs for edits).
#[async_trait]
pub trait DocumentApi: Send + Sync {
    async fn create_document(
        &self,
        credential: &Credential,
        title: &str,
    ) -> Result<CreatedDocument, UpstreamError>;

    /// Inserts `text` at the start of the document body.
    async fn insert_text_at_start(
        &self,
        credential: &Credential,
        document_id: &str,
        text: &str,
    ) -> Result<(), UpstreamError>;

    async fn export_pdf(
        &self,
        credential: &Credential,
        document_id: &str,
    ) -> Result<Vec<u8>, UpstreamError>;
}
