// =============================================================================
// GOOGLE WORKSPACE CLIENT
// =============================================================================
//
// reqwest implementation of `CalendarApi` and `DocumentApi`, authenticated
// with the user's OAuth access token.
//
// - Calendar v3: `calendars/primary/events` (insert, list)
// - Drive v3: `files` (create a Docs file), `files/{id}/export` (PDF)
// - Docs v1: `documents/{id}:batchUpdate` (insertText)

use async_trait::async_trait;
use chrono::SecondsFormat;
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::core::errors::UpstreamError;
use crate::core::workspace::{
    CalendarApi, CalendarEvent, CreatedDocument, CreatedEvent, Credential, DocumentApi,
    EventQuery, NewCalendarEvent,
};
use crate::infra::upstream;

const CALENDAR_URL: &str = "https://www.googleapis.com/calendar/v3/calendars/primary/events";
const DRIVE_FILES_URL: &str = "https://www.googleapis.com/drive/v3/files";
const DOCS_URL: &str = "https://docs.googleapis.com/v1/documents";

const GOOGLE_DOC_MIME: &str = "application/vnd.google-apps.document";

// =============================================================================
// CALENDAR WIRE TYPES
// =============================================================================

#[derive(Debug, Serialize)]
struct EventDateTime {
    #[serde(rename = "dateTime")]
    date_time: String,
    #[serde(rename = "timeZone")]
    time_zone: String,
}

#[derive(Debug, Serialize)]
struct Attendee {
    email: String,
}

#[derive(Debug, Serialize)]
struct EventBody {
    summary: String,
    start: EventDateTime,
    end: EventDateTime,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    location: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    attendees: Vec<Attendee>,
}

impl From<&NewCalendarEvent> for EventBody {
    fn from(event: &NewCalendarEvent) -> Self {
        Self {
            summary: event.summary.clone(),
            start: EventDateTime {
                date_time: event.start_time.clone(),
                time_zone: event.time_zone.clone(),
            },
            end: EventDateTime {
                date_time: event.end_time.clone(),
                time_zone: event.time_zone.clone(),
            },
            description: event.description.clone(),
            location: event.location.clone(),
            attendees: event
                .attendees
                .iter()
                .map(|email| Attendee {
                    email: email.clone(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InsertedEvent {
    id: String,
    #[serde(default)]
    html_link: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventTime {
    #[serde(default)]
    date_time: Option<String>,
    #[serde(default)]
    date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ListedEvent {
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    start: EventTime,
}

#[derive(Debug, Deserialize)]
struct EventList {
    #[serde(default)]
    items: Vec<ListedEvent>,
}

impl From<ListedEvent> for CalendarEvent {
    fn from(event: ListedEvent) -> Self {
        Self {
            summary: event.summary.unwrap_or_else(|| "(no title)".to_string()),
            start: event.start.date_time.or(event.start.date).unwrap_or_default(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct DriveFile {
    id: String,
}

// =============================================================================
// CLIENT
// =============================================================================

pub struct GoogleWorkspaceClient {
    client: Client,
}

impl GoogleWorkspaceClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn authorized(&self, request: RequestBuilder, credential: &Credential) -> RequestBuilder {
        request.bearer_auth(credential.access_token())
    }

    fn list_params(query: &EventQuery) -> Vec<(&'static str, String)> {
        let mut params = vec![
            (
                "timeMin",
                query.time_min.to_rfc3339_opts(SecondsFormat::Secs, true),
            ),
            ("maxResults", query.max_results.to_string()),
            ("singleEvents", "true".to_string()),
            ("orderBy", "startTime".to_string()),
        ];
        if let Some(time_max) = query.time_max {
            params.push(("timeMax", time_max.to_rfc3339_opts(SecondsFormat::Secs, true)));
        }
        params
    }

    fn insert_text_body(text: &str) -> serde_json::Value {
        json!({
            "requests": [{
                "insertText": {
                    "location": {"index": 1},
                    "text": text
                }
            }]
        })
    }
}

#[async_trait]
impl CalendarApi for GoogleWorkspaceClient {
    async fn insert_event(
        &self,
        credential: &Credential,
        event: &NewCalendarEvent,
    ) -> Result<CreatedEvent, UpstreamError> {
        const SERVICE: &str = "Calendar";

        let response = self
            .authorized(self.client.post(CALENDAR_URL), credential)
            .json(&EventBody::from(event))
            .send()
            .await
            .map_err(|e| upstream::from_reqwest(SERVICE, e))?;

        let inserted: InsertedEvent = upstream::read_json(SERVICE, response).await?;
        Ok(CreatedEvent {
            id: inserted.id,
            html_link: inserted.html_link,
        })
    }

    async fn list_events(
        &self,
        credential: &Credential,
        query: &EventQuery,
    ) -> Result<Vec<CalendarEvent>, UpstreamError> {
        const SERVICE: &str = "Calendar";

        let response = self
            .authorized(self.client.get(CALENDAR_URL), credential)
            .query(&Self::list_params(query))
            .send()
            .await
            .map_err(|e| upstream::from_reqwest(SERVICE, e))?;

        let list: EventList = upstream::read_json(SERVICE, response).await?;
        Ok(list.items.into_iter().map(CalendarEvent::from).collect())
    }
}

#[async_trait]
impl DocumentApi for GoogleWorkspaceClient {
    async fn create_document(
        &self,
        credential: &Credential,
        title: &str,
    ) -> Result<CreatedDocument, UpstreamError> {
        const SERVICE: &str = "Drive";

        let response = self
            .authorized(self.client.post(DRIVE_FILES_URL), credential)
            .json(&json!({"name": title, "mimeType": GOOGLE_DOC_MIME}))
            .send()
            .await
            .map_err(|e| upstream::from_reqwest(SERVICE, e))?;

        let file: DriveFile = upstream::read_json(SERVICE, response).await?;
        Ok(CreatedDocument { id: file.id })
    }

    async fn insert_text_at_start(
        &self,
        credential: &Credential,
        document_id: &str,
        text: &str,
    ) -> Result<(), UpstreamError> {
        const SERVICE: &str = "Docs";

        let url = format!("{}/{}:batchUpdate", DOCS_URL, document_id);
        let response = self
            .authorized(self.client.post(&url), credential)
            .json(&Self::insert_text_body(text))
            .send()
            .await
            .map_err(|e| upstream::from_reqwest(SERVICE, e))?;

        upstream::check_status(SERVICE, response).await?;
        Ok(())
    }

    async fn export_pdf(
        &self,
        credential: &Credential,
        document_id: &str,
    ) -> Result<Vec<u8>, UpstreamError> {
        const SERVICE: &str = "Drive";

        let url = format!("{}/{}/export", DRIVE_FILES_URL, document_id);
        let response = self
            .authorized(self.client.get(&url), credential)
            .query(&[("mimeType", "application/pdf")])
            .send()
            .await
            .map_err(|e| upstream::from_reqwest(SERVICE, e))?;

        let response = upstream::check_status(SERVICE, response).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| upstream::from_reqwest(SERVICE, e))?;
        Ok(bytes.to_vec())
    }
}
