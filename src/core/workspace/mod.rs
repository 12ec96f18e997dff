// Google Workspace domain: calendar events and documents.
//
// The traits here are implemented by `infra::google`; tools and the chat
// service only depend on these types.

pub mod document_service;
pub mod document_session;
pub mod workspace_api;
pub mod workspace_models;

#[cfg(test)]
pub mod fakes;

pub use document_service::{DocumentError, DocumentService, DocumentWrite, DocumentWriteResult};
pub use document_session::{DocumentSessions, SessionHandle};
pub use workspace_api::{CalendarApi, DocumentApi};
pub use workspace_models::{
    document_url, CalendarEvent, CreatedDocument, CreatedEvent, Credential, EventQuery,
    NewCalendarEvent, TokenBundle,
};
