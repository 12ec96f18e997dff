use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::core::ai::{AiProvider, AiService, ChatTurn, DispatchOutcome};
use crate::core::errors::UpstreamError;
use crate::core::tools::ToolContext;
use crate::core::workspace::{
    Credential, DocumentError, DocumentService, DocumentSessions, DocumentWrite,
};

/// Title of documents created from the chat flags.
const CHAT_DOCUMENT_TITLE: &str = "Assistant Chat Notes";

#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    pub history: Vec<ChatTurn>,
    #[serde(default)]
    pub user_token: Option<String>,
    /// Put the reply into a new Google Doc.
    #[serde(default)]
    pub create_google_doc: bool,
    /// Put the reply into the conversation's Google Doc and export it as PDF.
    #[serde(default)]
    pub save_doc: bool,
    #[serde(default)]
    pub conversation_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatResponse {
    pub message: String,
    pub google_doc_url: Option<String>,
    pub download_info: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("Chat history is empty.")]
    EmptyHistory,
    #[error("User authentication token is required to save Google Docs.")]
    MissingCredential,
    #[error("Error calling Gemini API: {0}")]
    Provider(#[from] UpstreamError),
    #[error("Error saving Google Doc: {0}")]
    Document(#[from] DocumentError),
}

pub struct ChatService<P: AiProvider> {
    ai: AiService<P>,
    sessions: DocumentSessions,
    documents: Arc<DocumentService>,
}

impl<P: AiProvider> ChatService<P> {
    pub fn new(ai: AiService<P>, documents: Arc<DocumentService>) -> Self {
        Self {
            ai,
            sessions: DocumentSessions::new(),
            documents,
        }
    }

    pub async fn handle(&self, request: ChatRequest) -> Result<ChatResponse, ChatError> {
        if request.history.is_empty() {
            return Err(ChatError::EmptyHistory);
        }

        let credential = request
            .user_token
            .as_deref()
            .and_then(Credential::from_user_token);
        let wants_document = request.create_google_doc || request.save_doc;
        if wants_document && credential.is_none() {
            return Err(ChatError::MissingCredential);
        }

        let ctx = ToolContext {
            credential,
            session: self.sessions.session(request.conversation_id.as_deref()),
        };

        let reply = self.ai.respond(&request.history, &ctx).await?;
        match &reply.outcome {
            DispatchOutcome::NoToolCall => tracing::debug!("Model replied without a tool call"),
            DispatchOutcome::ToolCallMatched { name, succeeded } => {
                tracing::info!(tool = %name, succeeded, "Chat turn used a tool")
            }
            DispatchOutcome::ToolCallUnrecognized { name } => {
                tracing::debug!(tool = %name, "Chat turn asked for an unsupported tool")
            }
        }

        let mut response = ChatResponse {
            message: reply.message,
            google_doc_url: None,
            download_info: None,
        };

        if let (true, Some(credential)) = (wants_document, ctx.credential.as_ref()) {
            let written = self
                .documents
                .write(
                    &ctx.session,
                    credential,
                    DocumentWrite {
                        title: CHAT_DOCUMENT_TITLE.to_string(),
                        text: response.message.clone(),
                        time: None,
                        create_only: request.create_google_doc,
                        download: request.save_doc,
                    },
                )
                .await?;
            response.google_doc_url = Some(written.url);
            response.download_info = written
                .pdf_path
                .map(|path| format!("PDF saved to {}", path.display()));
        }

        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ai::ai_service::fakes::ScriptedProvider;
    use crate::core::ai::AiConfig;
    use crate::core::clock::FixedClock;
    use crate::core::errors::ErrorKind;
    use crate::core::tools::{
        CreateCalendarEventTool, CreateGoogleDocTool, HelloWorldTool, ReadCalendarEventsTool,
        ToolRegistry,
    };
    use crate::core::workspace::fakes::{FakeCalendarApi, FakeDocumentApi};
    use chrono::{TimeZone, Utc};
    use serde_json::json;
    use std::path::Path;

    struct Harness {
        service: ChatService<Arc<ScriptedProvider>>,
        provider: Arc<ScriptedProvider>,
        calendar: Arc<FakeCalendarApi>,
        docs: Arc<FakeDocumentApi>,
    }

    fn harness(provider: ScriptedProvider, downloads: &Path) -> Harness {
        let provider = Arc::new(provider);
        let calendar = Arc::new(FakeCalendarApi::default());
        let docs = Arc::new(FakeDocumentApi::default());
        let clock = Arc::new(FixedClock(Utc.with_ymd_and_hms(2025, 4, 1, 16, 0, 0).unwrap()));
        let tz = chrono_tz::America::New_York;
        let documents = Arc::new(DocumentService::new(docs.clone(), clock.clone(), tz, downloads));

        let mut registry = ToolRegistry::new();
        registry
            .register(CreateCalendarEventTool::new(calendar.clone(), tz))
            .unwrap();
        registry
            .register(ReadCalendarEventsTool::new(calendar.clone(), clock, tz))
            .unwrap();
        registry
            .register(CreateGoogleDocTool::new(documents.clone()))
            .unwrap();
        registry.register(HelloWorldTool).unwrap();

        let ai = AiService::new(provider.clone(), AiConfig::default(), Arc::new(registry));
        Harness {
            service: ChatService::new(ai, documents),
            provider,
            calendar,
            docs,
        }
    }

    fn request(text: &str) -> ChatRequest {
        ChatRequest {
            history: vec![ChatTurn::user(text)],
            user_token: None,
            create_google_doc: false,
            save_doc: false,
            conversation_id: None,
        }
    }

    #[tokio::test]
    async fn test_say_hello_scenario() {
        let dir = tempfile::tempdir().unwrap();
        let h = harness(
            ScriptedProvider::call("Here you go.", "say_hello_world", json!({})),
            dir.path(),
        );

        let response = h.service.handle(request("say hello")).await.unwrap();

        assert!(response
            .message
            .ends_with("Tool Result: hello world tool call TEST"));
        assert_eq!(response.google_doc_url, None);
        assert_eq!(h.provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_calendar_without_token_scenario() {
        let dir = tempfile::tempdir().unwrap();
        let h = harness(
            ScriptedProvider::call(
                "I'll add that to your calendar.",
                "create_calendar_event",
                json!({
                    "summary": "Product Review",
                    "start_time": "2025-04-17T14:00:00",
                    "end_time": "2025-04-17T15:00:00"
                }),
            ),
            dir.path(),
        );

        let response = h
            .service
            .handle(request("Schedule a product review on April 17 at 2pm"))
            .await
            .unwrap();

        assert!(response.message.contains(
            "Calendar Result: Error: User authentication token is required to create calendar events."
        ));
        assert_eq!(h.calendar.call_count(), 0);
    }

    #[tokio::test]
    async fn test_calendar_with_token_string_arguments() {
        let dir = tempfile::tempdir().unwrap();
        let h = harness(
            ScriptedProvider::call(
                "Done.",
                "create_calendar_event",
                json!(r#"{"summary":"Standup","start_time":"2025-04-02T09:00:00","end_time":"2025-04-02T09:15:00"}"#),
            ),
            dir.path(),
        );

        let response = h
            .service
            .handle(ChatRequest {
                user_token: Some("ya29.raw-token".to_string()),
                ..request("Add standup tomorrow at 9")
            })
            .await
            .unwrap();

        assert_eq!(
            response.message,
            "Done.\n\nCalendar Result: Event created: Standup\nLink: https://calendar.google.com/event?eid=evt-1"
        );
        assert_eq!(h.calendar.inserted()[0].summary, "Standup");
    }

    #[tokio::test]
    async fn test_empty_history_rejected_before_model_call() {
        let dir = tempfile::tempdir().unwrap();
        let h = harness(ScriptedProvider::text("unused"), dir.path());

        let err = h
            .service
            .handle(ChatRequest {
                history: Vec::new(),
                ..request("")
            })
            .await
            .unwrap_err();

        assert!(matches!(err, ChatError::EmptyHistory));
        assert_eq!(err.to_string(), "Chat history is empty.");
        assert_eq!(h.provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_document_flags_need_a_token() {
        let dir = tempfile::tempdir().unwrap();
        let h = harness(ScriptedProvider::text("unused"), dir.path());

        let err = h
            .service
            .handle(ChatRequest {
                save_doc: true,
                ..request("save this")
            })
            .await
            .unwrap_err();

        assert!(matches!(err, ChatError::MissingCredential));
        assert_eq!(h.provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_save_doc_writes_reply_and_exports() {
        let dir = tempfile::tempdir().unwrap();
        let h = harness(ScriptedProvider::text("Photosynthesis notes"), dir.path());

        let response = h
            .service
            .handle(ChatRequest {
                user_token: Some("tok".to_string()),
                save_doc: true,
                conversation_id: Some("c-1".to_string()),
                ..request("summarize")
            })
            .await
            .unwrap();

        assert_eq!(
            response.google_doc_url.as_deref(),
            Some("https://docs.google.com/document/d/doc-1/edit")
        );
        let expected = dir.path().join("Assistant Chat Notes.pdf");
        assert_eq!(
            response.download_info,
            Some(format!("PDF saved to {}", expected.display()))
        );
        // 16:00 UTC is 12:00 in New York in April
        assert_eq!(h.docs.inserts()[0].1, "12:00:00 - Photosynthesis notes\n");
    }

    #[tokio::test]
    async fn test_document_tool_then_save_doc_share_the_conversation_document() {
        let dir = tempfile::tempdir().unwrap();
        let h = harness(
            ScriptedProvider::call(
                "Noted.",
                "create_google_doc",
                json!({"title": "Lab", "description": "step one"}),
            ),
            dir.path(),
        );

        let response = h
            .service
            .handle(ChatRequest {
                user_token: Some("tok".to_string()),
                save_doc: true,
                conversation_id: Some("lab".to_string()),
                ..request("write it down")
            })
            .await
            .unwrap();

        assert_eq!(h.docs.created_titles(), vec!["Lab".to_string()]);
        assert_eq!(h.docs.inserts().len(), 2);
        assert_eq!(
            response.google_doc_url.as_deref(),
            Some("https://docs.google.com/document/d/doc-1/edit")
        );
    }

    #[tokio::test]
    async fn test_provider_failure_message() {
        let dir = tempfile::tempdir().unwrap();
        let h = harness(
            ScriptedProvider::failing(UpstreamError::new(
                "Gemini",
                ErrorKind::Unavailable,
                "HTTP 503: overloaded",
            )),
            dir.path(),
        );

        let err = h.service.handle(request("hi")).await.unwrap_err();
        assert!(err
            .to_string()
            .starts_with("Error calling Gemini API: Gemini error"));
    }
}
