use chrono_tz::Tz;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::document_session::SessionHandle;
use super::workspace_api::DocumentApi;
use super::workspace_models::{document_url, Credential};
use crate::core::clock::Clock;
use crate::core::errors::UpstreamError;

#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("{0}")]
    Upstream(#[from] UpstreamError),
    #[error("Failed to save PDF: {0}")]
    Io(#[from] std::io::Error),
}

impl DocumentError {
    pub fn is_retryable(&self) -> bool {
        match self {
            DocumentError::Upstream(e) => e.is_retryable(),
            DocumentError::Io(_) => false,
        }
    }
}

/// One line to write into a conversation's document.
#[derive(Debug, Clone)]
pub struct DocumentWrite {
    /// Title used when a new document has to be created.
    pub title: String,
    pub text: String,
    /// Timestamp prefix; defaults to the current wall-clock time.
    pub time: Option<String>,
    /// Always start a new document, even if the session already has one.
    pub create_only: bool,
    /// Export the document as PDF into the downloads folder afterwards.
    pub download: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DocumentWriteResult {
    pub document_id: String,
    pub url: String,
    pub created: bool,
    pub pdf_path: Option<PathBuf>,
}

/// Creates, appends to and exports Google Docs on behalf of a conversation.
pub struct DocumentService {
    api: Arc<dyn DocumentApi>,
    clock: Arc<dyn Clock>,
    time_zone: Tz,
    downloads_dir: PathBuf,
}

impl DocumentService {
    pub fn new(
        api: Arc<dyn DocumentApi>,
        clock: Arc<dyn Clock>,
        time_zone: Tz,
        downloads_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            api,
            clock,
            time_zone,
            downloads_dir: downloads_dir.into(),
        }
    }

    /// Writes a timestamped line into the session's document, creating the
    /// document first when the session has none (or `create_only` is set).
    pub async fn write(
        &self,
        session: &SessionHandle,
        credential: &Credential,
        request: DocumentWrite,
    ) -> Result<DocumentWriteResult, DocumentError> {
        // Held until the write finishes so concurrent calls in the same
        // conversation serialize on the document.
        let mut session = session.lock().await;

        let (document_id, created) = match (&session.last_document_id, request.create_only) {
            (Some(existing), false) => (existing.clone(), false),
            _ => {
                let document = self.api.create_document(credential, &request.title).await?;
                tracing::info!(document_id = %document.id, "Created Google Doc");
                session.last_document_id = Some(document.id.clone());
                (document.id, true)
            }
        };

        let time = request.time.unwrap_or_else(|| {
            self.clock
                .now()
                .with_timezone(&self.time_zone)
                .format("%H:%M:%S")
                .to_string()
        });
        let line = format!("{} - {}\n", time, request.text);
        self.api
            .insert_text_at_start(credential, &document_id, &line)
            .await?;

        let pdf_path = if request.download {
            let bytes = self.api.export_pdf(credential, &document_id).await?;
            let path = self.downloads_dir.join(pdf_file_name(&request.title));
            save_file(&path, &bytes).await?;
            tracing::info!(path = %path.display(), "Exported Google Doc as PDF");
            Some(path)
        } else {
            None
        };

        Ok(DocumentWriteResult {
            url: document_url(&document_id),
            document_id,
            created,
            pdf_path,
        })
    }
}

async fn save_file(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, bytes).await
}

/// File name for an exported document, safe on every platform.
fn pdf_file_name(title: &str) -> String {
    let stem: String = title
        .trim()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '-' | '_' | ' ') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let stem = stem.trim();

    if stem.is_empty() {
        "document.pdf".to_string()
    } else {
        format!("{}.pdf", stem)
    }
}
