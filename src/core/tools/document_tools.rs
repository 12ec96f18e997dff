use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::sync::Arc;

use super::registry::{parse_args, require, Tool, ToolContext};
use super::tool_error::ToolError;
use crate::core::ai::models::{FunctionDef, FunctionParameters, PropertyDef};
use crate::core::workspace::{DocumentService, DocumentWrite};

pub struct CreateGoogleDocTool {
    service: Arc<DocumentService>,
}

impl CreateGoogleDocTool {
    pub fn new(service: Arc<DocumentService>) -> Self {
        Self { service }
    }
}

#[derive(Debug, Deserialize)]
struct CreateDocArgs {
    title: Option<String>,
    description: Option<String>,
    time: Option<String>,
    #[serde(default)]
    download: bool,
    #[serde(default)]
    create_only: bool,
}

#[async_trait]
impl Tool for CreateGoogleDocTool {
    fn declaration(&self) -> FunctionDef {
        FunctionDef {
            name: "create_google_doc".to_string(),
            description: "Writes a timestamped note into the conversation's Google Doc, \
                          creating the document if needed."
                .to_string(),
            parameters: FunctionParameters::object()
                .required_property("title", PropertyDef::string("Title of the document."))
                .required_property(
                    "description",
                    PropertyDef::string("Text to write into the document."),
                )
                .property(
                    "time",
                    PropertyDef::string("Timestamp to prefix the text with. Defaults to now."),
                )
                .property(
                    "download",
                    PropertyDef::boolean("Also export the document as a PDF."),
                )
                .property(
                    "create_only",
                    PropertyDef::boolean("Always start a new document instead of appending."),
                ),
        }
    }

    fn result_label(&self) -> &'static str {
        "Document Result"
    }

    async fn call(
        &self,
        args: Map<String, Value>,
        ctx: &ToolContext,
    ) -> Result<String, ToolError> {
        let credential = ctx.credential.as_ref().ok_or(ToolError::MissingCredential {
            action: "create Google Docs",
        })?;

        let args: CreateDocArgs = parse_args(args)?;
        let write = DocumentWrite {
            title: require(args.title, "title")?,
            text: require(args.description, "description")?,
            time: args.time.filter(|t| !t.trim().is_empty()),
            create_only: args.create_only,
            download: args.download,
        };

        let result = self
            .service
            .write(&ctx.session, credential, write)
            .await
            .map_err(|source| ToolError::Document {
                action: "writing Google Doc",
                source,
            })?;

        let verb = if result.created { "created" } else { "updated" };
        let mut text = format!("Document {}: {}", verb, result.url);
        if let Some(path) = result.pdf_path {
            text.push_str(&format!("\nPDF saved to {}", path.display()));
        }
        Ok(text)
    }
}
