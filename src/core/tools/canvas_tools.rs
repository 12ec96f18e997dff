use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::sync::Arc;

use super::registry::{parse_args, Tool, ToolContext};
use super::tool_error::ToolError;
use crate::core::ai::models::{FunctionDef, FunctionParameters, PropertyDef};
use crate::core::canvas::CanvasService;

/// Lists future-due assignments of the configured term's courses. Only
/// registered when a Canvas API key is present.
pub struct UpcomingAssignmentsTool {
    service: Arc<CanvasService>,
}

impl UpcomingAssignmentsTool {
    pub fn new(service: Arc<CanvasService>) -> Self {
        Self { service }
    }
}

#[derive(Debug, Deserialize)]
struct UpcomingArgs {
    course_filter: Option<String>,
}

#[async_trait]
impl Tool for UpcomingAssignmentsTool {
    fn declaration(&self) -> FunctionDef {
        FunctionDef {
            name: "list_upcoming_assignments".to_string(),
            description: format!(
                "Lists Canvas assignments that are not yet due for the user's {} courses.",
                self.service.term()
            ),
            parameters: FunctionParameters::object().property(
                "course_filter",
                PropertyDef::string("Only include courses whose name contains this text."),
            ),
        }
    }

    fn result_label(&self) -> &'static str {
        "Canvas Result"
    }

    async fn call(
        &self,
        args: Map<String, Value>,
        _ctx: &ToolContext,
    ) -> Result<String, ToolError> {
        let args: UpcomingArgs = parse_args(args)?;
        let upcoming = self
            .service
            .upcoming_assignments(args.course_filter.as_deref())
            .await
            .map_err(|source| ToolError::Canvas {
                action: "listing Canvas assignments",
                source,
            })?;

        if upcoming.is_empty() {
            return Ok("No upcoming assignments found.".to_string());
        }

        let lines: Vec<String> = upcoming
            .iter()
            .map(|u| format!("- {} ({}): due {}", u.name, u.course_name, u.due_display()))
            .collect();
        Ok(format!("Upcoming assignments:\n{}", lines.join("\n")))
    }
}
