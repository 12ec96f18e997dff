use async_trait::async_trait;
use serde_json::{Map, Value};

use super::registry::{Tool, ToolContext};
use super::tool_error::ToolError;
use crate::core::ai::models::{FunctionDef, FunctionParameters};

/// Connectivity check for the dispatch path. Takes no arguments.
pub struct HelloWorldTool;

#[async_trait]
impl Tool for HelloWorldTool {
    fn declaration(&self) -> FunctionDef {
        FunctionDef {
            name: "say_hello_world".to_string(),
            description: "Returns a fixed greeting. Use it when the user asks you to say hello."
                .to_string(),
            parameters: FunctionParameters::object(),
        }
    }

    async fn call(
        &self,
        _args: Map<String, Value>,
        _ctx: &ToolContext,
    ) -> Result<String, ToolError> {
        Ok("hello world tool call TEST".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::workspace::DocumentSessions;

    #[tokio::test]
    async fn test_hello_ignores_arguments() {
        let ctx = ToolContext {
            credential: None,
            session: DocumentSessions::new().session(None),
        };
        let mut args = Map::new();
        args.insert("unexpected".to_string(), Value::Bool(true));

        let result = HelloWorldTool.call(args, &ctx).await.unwrap();
        assert_eq!(result, "hello world tool call TEST");
        assert_eq!(HelloWorldTool.result_label(), "Tool Result");
    }
}
