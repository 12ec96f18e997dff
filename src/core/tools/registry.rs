// =============================================================================
// TOOL REGISTRY
// =============================================================================
//
// One table is the only place a tool is described. The declarations sent to
// the model and the dispatch lookup are both read from it, so a tool cannot
// be advertised without a handler (or handled without being advertised).

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;

use super::tool_error::ToolError;
use crate::core::ai::models::FunctionDef;
use crate::core::workspace::{Credential, SessionHandle};

/// Per-request state handed to every tool.
pub struct ToolContext {
    pub credential: Option<Credential>,
    pub session: SessionHandle,
}

#[async_trait]
pub trait Tool: Send + Sync {
    /// Schema advertised to the model. Its `name` is the dispatch key.
    fn declaration(&self) -> FunctionDef;

    /// Prefix of the result block appended to the model's reply.
    fn result_label(&self) -> &'static str {
        "Tool Result"
    }

    async fn call(&self, args: Map<String, Value>, ctx: &ToolContext)
        -> Result<String, ToolError>;
}

pub struct RegisteredTool {
    pub declaration: FunctionDef,
    pub label: &'static str,
    pub tool: Arc<dyn Tool>,
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("Tool '{0}' is already registered")]
    Duplicate(String),
}

#[derive(Default)]
pub struct ToolRegistry {
    order: Vec<String>,
    tools: HashMap<String, RegisteredTool>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<T: Tool + 'static>(&mut self, tool: T) -> Result<(), RegistryError> {
        let declaration = tool.declaration();
        let name = declaration.name.clone();
        if self.tools.contains_key(&name) {
            return Err(RegistryError::Duplicate(name));
        }

        tracing::debug!(tool = %name, "Registered tool");
        self.order.push(name.clone());
        self.tools.insert(
            name,
            RegisteredTool {
                declaration,
                label: tool.result_label(),
                tool: Arc::new(tool),
            },
        );
        Ok(())
    }

    /// Declarations in registration order.
    pub fn declarations(&self) -> Vec<FunctionDef> {
        self.order
            .iter()
            .filter_map(|name| self.tools.get(name))
            .map(|entry| entry.declaration.clone())
            .collect()
    }

    pub fn get(&self, name: &str) -> Option<&RegisteredTool> {
        self.tools.get(name)
    }

    pub fn names(&self) -> &[String] {
        &self.order
    }
}

/// Deserializes normalized arguments into a tool's typed argument struct.
pub fn parse_args<T: DeserializeOwned>(args: Map<String, Value>) -> Result<T, ToolError> {
    serde_json::from_value(Value::Object(args))
        .map_err(|e| ToolError::InvalidArguments(e.to_string()))
}

/// Unwraps a required string argument, treating blank text as missing.
pub fn require(value: Option<String>, name: &'static str) -> Result<String, ToolError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or(ToolError::MissingArgument(name))
}
