use async_trait::async_trait;
use std::sync::Arc;

use super::arguments::normalize_arguments;
use super::models::{AiConfig, AiProviderResponse, ChatTurn, FunctionCall, FunctionDef};
use crate::core::errors::UpstreamError;
use crate::core::tools::{ToolContext, ToolError, ToolRegistry};

#[async_trait]
pub trait AiProvider: Send + Sync {
    /// Sends the conversation and the callable functions to the model.
    ///
    /// The response carries the model's text and, when the model chose to
    /// call one, the first function call it made.
    async fn chat_complete(
        &self,
        turns: &[ChatTurn],
        functions: &[FunctionDef],
        config: &AiConfig,
    ) -> Result<AiProviderResponse, UpstreamError>;
}

// Lets AiService hold a provider picked at runtime.
#[async_trait]
impl AiProvider for Box<dyn AiProvider> {
    async fn chat_complete(
        &self,
        turns: &[ChatTurn],
        functions: &[FunctionDef],
        config: &AiConfig,
    ) -> Result<AiProviderResponse, UpstreamError> {
        (**self).chat_complete(turns, functions, config).await
    }
}

/// What happened to the model's function call, if any.
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    NoToolCall,
    ToolCallMatched { name: String, succeeded: bool },
    ToolCallUnrecognized { name: String },
}

#[derive(Debug, Clone)]
pub struct ChatReply {
    pub message: String,
    pub outcome: DispatchOutcome,
}

pub struct AiService<P: AiProvider> {
    provider: P,
    config: AiConfig,
    tools: Arc<ToolRegistry>,
}

impl<P: AiProvider> AiService<P> {
    pub fn new(provider: P, config: AiConfig, tools: Arc<ToolRegistry>) -> Self {
        Self {
            provider,
            config,
            tools,
        }
    }

    /// One model call, then at most one tool dispatch.
    pub async fn respond(
        &self,
        history: &[ChatTurn],
        ctx: &ToolContext,
    ) -> Result<ChatReply, UpstreamError> {
        let declarations = self.tools.declarations();
        tracing::debug!(
            turns = history.len(),
            tools = declarations.len(),
            model = %self.config.model,
            "Calling model"
        );

        let response = self
            .provider
            .chat_complete(history, &declarations, &self.config)
            .await?;

        let Some(call) = response.function_call else {
            return Ok(ChatReply {
                message: response.content,
                outcome: DispatchOutcome::NoToolCall,
            });
        };

        Ok(self.dispatch(response.content, call, ctx).await)
    }

    async fn dispatch(&self, text: String, call: FunctionCall, ctx: &ToolContext) -> ChatReply {
        let FunctionCall { name, args } = call;

        let Some(entry) = self.tools.get(&name) else {
            tracing::warn!(tool = %name, "Model called an unknown tool");
            let body = format!("Error: Unsupported tool '{}'", name);
            return ChatReply {
                message: assemble(&text, "Tool Result", &body),
                outcome: DispatchOutcome::ToolCallUnrecognized { name },
            };
        };

        tracing::info!(tool = %name, "Dispatching tool call");
        let result = match normalize_arguments(args) {
            Ok(args) => entry.tool.call(args, ctx).await,
            Err(e) => Err(ToolError::from(e)),
        };

        let (body, succeeded) = match result {
            Ok(output) => (output, true),
            Err(e) => {
                tracing::warn!(
                    tool = %name,
                    error = %e,
                    kind = ?e.upstream_kind(),
                    retryable = e.is_retryable(),
                    "Tool call failed"
                );
                (format!("Error: {}", e), false)
            }
        };

        ChatReply {
            message: assemble(&text, entry.label, &body),
            outcome: DispatchOutcome::ToolCallMatched { name, succeeded },
        }
    }
}

/// `{text}\n\n{label}: {body}`, without the separator when the model sent no
/// text.
fn assemble(text: &str, label: &str, body: &str) -> String {
    if text.is_empty() {
        format!("{}: {}", label, body)
    } else {
        format!("{}\n\n{}: {}", text, label, body)
    }
}
