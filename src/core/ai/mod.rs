pub mod ai_service;
pub mod arguments;
pub mod models;

pub use ai_service::{AiProvider, AiService, ChatReply, DispatchOutcome};
pub use models::{
    AiConfig, AiProviderResponse, ChatRole, ChatTurn, FunctionCall, FunctionDef,
    FunctionParameters, PropertyDef,
};
