pub mod chat_service;

pub use chat_service::{ChatError, ChatRequest, ChatResponse, ChatService};
