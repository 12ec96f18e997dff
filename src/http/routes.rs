use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::api_error::ApiError;
use crate::core::ai::AiProvider;
use crate::core::auth::{AuthError, OAuthService};
use crate::core::chat::{ChatRequest, ChatResponse, ChatService};
use crate::core::workspace::TokenBundle;

/// Shared application state.
pub struct AppState {
    pub chat: ChatService<Box<dyn AiProvider>>,
    pub oauth: OAuthService,
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/chat", post(chat))
        .route("/auth", get(auth))
        .route("/auth/callback", get(auth_callback))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(state))
}

#[derive(Debug, Deserialize)]
struct CallbackParams {
    code: String,
    state: Option<String>,
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

// Extractor rejections are taken as `Result`s so they render as `{detail}`
// like every other error.
async fn chat(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, ApiError> {
    let Json(request) = payload?;
    tracing::debug!(
        turns = request.history.len(),
        has_token = request.user_token.is_some(),
        create_google_doc = request.create_google_doc,
        save_doc = request.save_doc,
        "Chat request"
    );
    let response = state.chat.handle(request).await?;
    Ok(Json(response))
}

async fn auth(State(state): State<Arc<AppState>>) -> Result<Json<serde_json::Value>, ApiError> {
    let url = state.oauth.authorization_url().await?;
    Ok(Json(json!({ "authorization_url": url })))
}

async fn auth_callback(
    State(state): State<Arc<AppState>>,
    params: Result<Query<CallbackParams>, QueryRejection>,
) -> Result<Json<TokenBundle>, ApiError> {
    let Query(params) = params?;
    let callback_state = params.state.ok_or(AuthError::UnknownState)?;
    let bundle = state.oauth.complete(&params.code, &callback_state).await?;
    Ok(Json(bundle))
}
