use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::core::auth::AuthError;
use crate::core::chat::ChatError;

/// An error response rendered as `{"detail": "..."}`.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub detail: String,
}

impl ApiError {
    pub fn new(status: StatusCode, detail: impl Into<String>) -> Self {
        Self {
            status,
            detail: detail.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "detail": self.detail }))).into_response()
    }
}

impl From<ChatError> for ApiError {
    fn from(err: ChatError) -> Self {
        let status = match &err {
            ChatError::EmptyHistory | ChatError::MissingCredential => StatusCode::BAD_REQUEST,
            ChatError::Provider(_) | ChatError::Document(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!(error = %err, "Chat request failed");
        }
        Self::new(status, err.to_string())
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        let status = match &err {
            AuthError::UnknownState => StatusCode::BAD_REQUEST,
            AuthError::NotConfigured
            | AuthError::Upstream(_)
            | AuthError::Store(_)
            | AuthError::InvalidUri(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!(error = %err, "OAuth request failed");
        }
        Self::new(status, err.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::debug!(error = %rejection, "Rejected request body");
        Self::new(rejection.status(), rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        tracing::debug!(error = %rejection, "Rejected query string");
        Self::new(rejection.status(), rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::errors::{ErrorKind, UpstreamError};

    #[test]
    fn test_chat_error_statuses() {
        assert_eq!(
            ApiError::from(ChatError::EmptyHistory).status,
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(ChatError::MissingCredential).status,
            StatusCode::BAD_REQUEST
        );

        let err = ApiError::from(ChatError::Provider(UpstreamError::new(
            "Gemini",
            ErrorKind::RateLimited,
            "quota",
        )));
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(err.detail.starts_with("Error calling Gemini API:"));
    }

    #[test]
    fn test_auth_error_statuses() {
        assert_eq!(
            ApiError::from(AuthError::UnknownState).status,
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(AuthError::NotConfigured).status,
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
