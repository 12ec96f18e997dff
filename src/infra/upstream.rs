// Shared reqwest plumbing: status checks and error classification for every
// REST client in this layer.

use reqwest::Response;
use serde::de::DeserializeOwned;

use crate::core::errors::{ErrorKind, UpstreamError};

/// Classifies a transport-level reqwest failure.
pub fn from_reqwest(service: &'static str, err: reqwest::Error) -> UpstreamError {
    let kind = if err.is_timeout() {
        ErrorKind::Timeout
    } else if err.is_connect() || err.is_request() {
        ErrorKind::Network
    } else if err.is_decode() {
        ErrorKind::InvalidResponse
    } else if let Some(status) = err.status() {
        ErrorKind::from_status(status.as_u16())
    } else {
        ErrorKind::Network
    };
    UpstreamError::new(service, kind, err.to_string())
}

/// Passes successful responses through; turns anything else into an
/// `UpstreamError` carrying the API's own error message when it has one.
pub async fn check_status(
    service: &'static str,
    response: Response,
) -> Result<Response, UpstreamError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(UpstreamError::from_status(
        service,
        status.as_u16(),
        error_message(&body),
    ))
}

/// Checks the status and decodes a JSON body.
pub async fn read_json<T: DeserializeOwned>(
    service: &'static str,
    response: Response,
) -> Result<T, UpstreamError> {
    let response = check_status(service, response).await?;
    response
        .json::<T>()
        .await
        .map_err(|e| UpstreamError::new(service, ErrorKind::InvalidResponse, e.to_string()))
}

/// Pulls a readable message out of the error bodies Google
/// (`{"error": {"message": ..}}` or `{"error": "..", "error_description": ..}`)
/// and Canvas (`{"errors": [{"message": ..}]}`) return.
pub fn error_message(body: &str) -> String {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(body) else {
        return body.trim().to_string();
    };

    let google = value
        .pointer("/error/message")
        .or_else(|| value.get("error_description"))
        .or_else(|| value.get("error").filter(|e| e.is_string()));
    let canvas = value.pointer("/errors/0/message");

    google
        .or(canvas)
        .and_then(|m| m.as_str())
        .map(str::to_string)
        .unwrap_or_else(|| body.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_message_shapes() {
        assert_eq!(
            error_message(r#"{"error":{"code":400,"message":"API key not valid","status":"INVALID_ARGUMENT"}}"#),
            "API key not valid"
        );
        assert_eq!(
            error_message(r#"{"error":"invalid_grant","error_description":"Bad Request"}"#),
            "Bad Request"
        );
        assert_eq!(
            error_message(r#"{"errors":[{"message":"user not authorized to perform that action"}]}"#),
            "user not authorized to perform that action"
        );
        assert_eq!(error_message("  upstream connect error "), "upstream connect error");
        assert_eq!(error_message(r#"{"unexpected":true}"#), r#"{"unexpected":true}"#);
    }
}
