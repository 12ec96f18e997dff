// Upstream error classification shared by every external client.
//
// The core layer never sees reqwest or sqlx types. Infra clients translate
// transport failures and HTTP statuses into an `UpstreamError`, and the kind
// decides whether a caller could reasonably try again later.

use std::fmt;

/// Broad category of an upstream failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing, expired or rejected credentials (401/403).
    Authentication,
    /// The upstream asked us to slow down (429).
    RateLimited,
    /// The request did not finish in time.
    Timeout,
    /// The upstream rejected the request itself (other 4xx).
    InvalidRequest,
    /// The upstream is failing (5xx).
    Unavailable,
    /// Connection-level failure before any status was received.
    Network,
    /// A response arrived but could not be understood.
    InvalidResponse,
}

impl ErrorKind {
    /// Maps an HTTP status code to an error kind.
    pub fn from_status(status: u16) -> Self {
        match status {
            401 | 403 => ErrorKind::Authentication,
            408 => ErrorKind::Timeout,
            429 => ErrorKind::RateLimited,
            500..=599 => ErrorKind::Unavailable,
            _ => ErrorKind::InvalidRequest,
        }
    }

    /// Whether the same request may succeed if sent again later.
    ///
    /// Nothing in this crate retries automatically; the flag is exposed so
    /// callers and tests can tell transient failures from permanent ones.
    pub fn is_retryable(self) -> bool {
        matches!(
            self,
            ErrorKind::RateLimited | ErrorKind::Timeout | ErrorKind::Unavailable | ErrorKind::Network
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ErrorKind::Authentication => "authentication",
            ErrorKind::RateLimited => "rate limited",
            ErrorKind::Timeout => "timeout",
            ErrorKind::InvalidRequest => "invalid request",
            ErrorKind::Unavailable => "unavailable",
            ErrorKind::Network => "network",
            ErrorKind::InvalidResponse => "invalid response",
        };
        f.write_str(label)
    }
}

/// A failure reported by (or while talking to) an external service.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{service} error ({kind}): {message}")]
pub struct UpstreamError {
    pub service: &'static str,
    pub kind: ErrorKind,
    pub message: String,
}

impl UpstreamError {
    pub fn new(service: &'static str, kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            service,
            kind,
            message: message.into(),
        }
    }

    /// Builds an error from a non-success HTTP status and its body.
    pub fn from_status(service: &'static str, status: u16, body: impl Into<String>) -> Self {
        Self::new(
            service,
            ErrorKind::from_status(status),
            format!("HTTP {}: {}", status, body.into()),
        )
    }

    pub fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }
}
