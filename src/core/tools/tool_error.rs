use crate::core::ai::arguments::ArgumentError;
use crate::core::canvas::CanvasError;
use crate::core::errors::{ErrorKind, UpstreamError};
use crate::core::workspace::DocumentError;

/// Why a tool invocation failed. The dispatch loop turns this into the
/// user-facing text; tests match on the variant.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("User authentication token is required to {action}.")]
    MissingCredential { action: &'static str },

    #[error("Missing required argument '{0}'.")]
    MissingArgument(&'static str),

    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("Failed while {action}: {source}")]
    Upstream {
        action: &'static str,
        source: UpstreamError,
    },

    #[error("Failed while {action}: {source}")]
    Document {
        action: &'static str,
        source: DocumentError,
    },

    #[error("Failed while {action}: {source}")]
    Canvas {
        action: &'static str,
        source: CanvasError,
    },
}

impl ToolError {
    pub fn upstream(action: &'static str) -> impl FnOnce(UpstreamError) -> Self {
        move |source| ToolError::Upstream { action, source }
    }

    /// Classification of the underlying failure, when there is one.
    pub fn upstream_kind(&self) -> Option<ErrorKind> {
        match self {
            ToolError::Upstream { source, .. } => Some(source.kind),
            ToolError::Document {
                source: DocumentError::Upstream(source),
                ..
            } => Some(source.kind),
            ToolError::Canvas {
                source: CanvasError::Upstream(source),
                ..
            } => Some(source.kind),
            _ => None,
        }
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            ToolError::Upstream { source, .. } => source.is_retryable(),
            ToolError::Document { source, .. } => source.is_retryable(),
            ToolError::Canvas {
                source: CanvasError::Upstream(source),
                ..
            } => source.is_retryable(),
            _ => false,
        }
    }
}

impl From<ArgumentError> for ToolError {
    fn from(err: ArgumentError) -> Self {
        ToolError::InvalidArguments(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_credential_message() {
        let err = ToolError::MissingCredential {
            action: "create calendar events",
        };
        assert_eq!(
            err.to_string(),
            "User authentication token is required to create calendar events."
        );
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_upstream_classification_is_exposed() {
        let err = ToolError::upstream("creating calendar event")(UpstreamError::from_status(
            "Calendar", 429, "quota",
        ));
        assert_eq!(err.upstream_kind(), Some(ErrorKind::RateLimited));
        assert!(err.is_retryable());
        assert!(err
            .to_string()
            .starts_with("Failed while creating calendar event: Calendar error"));
    }

    #[test]
    fn test_argument_errors_convert() {
        let err: ToolError = ArgumentError::NotAnObject("an array").into();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
        assert_eq!(err.upstream_kind(), None);
    }
}
