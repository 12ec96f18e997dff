use base64::{engine::general_purpose, Engine as _};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// CREDENTIALS
// =============================================================================

/// Token bundle handed out by the OAuth callback. Clients may echo it back
/// verbatim as their `user_token`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenBundle {
    pub token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub token_uri: String,
    pub client_id: String,
    pub client_secret: String,
    #[serde(default)]
    pub scopes: Vec<String>,
}

/// Bearer credential for a user's Google account.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    access_token: String,
}

impl Credential {
    pub fn bearer(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
        }
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    /// Decodes the opaque `user_token` sent with a chat request.
    ///
    /// Accepted shapes: a token bundle as JSON, the same JSON base64-encoded,
    /// or a bare access token. Blank input means "no credential".
    pub fn from_user_token(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }

        if raw.starts_with('{') {
            return serde_json::from_str::<TokenBundle>(raw)
                .ok()
                .filter(|bundle| !bundle.token.is_empty())
                .map(|bundle| Self::bearer(bundle.token));
        }

        let decoded = general_purpose::STANDARD
            .decode(raw)
            .or_else(|_| general_purpose::URL_SAFE_NO_PAD.decode(raw))
            .ok()
            .and_then(|bytes| serde_json::from_slice::<TokenBundle>(&bytes).ok());

        match decoded {
            Some(bundle) if !bundle.token.is_empty() => Some(Self::bearer(bundle.token)),
            _ => Some(Self::bearer(raw)),
        }
    }
}

// Keep tokens out of debug logs.
impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("access_token", &"<redacted>")
            .finish()
    }
}

// =============================================================================
// CALENDAR
// =============================================================================

/// Event to insert into the user's primary calendar.
#[derive(Debug, Clone, PartialEq)]
pub struct NewCalendarEvent {
    pub summary: String,
    /// ISO-8601 date-time, interpreted in `time_zone` when it has no offset.
    pub start_time: String,
    pub end_time: String,
    pub time_zone: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub attendees: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreatedEvent {
    pub id: String,
    pub html_link: Option<String>,
}

/// Window for listing events.
#[derive(Debug, Clone, PartialEq)]
pub struct EventQuery {
    pub time_min: DateTime<Utc>,
    pub time_max: Option<DateTime<Utc>>,
    pub max_results: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CalendarEvent {
    pub summary: String,
    /// Start as reported by the API: a date-time, or a date for all-day events.
    pub start: String,
}

// =============================================================================
// DOCUMENTS
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct CreatedDocument {
    pub id: String,
}

/// Browser URL of a Google Doc.
pub fn document_url(document_id: &str) -> String {
    format!("https://docs.google.com/document/d/{}/edit", document_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bundle_json() -> String {
        serde_json::json!({
            "token": "ya29.access",
            "refresh_token": "1//refresh",
            "token_uri": "https://oauth2.googleapis.com/token",
            "client_id": "client",
            "client_secret": "secret",
            "scopes": ["https://www.googleapis.com/auth/calendar"]
        })
        .to_string()
    }

    #[test]
    fn test_blank_token_is_no_credential() {
        assert!(Credential::from_user_token("").is_none());
        assert!(Credential::from_user_token("   ").is_none());
    }

    #[test]
    fn test_raw_access_token() {
        let credential = Credential::from_user_token("ya29.a0AfH6SMBx").unwrap();
        assert_eq!(credential.access_token(), "ya29.a0AfH6SMBx");
    }

    #[test]
    fn test_json_bundle() {
        let credential = Credential::from_user_token(&bundle_json()).unwrap();
        assert_eq!(credential.access_token(), "ya29.access");
    }

    #[test]
    fn test_base64_bundle() {
        let encoded = general_purpose::STANDARD.encode(bundle_json());
        let credential = Credential::from_user_token(&encoded).unwrap();
        assert_eq!(credential.access_token(), "ya29.access");
    }

    #[test]
    fn test_broken_json_bundle_is_rejected() {
        assert!(Credential::from_user_token("{\"token\": ").is_none());
    }

    #[test]
    fn test_debug_redacts_token() {
        let rendered = format!("{:?}", Credential::bearer("secret-token"));
        assert!(!rendered.contains("secret-token"));
    }

    #[test]
    fn test_document_url() {
        assert_eq!(
            document_url("1abc"),
            "https://docs.google.com/document/d/1abc/edit"
        );
    }
}
