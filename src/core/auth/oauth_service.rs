use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::core::clock::Clock;
use crate::core::errors::UpstreamError;
use crate::core::store::{KeyValueStore, StoreError};
use crate::core::workspace::TokenBundle;

pub const GOOGLE_AUTH_URI: &str = "https://accounts.google.com/o/oauth2/auth";
pub const GOOGLE_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

pub const GOOGLE_SCOPES: [&str; 3] = [
    "https://www.googleapis.com/auth/calendar",
    "https://www.googleapis.com/auth/documents",
    "https://www.googleapis.com/auth/drive.file",
];

/// Key under which the last issued token bundle is persisted.
pub const TOKEN_KEY: &str = "token.json";

/// Key holding every outstanding `state` with the time it was issued.
pub const PENDING_STATES_KEY: &str = "oauth_pending_states.json";

/// How long an issued `state` stays redeemable.
pub const STATE_TTL_MINUTES: i64 = 10;

/// Upper bound on outstanding states; the oldest is dropped past it.
pub const MAX_PENDING_STATES: usize = 256;

#[derive(Debug, Clone)]
pub struct OAuthConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub auth_uri: String,
    pub token_uri: String,
    pub scopes: Vec<String>,
}

impl OAuthConfig {
    pub fn google(client_id: String, client_secret: String, redirect_uri: String) -> Self {
        Self {
            client_id,
            client_secret,
            redirect_uri,
            auth_uri: GOOGLE_AUTH_URI.to_string(),
            token_uri: GOOGLE_TOKEN_URI.to_string(),
            scopes: GOOGLE_SCOPES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Token endpoint response.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenGrant {
    pub access_token: String,
    pub refresh_token: Option<String>,
    /// Space-separated scopes actually granted.
    pub scope: Option<String>,
}

#[async_trait]
pub trait TokenExchanger: Send + Sync {
    async fn exchange_code(
        &self,
        config: &OAuthConfig,
        code: &str,
    ) -> Result<TokenGrant, UpstreamError>;
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Google OAuth is not configured")]
    NotConfigured,
    #[error("Unknown or expired OAuth state")]
    UnknownState,
    #[error("{0}")]
    Upstream(#[from] UpstreamError),
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
    #[error("Invalid authorization URI: {0}")]
    InvalidUri(#[from] url::ParseError),
}

type PendingStates = BTreeMap<String, DateTime<Utc>>;

fn random_state() -> String {
    let mut bytes = [0u8; 24];
    rand::thread_rng().fill_bytes(&mut bytes);
    general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

/// Google OAuth web flow: issue an authorization URL, then trade the code
/// for a token bundle.
///
/// Outstanding states live in one store entry. It is pruned of expired
/// states on every read, so abandoned consent attempts never accumulate.
pub struct OAuthService {
    config: Option<OAuthConfig>,
    exchanger: Arc<dyn TokenExchanger>,
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    // Serializes read-modify-write of the pending state entry.
    pending: Mutex<()>,
}

impl OAuthService {
    pub fn new(
        config: Option<OAuthConfig>,
        exchanger: Arc<dyn TokenExchanger>,
        store: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            config,
            exchanger,
            store,
            clock,
            pending: Mutex::new(()),
        }
    }

    fn config(&self) -> Result<&OAuthConfig, AuthError> {
        self.config.as_ref().ok_or(AuthError::NotConfigured)
    }

    /// Loads outstanding states, dropping any that have expired.
    async fn load_pending(&self, now: DateTime<Utc>) -> Result<PendingStates, AuthError> {
        let mut pending: PendingStates = match self.store.get(PENDING_STATES_KEY).await? {
            Some(bytes) => serde_json::from_slice(&bytes).unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Discarding unreadable OAuth state entry");
                PendingStates::new()
            }),
            None => PendingStates::new(),
        };
        let ttl = Duration::minutes(STATE_TTL_MINUTES);
        pending.retain(|_, issued_at| now - *issued_at < ttl);
        Ok(pending)
    }

    async fn save_pending(&self, pending: &PendingStates) -> Result<(), AuthError> {
        let bytes = serde_json::to_vec(pending).map_err(StoreError::from)?;
        self.store.put(PENDING_STATES_KEY, &bytes).await?;
        Ok(())
    }

    /// Records a freshly issued state.
    async fn remember_state(&self, state: &str) -> Result<(), AuthError> {
        let _guard = self.pending.lock().await;
        let now = self.clock.now();
        let mut pending = self.load_pending(now).await?;

        while pending.len() >= MAX_PENDING_STATES {
            let Some(oldest) = pending
                .iter()
                .min_by_key(|(_, issued_at)| **issued_at)
                .map(|(state, _)| state.clone())
            else {
                break;
            };
            pending.remove(&oldest);
        }
        pending.insert(state.to_string(), now);
        self.save_pending(&pending).await
    }

    /// Removes `state` if it is outstanding and unexpired. Returns whether
    /// it was.
    async fn consume_state(&self, state: &str) -> Result<bool, AuthError> {
        let _guard = self.pending.lock().await;
        let mut pending = self.load_pending(self.clock.now()).await?;
        let found = pending.remove(state).is_some();
        self.save_pending(&pending).await?;
        Ok(found)
    }

    /// Builds the consent URL for offline access and remembers its `state`.
    pub async fn authorization_url(&self) -> Result<String, AuthError> {
        let config = self.config()?;
        let state = random_state();
        let scope = config.scopes.join(" ");

        let url = url::Url::parse_with_params(
            &config.auth_uri,
            &[
                ("client_id", config.client_id.as_str()),
                ("redirect_uri", config.redirect_uri.as_str()),
                ("response_type", "code"),
                ("scope", scope.as_str()),
                ("access_type", "offline"),
                ("prompt", "consent"),
                ("include_granted_scopes", "true"),
                ("state", state.as_str()),
            ],
        )?;

        self.remember_state(&state).await?;
        tracing::debug!("Issued OAuth authorization URL");
        Ok(url.into())
    }

    /// Exchanges an authorization code. The `state` must be one this service
    /// issued within the last `STATE_TTL_MINUTES`; it is consumed on use.
    pub async fn complete(&self, code: &str, state: &str) -> Result<TokenBundle, AuthError> {
        let config = self.config()?;

        if !self.consume_state(state).await? {
            tracing::warn!("OAuth callback with unknown or expired state");
            return Err(AuthError::UnknownState);
        }

        let grant = self.exchanger.exchange_code(config, code).await?;
        let scopes = match grant.scope {
            Some(scope) => scope.split_whitespace().map(str::to_string).collect(),
            None => config.scopes.clone(),
        };
        let bundle = TokenBundle {
            token: grant.access_token,
            refresh_token: grant.refresh_token,
            token_uri: config.token_uri.clone(),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            scopes,
        };

        self.store
            .put(TOKEN_KEY, &serde_json::to_vec_pretty(&bundle).map_err(StoreError::from)?)
            .await?;
        tracing::info!("Stored Google OAuth token bundle");
        Ok(bundle)
    }
}
