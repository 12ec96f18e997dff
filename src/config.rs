// Environment configuration.
//
// `main` loads `.env` with dotenv and then calls `AppConfig::from_env()`.
// Parsing goes through a lookup closure so tests never touch the process
// environment.

use chrono_tz::Tz;
use std::path::PathBuf;

use crate::core::ai::AiConfig;
use crate::core::auth::OAuthConfig;
use crate::infra::canvas::DEFAULT_CANVAS_URL;

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 8000;
const DEFAULT_TIMEZONE: &str = "America/New_York";
const DEFAULT_TERM: &str = "WN 2025";
const DEFAULT_EXPORT_MAX_AGE_HOURS: i64 = 24;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {name}: '{value}' ({reason})")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
}

fn invalid(name: &'static str, value: &str, reason: impl ToString) -> ConfigError {
    ConfigError::Invalid {
        name,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    File,
    Sqlite,
    Memory,
}

impl std::str::FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "file" => Ok(StoreBackend::File),
            "sqlite" => Ok(StoreBackend::Sqlite),
            "memory" => Ok(StoreBackend::Memory),
            other => Err(format!("expected file, sqlite or memory, got {}", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CanvasConfig {
    pub api_key: String,
    pub api_url: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub gemini_api_key: Option<String>,
    pub ai: AiConfig,
    /// `None` when the client id or secret is missing.
    pub oauth: Option<OAuthConfig>,
    /// `None` when `CANVAS_API_KEY` is missing.
    pub canvas: Option<CanvasConfig>,
    pub canvas_term: String,
    pub time_zone: Tz,
    pub data_dir: PathBuf,
    pub cache_dir: PathBuf,
    pub downloads_dir: PathBuf,
    pub store_backend: StoreBackend,
    pub export_max_age: chrono::Duration,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Blank values count as unset.
        let get = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let port = match get("ASSISTANT_PORT") {
            Some(raw) => raw
                .parse::<u16>()
                .map_err(|e| invalid("ASSISTANT_PORT", &raw, e))?,
            None => DEFAULT_PORT,
        };

        let tz_name = get("CALENDAR_TIMEZONE").unwrap_or_else(|| DEFAULT_TIMEZONE.to_string());
        let time_zone: Tz = tz_name
            .parse()
            .map_err(|e| invalid("CALENDAR_TIMEZONE", &tz_name, e))?;

        let store_backend = match get("STORE_BACKEND") {
            Some(raw) => raw
                .parse::<StoreBackend>()
                .map_err(|e| invalid("STORE_BACKEND", &raw, e))?,
            None => StoreBackend::File,
        };

        let max_age_hours = match get("EXPORT_CACHE_MAX_AGE_HOURS") {
            Some(raw) => raw
                .parse::<i64>()
                .ok()
                .filter(|h| *h > 0)
                .ok_or_else(|| invalid("EXPORT_CACHE_MAX_AGE_HOURS", &raw, "expected a positive number of hours"))?,
            None => DEFAULT_EXPORT_MAX_AGE_HOURS,
        };

        let host = get("ASSISTANT_HOST").unwrap_or_else(|| DEFAULT_HOST.to_string());
        let redirect_uri = get("GOOGLE_REDIRECT_URI")
            .unwrap_or_else(|| format!("http://localhost:{}/auth/callback", port));
        let oauth = match (get("GOOGLE_CLIENT_ID"), get("GOOGLE_CLIENT_SECRET")) {
            (Some(id), Some(secret)) => Some(OAuthConfig::google(id, secret, redirect_uri)),
            _ => None,
        };

        let canvas = get("CANVAS_API_KEY").map(|api_key| CanvasConfig {
            api_key,
            api_url: get("CANVAS_API_URL").unwrap_or_else(|| DEFAULT_CANVAS_URL.to_string()),
        });

        let mut ai = AiConfig::default();
        if let Some(model) = get("GEMINI_MODEL") {
            ai.model = model;
        }
        ai.system_prompt = get("ASSISTANT_SYSTEM_PROMPT");

        Ok(Self {
            host,
            port,
            gemini_api_key: get("GEMINI_API_KEY"),
            ai,
            oauth,
            canvas,
            canvas_term: get("CANVAS_TERM").unwrap_or_else(|| DEFAULT_TERM.to_string()),
            time_zone,
            data_dir: get("DATA_DIR").unwrap_or_else(|| "data".to_string()).into(),
            cache_dir: get("CACHE_DIR").unwrap_or_else(|| "cache".to_string()).into(),
            downloads_dir: get("DOWNLOADS_DIR")
                .unwrap_or_else(|| "downloads".to_string())
                .into(),
            store_backend,
            export_max_age: chrono::Duration::hours(max_age_hours),
        })
    }

    /// Lists features that are switched off because their keys are missing.
    pub fn disabled_features(&self) -> Vec<&'static str> {
        let mut disabled = Vec::new();
        if self.gemini_api_key.is_none() {
            disabled.push("Gemini (GEMINI_API_KEY)");
        }
        if self.oauth.is_none() {
            disabled.push("Google OAuth (GOOGLE_CLIENT_ID / GOOGLE_CLIENT_SECRET)");
        }
        if self.canvas.is_none() {
            disabled.push("Canvas (CANVAS_API_KEY)");
        }
        disabled
    }
}
