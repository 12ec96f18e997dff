use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::core::auth::{OAuthConfig, TokenExchanger, TokenGrant};
use crate::core::errors::UpstreamError;
use crate::infra::upstream;

const SERVICE: &str = "OAuth";

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    scope: Option<String>,
}

/// Exchanges authorization codes at the configured token endpoint.
pub struct GoogleTokenExchanger {
    client: Client,
}

impl GoogleTokenExchanger {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl TokenExchanger for GoogleTokenExchanger {
    async fn exchange_code(
        &self,
        config: &OAuthConfig,
        code: &str,
    ) -> Result<TokenGrant, UpstreamError> {
        let response = self
            .client
            .post(&config.token_uri)
            .form(&[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("client_id", config.client_id.as_str()),
                ("client_secret", config.client_secret.as_str()),
                ("redirect_uri", config.redirect_uri.as_str()),
            ])
            .send()
            .await
            .map_err(|e| upstream::from_reqwest(SERVICE, e))?;

        let token: TokenResponse = upstream::read_json(SERVICE, response).await?;
        tracing::debug!(has_refresh_token = token.refresh_token.is_some(), "Exchanged OAuth code");

        Ok(TokenGrant {
            access_token: token.access_token,
            refresh_token: token.refresh_token,
            scope: token.scope,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_response_without_refresh_token() {
        let token: TokenResponse = serde_json::from_str(
            r#"{"access_token":"ya29.x","expires_in":3599,"token_type":"Bearer"}"#,
        )
        .unwrap();
        assert_eq!(token.access_token, "ya29.x");
        assert!(token.refresh_token.is_none());
        assert!(token.scope.is_none());
    }
}
