pub mod oauth_service;

pub use oauth_service::{AuthError, OAuthConfig, OAuthService, TokenExchanger, TokenGrant};
