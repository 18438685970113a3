//! Application configuration loaded from environment variables.
//!
//! Everything is read once at startup; the identity provider client and the
//! session store are constructed from this struct rather than from any
//! module-level state.

use std::env;

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// OIDC client ID registered with the identity provider (public)
    pub oidc_client_id: String,
    /// OIDC client secret
    pub oidc_client_secret: String,
    /// Identity provider domain, e.g. `tenant.eu.auth0.com`
    pub oidc_domain: String,
    /// Redirect URL registered with the provider for the code callback
    pub callback_url: String,
    /// Public base URL of this application (used as the post-logout target)
    pub base_url: String,
    /// Secret used to sign the session cookie
    pub session_secret: String,
    /// SQLite database URL
    pub database_url: String,
    /// Server port
    pub port: u16,
}

impl Default for Config {
    /// Default config for testing only.
    fn default() -> Self {
        Self {
            oidc_client_id: "test_client_id".to_string(),
            oidc_client_secret: "test_client_secret".to_string(),
            oidc_domain: "test.example.com".to_string(),
            callback_url: "http://localhost:8080/callback".to_string(),
            base_url: "http://localhost:8080".to_string(),
            session_secret: "test_session_secret_32_bytes_ok!".to_string(),
            database_url: "sqlite::memory:".to_string(),
            port: 8080,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// A `.env` file is honored for local development.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let base_url =
            env::var("BASE_URL").unwrap_or_else(|_| "http://localhost:8080".to_string());

        Ok(Self {
            oidc_client_id: env::var("OIDC_CLIENT_ID")
                .map_err(|_| ConfigError::Missing("OIDC_CLIENT_ID"))?,
            oidc_client_secret: env::var("OIDC_CLIENT_SECRET")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("OIDC_CLIENT_SECRET"))?,
            oidc_domain: env::var("OIDC_DOMAIN")
                .map(|v| v.trim().trim_end_matches('/').to_string())
                .map_err(|_| ConfigError::Missing("OIDC_DOMAIN"))?,
            callback_url: env::var("OIDC_CALLBACK_URL")
                .unwrap_or_else(|_| format!("{}/callback", base_url.trim_end_matches('/'))),
            session_secret: env::var("SESSION_SECRET")
                .map_err(|_| ConfigError::Missing("SESSION_SECRET"))?,
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite:portal.db".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            base_url,
        })
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),
}
