//! Environment-driven application configuration.
//!
//! Values are read once at startup; there is no reload.

use thiserror::Error;

/// REST/API base URL
pub const API_URL_VAR: &str = "UNIHUB_API_URL";
/// GraphQL endpoint
pub const GRAPHQL_URL_VAR: &str = "UNIHUB_API_GRAPHQL_URL";
/// Explicit realtime endpoint (skips origin-based derivation)
pub const WS_URL_VAR: &str = "UNIHUB_API_WS";
/// OAuth client id
pub const OAUTH_CLIENT_ID_VAR: &str = "UNIHUB_OAUTH_CLIENT_ID";

/// Default API base URL for local development
pub const DEFAULT_API_URL: &str = "http://localhost:3007";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A URL-valued variable is not an http(s)/ws(s) URL
    #[error("{name} must be an absolute http(s) or ws(s) URL, got '{value}'")]
    InvalidUrl { name: &'static str, value: String },
}

/// Application configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub api_url: String,
    pub graphql_url: String,
    pub ws_url: Option<String>,
    pub oauth_client_id: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            graphql_url: format!("{DEFAULT_API_URL}/graphql"),
            ws_url: None,
            oauth_client_id: None,
        }
    }
}

impl AppConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read configuration through an arbitrary variable lookup.
    ///
    /// Blank values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let api_url = read(API_URL_VAR)
            .map(|value| validate_url(API_URL_VAR, value))
            .transpose()?
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());
        let api_url = api_url.trim_end_matches('/').to_string();

        let graphql_url = read(GRAPHQL_URL_VAR)
            .map(|value| validate_url(GRAPHQL_URL_VAR, value))
            .transpose()?
            .unwrap_or_else(|| format!("{api_url}/graphql"));

        let ws_url = read(WS_URL_VAR)
            .map(|value| validate_url(WS_URL_VAR, value))
            .transpose()?;

        Ok(Self {
            api_url,
            graphql_url,
            ws_url,
            oauth_client_id: read(OAUTH_CLIENT_ID_VAR),
        })
    }
}

fn validate_url(name: &'static str, value: String) -> Result<String, ConfigError> {
    const SCHEMES: [&str; 4] = ["http://", "https://", "ws://", "wss://"];
    if SCHEMES.iter().any(|scheme| value.starts_with(scheme)) {
        Ok(value)
    } else {
        Err(ConfigError::InvalidUrl { name, value })
    }
}
