//! Error types for the realtime client.

use thiserror::Error;

/// Transport-level errors
#[derive(Debug, Error)]
pub enum TransportError {
    /// The endpoint URL could not be turned into a WebSocket request
    #[error("Invalid realtime endpoint '{url}': {reason}")]
    InvalidEndpoint { url: String, reason: String },

    /// A frame was written to a transport that is not open
    #[error("Transport is not open")]
    NotOpen,

    /// The socket driver has gone away
    #[error("Transport channel closed")]
    ChannelClosed,

    #[error("Failed to encode frame: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Errors from the GraphQL request boundary
#[derive(Debug, Error)]
pub enum GraphqlError {
    #[error("GraphQL request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success HTTP status without a GraphQL error body
    #[error("GraphQL endpoint returned HTTP {0}")]
    Status(u16),

    /// The response carried `errors`
    #[error("GraphQL operation '{operation}' failed: {}", .messages.join("; "))]
    Operation {
        operation: String,
        messages: Vec<String>,
    },

    /// The response carried neither `data` nor `errors`
    #[error("GraphQL operation '{0}' returned no data")]
    MissingData(String),

    #[error("Failed to decode GraphQL payload: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Top-level errors of the terminal client
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Configuration error: {0}")]
    Config(#[from] unihub_shared::config::ConfigError),

    #[error("Invalid page origin '{0}'")]
    InvalidOrigin(String),

    #[error("Token storage error: {0}")]
    TokenStore(#[from] std::io::Error),

    #[error(transparent)]
    Graphql(#[from] GraphqlError),
}
