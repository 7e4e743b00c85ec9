//! Error types for fedilist
//!
//! All errors raised by the API client, the importer and the services are
//! converted to `ClientError`. The pagination controller never returns them
//! as `Err`; it turns them into a `Fail` event instead.

use thiserror::Error;

/// Client-wide error type
///
/// Network failures, non-2xx responses and payload decode failures are kept
/// as distinct variants here so they can be logged and counted, even though
/// the pagination protocol collapses them into a single failure event.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Operation requires an access token
    #[error("Authentication required")]
    Unauthenticated,

    /// Transport-level failure (connect, timeout, TLS, body read)
    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    /// Server answered with a non-2xx status
    #[error("Unexpected HTTP status {status}: {body}")]
    Status { status: u16, body: String },

    /// Payload did not match the expected schema
    #[error("Decode error: {0}")]
    Decode(String),

    /// A path or pagination link could not be turned into a URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl ClientError {
    /// Stable label used for metrics and structured logs
    pub fn kind(&self) -> &'static str {
        match self {
            ClientError::Unauthenticated => "unauthenticated",
            ClientError::HttpClient(e) if e.is_timeout() => "timeout",
            ClientError::HttpClient(_) => "network",
            ClientError::Status { .. } => "status",
            ClientError::Decode(_) => "decode",
            ClientError::InvalidUrl(_) => "invalid_url",
            ClientError::Config(_) => "config",
            ClientError::Internal(_) => "internal",
        }
    }

    /// HTTP status code, if the server produced one
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Status { status, .. } => Some(*status),
            ClientError::HttpClient(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        ClientError::Decode(err.to_string())
    }
}

impl From<config::ConfigError> for ClientError {
    fn from(err: config::ConfigError) -> Self {
        ClientError::Config(err.to_string())
    }
}

/// Result type alias using ClientError
pub type Result<T> = std::result::Result<T, ClientError>;
