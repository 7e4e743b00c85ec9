//! Configuration management
//!
//! Loads configuration from:
//! 1. Default values
//! 2. Configuration file (config/default.toml, config/local.toml)
//! 3. Environment variables (override)

use serde::Deserialize;
use std::net::IpAddr;
use std::path::Path;

/// Largest `limit` accepted by Mastodon-compatible list endpoints
const MAX_PAGE_SIZE: u32 = 80;

/// Main client configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    pub instance: InstanceConfig,
    pub http: HttpConfig,
    pub pagination: PaginationConfig,
    pub events: EventsConfig,
    pub logging: LoggingConfig,
}

/// Remote instance to talk to
#[derive(Debug, Clone, Deserialize)]
pub struct InstanceConfig {
    /// Base URL (e.g., "https://social.example.com")
    pub base_url: String,
    /// OAuth bearer token; without it only public collections can be fetched
    pub access_token: Option<String>,
}

impl InstanceConfig {
    /// Access token, treating blank values as absent
    pub fn token(&self) -> Option<&str> {
        self.access_token
            .as_deref()
            .map(str::trim)
            .filter(|token| !token.is_empty())
    }
}

/// HTTP client configuration
#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    /// Request timeout in seconds (default: 30)
    pub timeout_seconds: u64,
    /// User-Agent header
    pub user_agent: String,
}

/// Page sizes per collection
#[derive(Debug, Clone, Deserialize)]
pub struct PaginationConfig {
    /// `limit` for favourites and account favourites (default: 20)
    pub favourites_limit: u32,
    /// `limit` for the profile directory (default: 20)
    pub directory_limit: u32,
}

/// Event broadcast configuration
#[derive(Debug, Clone, Deserialize)]
pub struct EventsConfig {
    /// Buffered events per subscriber before it starts lagging
    pub channel_capacity: usize,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    pub level: String,
    /// Log format: "pretty" or "json"
    pub format: String,
}

impl ClientConfig {
    /// Load configuration from file and environment
    ///
    /// # Loading Order
    /// 1. Default values
    /// 2. config/default.toml (if exists)
    /// 3. config/local.toml (if exists)
    /// 4. Environment variables (FEDILIST__*)
    ///
    /// # Errors
    /// Returns error if configuration is invalid
    pub fn load() -> Result<Self, crate::error::ClientError> {
        use config::{Environment, File};

        let config = Self::builder_with_defaults()?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(
                Environment::with_prefix("FEDILIST")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Self::finish(config)
    }

    /// Load configuration from an explicit file, still honoring defaults
    pub fn load_from(path: &Path) -> Result<Self, crate::error::ClientError> {
        use config::File;

        let config = Self::builder_with_defaults()?
            .add_source(File::from(path))
            .build()?;

        Self::finish(config)
    }

    fn builder_with_defaults()
    -> Result<config::ConfigBuilder<config::builder::DefaultState>, crate::error::ClientError> {
        Ok(config::Config::builder()
            .set_default("http.timeout_seconds", 30)?
            .set_default("http.user_agent", concat!("fedilist/", env!("CARGO_PKG_VERSION")))?
            .set_default("pagination.favourites_limit", 20)?
            .set_default("pagination.directory_limit", 20)?
            .set_default("events.channel_capacity", 256)?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "pretty")?)
    }

    fn finish(config: config::Config) -> Result<Self, crate::error::ClientError> {
        let client_config: Self = config.try_deserialize()?;
        client_config.validate()?;
        Ok(client_config)
    }

    /// Parsed instance base URL
    pub fn base_url(&self) -> Result<url::Url, crate::error::ClientError> {
        url::Url::parse(self.instance.base_url.trim()).map_err(|e| {
            crate::error::ClientError::Config(format!(
                "instance.base_url is not a valid URL: {}",
                e
            ))
        })
    }

    fn validate(&self) -> Result<(), crate::error::ClientError> {
        use crate::error::ClientError;

        let base_url = self.base_url()?;
        let host = base_url.host_str().ok_or_else(|| {
            ClientError::Config("instance.base_url must include a host".to_string())
        })?;

        match base_url.scheme() {
            "https" => {}
            "http" if is_local_host(host) => {
                tracing::warn!(
                    host = %host,
                    "Using plain http for a local instance"
                );
            }
            "http" => {
                return Err(ClientError::Config(
                    "instance.base_url must use https for non-local hosts".to_string(),
                ));
            }
            other => {
                return Err(ClientError::Config(format!(
                    "instance.base_url has unsupported scheme {}",
                    other
                )));
            }
        }

        if self.http.timeout_seconds == 0 {
            return Err(ClientError::Config(
                "http.timeout_seconds must be greater than 0".to_string(),
            ));
        }

        for (name, value) in [
            ("pagination.favourites_limit", self.pagination.favourites_limit),
            ("pagination.directory_limit", self.pagination.directory_limit),
        ] {
            if value == 0 || value > MAX_PAGE_SIZE {
                return Err(ClientError::Config(format!(
                    "{} must be between 1 and {}",
                    name, MAX_PAGE_SIZE
                )));
            }
        }

        if self.events.channel_capacity == 0 {
            return Err(ClientError::Config(
                "events.channel_capacity must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

fn is_local_host(host: &str) -> bool {
    let host = host
        .trim_start_matches('[')
        .trim_end_matches(']')
        .trim_end_matches('.')
        .to_ascii_lowercase();
    if host == "localhost" || host.ends_with(".localhost") {
        return true;
    }

    if let Ok(ip) = host.parse::<IpAddr>() {
        return ip.is_loopback() || ip.is_unspecified();
    }

    false
}
