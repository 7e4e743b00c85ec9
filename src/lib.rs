//! fedilist - paginated collections for Mastodon/Pleroma-compatible APIs
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Service Layer                            │
//! │  - Pagination controller (fetch first page / expand)        │
//! │  - Favourites, account favourites, directory                │
//! │  - Relationships, suggestions                               │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      API Layer                               │
//! │  - reqwest client bound to one instance                     │
//! │  - Link header pagination, response schemas                 │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Data Layer                              │
//! │  - Entity importer (normalization)                          │
//! │  - Store: entity tables, cursors, event broadcast           │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - `api`: REST client and response DTOs
//! - `service`: Pagination controller and collections
//! - `data`: Store, cursors, events and importer
//! - `config`: Configuration management
//! - `error`: Error types
//! - `metrics`: Prometheus instruments

pub mod api;
pub mod config;
pub mod data;
pub mod error;
pub mod metrics;
pub mod service;

use std::sync::Arc;

/// Client state shared by all services
///
/// Cheap to clone; every field is reference counted.
#[derive(Clone)]
pub struct ClientState {
    /// Client configuration
    pub config: Arc<config::ClientConfig>,

    /// REST client bound to the configured instance
    pub api: Arc<api::ApiClient>,

    /// Entity tables and cursors
    pub store: Arc<data::Store>,
}

impl ClientState {
    /// Initialize client state
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be built from configuration
    pub fn new(config: config::ClientConfig) -> Result<Self, error::ClientError> {
        let api = api::ApiClient::new(&config)?;
        tracing::info!(
            instance = %api.base_url(),
            authenticated = api.is_authenticated(),
            "Client state initialized"
        );
        Ok(Self::with_api(config, api))
    }

    /// Initialize client state around an existing API client
    pub fn with_api(config: config::ClientConfig, api: api::ApiClient) -> Self {
        let store = data::Store::new(config.events.channel_capacity);
        Self {
            config: Arc::new(config),
            api: Arc::new(api),
            store: Arc::new(store),
        }
    }

    pub fn pagination(&self) -> service::PaginationController {
        service::PaginationController::new(Arc::clone(&self.api), Arc::clone(&self.store))
    }

    pub fn favourites(&self) -> service::FavouritesService {
        service::FavouritesService::new(
            self.pagination(),
            self.config.pagination.favourites_limit,
        )
    }

    pub fn directory(&self) -> service::DirectoryService {
        service::DirectoryService::new(
            self.pagination(),
            self.relationships(),
            self.config.pagination.directory_limit,
        )
    }

    pub fn relationships(&self) -> service::RelationshipsService {
        service::RelationshipsService::new(Arc::clone(&self.api), Arc::clone(&self.store))
    }

    pub fn suggestions(&self) -> service::SuggestService {
        service::SuggestService::new(Arc::clone(&self.api), Arc::clone(&self.store))
    }
}
