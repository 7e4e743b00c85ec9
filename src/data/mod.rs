//! Data layer module
//!
//! Client-side state:
//! - Normalized entity tables (accounts, statuses, relationships)
//! - Per-collection pagination cursors
//! - Events and the reducer that applies them

mod events;
mod importer;
mod models;
mod store;

pub use events::{Event, Phase};
pub use importer::{
    ImportBatch, account_refs, normalize_account, normalize_relationship, normalize_status,
    status_refs,
};
pub use models::*;
pub use store::{Begin, LoadingGuard, LoadingIndicator, SkipReason, Store, StoreState};
