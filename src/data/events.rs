//! Store events
//!
//! Every state change goes through one of these. Each pagination operation
//! emits a fixed triple: `Request`, then exactly one of `Success` or `Fail`.

use std::fmt;
use std::sync::Arc;

use crate::data::importer::ImportBatch;
use crate::data::models::{CollectionKey, EntityRef};
use crate::error::ClientError;

/// Which pagination operation an event belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// First page; replaces the cursor on success
    Fetch,
    /// Follow-up page; appends on success
    Expand,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Fetch => "fetch",
            Phase::Expand => "expand",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub enum Event {
    Request {
        key: CollectionKey,
        phase: Phase,
    },
    Success {
        key: CollectionKey,
        phase: Phase,
        items: Vec<EntityRef>,
        next: Option<String>,
    },
    Fail {
        key: CollectionKey,
        phase: Phase,
        error: Arc<ClientError>,
    },
    /// Normalized entities merged into the tables
    Import(Arc<ImportBatch>),
    /// Optimistic or reverted change of the Pleroma "suggested" flag
    SuggestedChanged {
        account_ids: Vec<String>,
        suggested: bool,
    },
}

impl Event {
    /// Collection the event targets, if any
    pub fn key(&self) -> Option<&CollectionKey> {
        match self {
            Event::Request { key, .. } | Event::Success { key, .. } | Event::Fail { key, .. } => {
                Some(key)
            }
            Event::Import(_) | Event::SuggestedChanged { .. } => None,
        }
    }

    /// Legacy action name, e.g. `ACCOUNT_FAVOURITED_STATUSES_EXPAND_FAIL`
    pub fn action_type(&self) -> String {
        let (key, phase, outcome) = match self {
            Event::Request { key, phase } => (key, phase, "REQUEST"),
            Event::Success { key, phase, .. } => (key, phase, "SUCCESS"),
            Event::Fail { key, phase, .. } => (key, phase, "FAIL"),
            Event::Import(_) => return "ENTITIES_IMPORT".to_string(),
            Event::SuggestedChanged { .. } => return "ACCOUNTS_SUGGESTED_CHANGE".to_string(),
        };

        let prefix = match key.as_str() {
            "favourites" => "FAVOURITED_STATUSES".to_string(),
            "directory" => "DIRECTORY".to_string(),
            other if other.starts_with("favourites:") => {
                "ACCOUNT_FAVOURITED_STATUSES".to_string()
            }
            other => other.replace([':', '-'], "_").to_ascii_uppercase(),
        };

        format!(
            "{}_{}_{}",
            prefix,
            phase.as_str().to_ascii_uppercase(),
            outcome
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_types_match_legacy_names() {
        let request = Event::Request {
            key: CollectionKey::favourites(),
            phase: Phase::Fetch,
        };
        assert_eq!(request.action_type(), "FAVOURITED_STATUSES_FETCH_REQUEST");

        let fail = Event::Fail {
            key: CollectionKey::account_favourites("7"),
            phase: Phase::Expand,
            error: Arc::new(ClientError::Unauthenticated),
        };
        assert_eq!(
            fail.action_type(),
            "ACCOUNT_FAVOURITED_STATUSES_EXPAND_FAIL"
        );

        let success = Event::Success {
            key: CollectionKey::directory(),
            phase: Phase::Fetch,
            items: vec![],
            next: None,
        };
        assert_eq!(success.action_type(), "DIRECTORY_FETCH_SUCCESS");
    }

    #[test]
    fn import_events_have_no_key() {
        let event = Event::Import(Arc::new(ImportBatch::default()));
        assert!(event.key().is_none());
        assert_eq!(event.action_type(), "ENTITIES_IMPORT");
    }
}
