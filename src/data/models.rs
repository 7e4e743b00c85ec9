//! Data models
//!
//! Normalized entity records and per-collection pagination cursors.
//! Cursors only hold references; entity data lives in the store tables.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// Keys and references
// =============================================================================

/// Identifies one logical collection (e.g. `favourites:{account_id}`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CollectionKey(String);

impl CollectionKey {
    /// The authenticated user's favourites
    pub fn favourites() -> Self {
        Self("favourites".to_string())
    }

    /// Another account's favourites (Pleroma extension)
    pub fn account_favourites(account_id: &str) -> Self {
        Self(format!("favourites:{}", account_id))
    }

    /// The profile directory
    pub fn directory() -> Self {
        Self("directory".to_string())
    }

    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Collection family without the per-account suffix, for metric labels
    pub fn family(&self) -> &str {
        self.0.split(':').next().unwrap_or(&self.0)
    }
}

impl fmt::Display for CollectionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque reference into an entity table
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityRef(pub String);

impl EntityRef {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for EntityRef {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for EntityRef {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Entity table a collection's references resolve against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Account,
    Status,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Account => "account",
            EntityKind::Status => "status",
        }
    }
}

// =============================================================================
// Cursor
// =============================================================================

/// Lifecycle of a cursor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CursorStatus {
    #[default]
    Idle,
    Loading,
    Loaded,
    Failed,
}

/// Client-side pagination state for one collection
///
/// `next == None` means no further pages exist. `is_loading` is set while a
/// request for this key is outstanding.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cursor {
    pub items: Vec<EntityRef>,
    pub next: Option<String>,
    pub is_loading: bool,
    pub status: CursorStatus,
    /// Message of the most recent failure, cleared by the next success
    pub last_error: Option<String>,
}

impl Cursor {
    pub fn has_more(&self) -> bool {
        self.next.is_some()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

// =============================================================================
// Entity records
// =============================================================================

/// Normalized account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountRecord {
    pub id: String,
    pub username: String,
    pub acct: String,
    pub display_name: String,
    /// HTML-escaped display name, safe to embed
    pub display_name_html: String,
    /// Sanitized bio HTML
    pub note: String,
    pub url: String,
    pub avatar: String,
    pub header: String,
    pub locked: bool,
    pub bot: bool,
    pub followers_count: i64,
    pub following_count: i64,
    pub statuses_count: i64,
    pub created_at: Option<DateTime<Utc>>,
    pub pleroma: Option<PleromaAccount>,
}

/// Pleroma admin-facing account flags
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PleromaAccount {
    pub is_admin: bool,
    pub is_moderator: bool,
    pub is_suggested: bool,
}

/// Normalized status; nested objects are replaced by ids
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusRecord {
    pub id: String,
    pub uri: String,
    pub url: Option<String>,
    pub account_id: String,
    pub reblog_id: Option<String>,
    pub in_reply_to_id: Option<String>,
    /// Sanitized content HTML
    pub content: String,
    pub spoiler_text: String,
    /// Plain-text rendering of spoiler and content, for local search
    pub search_index: String,
    pub sensitive: bool,
    pub visibility: String,
    pub language: Option<String>,
    pub media_count: usize,
    pub replies_count: i64,
    pub reblogs_count: i64,
    pub favourites_count: i64,
    pub favourited: bool,
    pub reblogged: bool,
    pub bookmarked: bool,
    pub created_at: DateTime<Utc>,
    pub edited_at: Option<DateTime<Utc>>,
}

/// Relationship between the authenticated user and an account
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipRecord {
    pub id: String,
    pub following: bool,
    pub followed_by: bool,
    pub requested: bool,
    pub blocking: bool,
    pub blocked_by: bool,
    pub muting: bool,
    pub domain_blocking: bool,
    pub endorsed: bool,
    pub note: String,
}
