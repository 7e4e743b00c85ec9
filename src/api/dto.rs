//! Mastodon API response DTOs
//!
//! Explicit schemas for the payloads this client consumes. Identity fields
//! are required; cosmetic fields fall back to defaults so that minor server
//! differences (Pleroma, Akkoma, GoToSocial) do not fail a whole page.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ClientError, Result};

/// Boundary validation applied after deserialization
pub trait Validate {
    fn validate(&self) -> Result<()>;
}

impl<T: Validate> Validate for Vec<T> {
    fn validate(&self) -> Result<()> {
        self.iter().try_for_each(Validate::validate)
    }
}

fn require_non_empty(value: &str, field: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(ClientError::Decode(format!("{} must not be empty", field)));
    }
    Ok(())
}

/// Account response (Mastodon API compatible)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountResponse {
    pub id: String,
    pub username: String,
    pub acct: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub locked: bool,
    #[serde(default)]
    pub bot: bool,
    #[serde(default)]
    pub discoverable: Option<bool>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub note: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub avatar: String,
    #[serde(default)]
    pub avatar_static: String,
    #[serde(default)]
    pub header: String,
    #[serde(default)]
    pub followers_count: i64,
    #[serde(default)]
    pub following_count: i64,
    #[serde(default)]
    pub statuses_count: i64,
    #[serde(default)]
    pub last_status_at: Option<String>,
    /// Pleroma/Akkoma extension block
    #[serde(default)]
    pub pleroma: Option<PleromaAccountResponse>,
}

/// Pleroma-specific account fields
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PleromaAccountResponse {
    pub is_admin: bool,
    pub is_moderator: bool,
    pub is_suggested: Option<bool>,
}

impl Validate for AccountResponse {
    fn validate(&self) -> Result<()> {
        require_non_empty(&self.id, "account.id")?;
        require_non_empty(&self.username, "account.username")?;
        require_non_empty(&self.acct, "account.acct")
    }
}

/// Status response (Mastodon API compatible)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub id: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub in_reply_to_id: Option<String>,
    #[serde(default)]
    pub in_reply_to_account_id: Option<String>,
    #[serde(default)]
    pub sensitive: bool,
    #[serde(default)]
    pub spoiler_text: String,
    pub visibility: String,
    #[serde(default)]
    pub language: Option<String>,
    pub uri: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub replies_count: i64,
    #[serde(default)]
    pub reblogs_count: i64,
    #[serde(default)]
    pub favourites_count: i64,
    #[serde(default)]
    pub edited_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub reblog: Option<Box<StatusResponse>>,
    pub account: AccountResponse,
    #[serde(default)]
    pub media_attachments: Vec<MediaAttachmentResponse>,
    #[serde(default)]
    pub favourited: Option<bool>,
    #[serde(default)]
    pub reblogged: Option<bool>,
    #[serde(default)]
    pub bookmarked: Option<bool>,
    #[serde(default)]
    pub pinned: Option<bool>,
}

impl Validate for StatusResponse {
    fn validate(&self) -> Result<()> {
        require_non_empty(&self.id, "status.id")?;
        require_non_empty(&self.uri, "status.uri")?;
        self.account.validate()?;
        match &self.reblog {
            Some(reblog) => reblog.validate(),
            None => Ok(()),
        }
    }
}

/// Media attachment response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaAttachmentResponse {
    pub id: String,
    #[serde(rename = "type")]
    pub media_type: String,
    pub url: String,
    #[serde(default)]
    pub preview_url: Option<String>,
    #[serde(default)]
    pub remote_url: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub blurhash: Option<String>,
}

/// Relationship response
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RelationshipResponse {
    pub id: String,
    pub following: bool,
    pub showing_reblogs: bool,
    pub notifying: bool,
    pub followed_by: bool,
    pub blocking: bool,
    pub blocked_by: bool,
    pub muting: bool,
    pub muting_notifications: bool,
    pub requested: bool,
    pub domain_blocking: bool,
    pub endorsed: bool,
    pub note: String,
}

impl Validate for RelationshipResponse {
    fn validate(&self) -> Result<()> {
        require_non_empty(&self.id, "relationship.id")
    }
}

/// Body of the Pleroma admin suggest/unsuggest endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NicknamesRequest {
    pub nicknames: Vec<String>,
}
