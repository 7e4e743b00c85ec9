//! Entity importer
//!
//! Converts API DTOs into normalized store records. Nested objects (a
//! status's account, a reblogged status) are flattened into their own tables
//! and replaced by ids.

use std::collections::HashMap;

use crate::api::{AccountResponse, RelationshipResponse, StatusResponse};
use crate::data::models::{
    AccountRecord, EntityRef, PleromaAccount, RelationshipRecord, StatusRecord,
};

/// Records ready to be merged into the store
///
/// Duplicates inside one batch collapse to the last occurrence.
#[derive(Debug, Clone, Default)]
pub struct ImportBatch {
    pub accounts: Vec<AccountRecord>,
    pub statuses: Vec<StatusRecord>,
    pub relationships: Vec<RelationshipRecord>,
}

impl ImportBatch {
    /// Import a page of statuses together with their accounts and reblogs
    pub fn from_statuses(statuses: &[StatusResponse]) -> Self {
        let mut batch = Self::default();
        for status in statuses {
            batch.push_status(status);
        }
        batch.dedup();
        batch
    }

    /// Import a page of accounts
    pub fn from_accounts(accounts: &[AccountResponse]) -> Self {
        let mut batch = Self {
            accounts: accounts.iter().map(normalize_account).collect(),
            ..Self::default()
        };
        batch.dedup();
        batch
    }

    pub fn from_relationships(relationships: &[RelationshipResponse]) -> Self {
        let mut batch = Self {
            relationships: relationships.iter().map(normalize_relationship).collect(),
            ..Self::default()
        };
        batch.dedup();
        batch
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty() && self.statuses.is_empty() && self.relationships.is_empty()
    }

    fn push_status(&mut self, status: &StatusResponse) {
        if let Some(reblog) = &status.reblog {
            self.push_status(reblog);
        }
        self.accounts.push(normalize_account(&status.account));
        self.statuses.push(normalize_status(status));
    }

    fn dedup(&mut self) {
        dedup_by_id(&mut self.accounts, |a| &a.id);
        dedup_by_id(&mut self.statuses, |s| &s.id);
        dedup_by_id(&mut self.relationships, |r| &r.id);
    }
}

/// Keep the last record for each id, at the position of its first occurrence
fn dedup_by_id<T>(records: &mut Vec<T>, id: impl Fn(&T) -> &String) {
    let mut last_index: HashMap<String, usize> = HashMap::new();
    for (index, record) in records.iter().enumerate() {
        last_index.insert(id(record).clone(), index);
    }
    if last_index.len() == records.len() {
        return;
    }

    let mut order: Vec<usize> = Vec::with_capacity(last_index.len());
    let mut seen = std::collections::HashSet::new();
    for record in records.iter() {
        let key = id(record);
        if seen.insert(key.clone()) {
            order.push(last_index[key]);
        }
    }

    let mut slots: Vec<Option<T>> = records.drain(..).map(Some).collect();
    records.extend(order.into_iter().filter_map(|index| slots[index].take()));
}

/// References for the top-level entries of a status page, in response order
pub fn status_refs(statuses: &[StatusResponse]) -> Vec<EntityRef> {
    statuses.iter().map(|s| EntityRef::from(s.id.as_str())).collect()
}

/// References for an account page, in response order
pub fn account_refs(accounts: &[AccountResponse]) -> Vec<EntityRef> {
    accounts.iter().map(|a| EntityRef::from(a.id.as_str())).collect()
}

/// Convert AccountResponse to AccountRecord
pub fn normalize_account(account: &AccountResponse) -> AccountRecord {
    let display_name = if account.display_name.trim().is_empty() {
        account.username.clone()
    } else {
        account.display_name.clone()
    };

    AccountRecord {
        id: account.id.clone(),
        username: account.username.clone(),
        acct: account.acct.clone(),
        display_name_html: html_escape::encode_text(&display_name).into_owned(),
        display_name,
        note: ammonia::clean(&account.note),
        url: account.url.clone(),
        avatar: account.avatar.clone(),
        header: account.header.clone(),
        locked: account.locked,
        bot: account.bot,
        followers_count: account.followers_count,
        following_count: account.following_count,
        statuses_count: account.statuses_count,
        created_at: account.created_at,
        pleroma: account.pleroma.as_ref().map(|p| PleromaAccount {
            is_admin: p.is_admin,
            is_moderator: p.is_moderator,
            is_suggested: p.is_suggested.unwrap_or(false),
        }),
    }
}

/// Convert StatusResponse to StatusRecord (nested reblog replaced by id)
pub fn normalize_status(status: &StatusResponse) -> StatusRecord {
    StatusRecord {
        id: status.id.clone(),
        uri: status.uri.clone(),
        url: status.url.clone(),
        account_id: status.account.id.clone(),
        reblog_id: status.reblog.as_ref().map(|r| r.id.clone()),
        in_reply_to_id: status.in_reply_to_id.clone(),
        content: ammonia::clean(&status.content),
        spoiler_text: status.spoiler_text.clone(),
        search_index: search_index(&status.spoiler_text, &status.content),
        sensitive: status.sensitive,
        visibility: status.visibility.clone(),
        language: status.language.clone(),
        media_count: status.media_attachments.len(),
        replies_count: status.replies_count,
        reblogs_count: status.reblogs_count,
        favourites_count: status.favourites_count,
        favourited: status.favourited.unwrap_or(false),
        reblogged: status.reblogged.unwrap_or(false),
        bookmarked: status.bookmarked.unwrap_or(false),
        created_at: status.created_at,
        edited_at: status.edited_at,
    }
}

pub fn normalize_relationship(relationship: &RelationshipResponse) -> RelationshipRecord {
    RelationshipRecord {
        id: relationship.id.clone(),
        following: relationship.following,
        followed_by: relationship.followed_by,
        requested: relationship.requested,
        blocking: relationship.blocking,
        blocked_by: relationship.blocked_by,
        muting: relationship.muting,
        domain_blocking: relationship.domain_blocking,
        endorsed: relationship.endorsed,
        note: relationship.note.clone(),
    }
}

/// Plain text of spoiler and content, paragraphs separated by blank lines
fn search_index(spoiler_text: &str, content: &str) -> String {
    let with_breaks = content
        .replace("<br />", "\n")
        .replace("<br/>", "\n")
        .replace("<br>", "\n")
        .replace("</p><p>", "\n\n");
    let stripped = ammonia::Builder::empty().clean(&with_breaks).to_string();
    let text = html_escape::decode_html_entities(&stripped);

    [spoiler_text.trim(), text.trim()]
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(id: &str, display_name: &str) -> AccountResponse {
        serde_json::from_value(serde_json::json!({
            "id": id,
            "username": format!("user{}", id),
            "acct": format!("user{}@remote.example", id),
            "display_name": display_name,
            "note": "<p>bio<script>alert(1)</script></p>",
        }))
        .unwrap()
    }

    fn status(id: &str, account_id: &str, reblog: Option<StatusResponse>) -> StatusResponse {
        let mut status: StatusResponse = serde_json::from_value(serde_json::json!({
            "id": id,
            "created_at": "2024-05-01T12:00:00Z",
            "visibility": "public",
            "uri": format!("https://remote.example/statuses/{}", id),
            "content": "<p>Hello &amp; welcome</p><p>line<br />two</p>",
            "spoiler_text": "cw",
            "favourited": true,
            "account": {
                "id": account_id,
                "username": "alice",
                "acct": "alice",
            },
        }))
        .unwrap();
        status.reblog = reblog.map(Box::new);
        status
    }

    #[test]
    fn display_name_is_escaped_and_falls_back_to_username() {
        let escaped = normalize_account(&account("1", "<b>Bob</b> & co"));
        assert_eq!(escaped.display_name_html, "&lt;b&gt;Bob&lt;/b&gt; &amp; co");

        let blank = normalize_account(&account("2", "  "));
        assert_eq!(blank.display_name, "user2");
    }

    #[test]
    fn note_is_sanitized() {
        let record = normalize_account(&account("1", "Bob"));
        assert!(!record.note.contains("script"));
        assert!(record.note.contains("bio"));
    }

    #[test]
    fn search_index_is_plain_text() {
        let record = normalize_status(&status("10", "a1", None));
        assert_eq!(record.search_index, "cw\n\nHello & welcome\n\nline\ntwo");
        assert!(record.favourited);
    }

    #[test]
    fn reblogs_are_flattened_before_the_wrapper() {
        let inner = status("20", "a2", None);
        let outer = status("21", "a1", Some(inner));

        let batch = ImportBatch::from_statuses(&[outer]);
        let ids: Vec<_> = batch.statuses.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["20", "21"]);
        assert_eq!(batch.statuses[1].reblog_id.as_deref(), Some("20"));
        assert_eq!(batch.accounts.len(), 2);
    }

    #[test]
    fn duplicate_accounts_collapse_to_last_occurrence() {
        let mut first = account("1", "Old");
        first.followers_count = 1;
        let mut second = account("1", "New");
        second.followers_count = 2;

        let batch = ImportBatch::from_accounts(&[first, account("2", "Other"), second]);
        assert_eq!(batch.accounts.len(), 2);
        assert_eq!(batch.accounts[0].id, "1");
        assert_eq!(batch.accounts[0].display_name, "New");
        assert_eq!(batch.accounts[1].id, "2");
    }

    #[test]
    fn refs_preserve_response_order() {
        let page = vec![status("3", "a", None), status("1", "a", None), status("2", "a", None)];
        let refs: Vec<_> = status_refs(&page).into_iter().map(|r| r.0).collect();
        assert_eq!(refs, vec!["3", "1", "2"]);
    }
}
