//! Profile directory
//!
//! `/api/v1/directory` is offset-paginated and public. After each page the
//! relationships of the listed accounts are loaded.

use std::fmt;
use std::str::FromStr;

use super::pagination::{Collection, OperationConfig, Outcome, Paging, PaginationController};
use super::relationships::RelationshipsService;
use crate::data::{CollectionKey, EntityKind};

/// Directory sort order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DirectoryOrder {
    /// Recently active first
    #[default]
    Active,
    /// Newest accounts first
    New,
}

impl DirectoryOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            DirectoryOrder::Active => "active",
            DirectoryOrder::New => "new",
        }
    }
}

impl fmt::Display for DirectoryOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DirectoryOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "active" => Ok(DirectoryOrder::Active),
            "new" => Ok(DirectoryOrder::New),
            other => Err(format!("unknown directory order: {}", other)),
        }
    }
}

/// Directory filters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectoryParams {
    pub order: Option<DirectoryOrder>,
    /// Only accounts of the local instance
    pub local: bool,
}

impl DirectoryParams {
    pub fn to_query(&self) -> Vec<(String, String)> {
        let mut query = Vec::new();
        if let Some(order) = self.order {
            query.push(("order".to_string(), order.as_str().to_string()));
        }
        if self.local {
            query.push(("local".to_string(), "true".to_string()));
        }
        query
    }
}

/// Directory service
#[derive(Clone)]
pub struct DirectoryService {
    controller: PaginationController,
    relationships: RelationshipsService,
    page_size: u32,
}

impl DirectoryService {
    pub fn new(
        controller: PaginationController,
        relationships: RelationshipsService,
        page_size: u32,
    ) -> Self {
        Self {
            controller,
            relationships,
            page_size,
        }
    }

    pub fn collection(&self) -> Collection {
        Collection {
            key: CollectionKey::directory(),
            endpoint: "/api/v1/directory".to_string(),
            entity: EntityKind::Account,
            page_size: self.page_size,
            requires_auth: false,
            paging: Paging::Offset,
            fetch: OperationConfig::TRACKED,
            expand: OperationConfig::TRACKED,
        }
    }

    /// Load the first directory page with the given filters
    pub async fn fetch_directory(&self, params: &DirectoryParams) -> Outcome {
        let outcome = self
            .controller
            .fetch_first_page(&self.collection(), &params.to_query())
            .await;
        self.load_relationships(&outcome).await;
        outcome
    }

    /// Load the next page; filters carry over from the first fetch
    pub async fn expand_directory(&self) -> Outcome {
        let outcome = self.controller.expand_next_page(&self.collection()).await;
        self.load_relationships(&outcome).await;
        outcome
    }

    async fn load_relationships(&self, outcome: &Outcome) {
        let Outcome::Loaded { items, .. } = outcome else {
            return;
        };
        if items.is_empty() {
            return;
        }

        let ids: Vec<String> = items.iter().map(|item| item.0.clone()).collect();
        if let Err(error) = self.relationships.fetch_relationships(&ids).await {
            tracing::warn!(%error, "Failed to load directory relationships");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn params_render_only_set_filters() {
        assert!(DirectoryParams::default().to_query().is_empty());

        let params = DirectoryParams {
            order: Some(DirectoryOrder::New),
            local: true,
        };
        assert_eq!(
            params.to_query(),
            vec![
                ("order".to_string(), "new".to_string()),
                ("local".to_string(), "true".to_string()),
            ]
        );
    }

    #[test]
    fn order_parses_case_insensitively() {
        assert_eq!("Active".parse::<DirectoryOrder>(), Ok(DirectoryOrder::Active));
        assert_eq!("new".parse::<DirectoryOrder>(), Ok(DirectoryOrder::New));
        assert!("popular".parse::<DirectoryOrder>().is_err());
    }
}
