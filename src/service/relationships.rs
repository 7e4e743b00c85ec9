//! Relationship lookups
//!
//! Loads the authenticated user's relationship to a set of accounts, e.g.
//! after a directory page so follow buttons can be rendered.

use std::collections::HashSet;
use std::sync::Arc;

use crate::api::{ApiClient, RelationshipResponse};
use crate::data::{Event, ImportBatch, Store};
use crate::error::Result;

#[derive(Clone)]
pub struct RelationshipsService {
    api: Arc<ApiClient>,
    store: Arc<Store>,
}

impl RelationshipsService {
    pub fn new(api: Arc<ApiClient>, store: Arc<Store>) -> Self {
        Self { api, store }
    }

    /// Fetch relationships not yet in the store
    ///
    /// # Returns
    /// Number of relationships imported; 0 when unauthenticated or when
    /// every id is already known
    pub async fn fetch_relationships(&self, account_ids: &[String]) -> Result<usize> {
        if !self.api.is_authenticated() {
            return Ok(0);
        }

        let missing: Vec<String> = {
            let mut seen = HashSet::new();
            let candidates: Vec<String> = account_ids
                .iter()
                .filter(|id| seen.insert(id.as_str()))
                .cloned()
                .collect();
            self.store
                .read(|state| {
                    candidates
                        .into_iter()
                        .filter(|id| !state.relationships.contains_key(id))
                        .collect::<Vec<_>>()
                })
                .await
        };

        if missing.is_empty() {
            tracing::debug!("All relationships already loaded");
            return Ok(0);
        }

        let query: Vec<(String, String)> = missing
            .iter()
            .map(|id| ("id[]".to_string(), id.clone()))
            .collect();

        let response = self
            .api
            .get("/api/v1/accounts/relationships", &query)
            .await?;
        let relationships: Vec<RelationshipResponse> = response.json()?;

        let batch = ImportBatch::from_relationships(&relationships);
        let count = batch.relationships.len();
        if count > 0 {
            self.store.dispatch(Event::Import(Arc::new(batch))).await;
        }

        tracing::debug!(requested = missing.len(), imported = count, "Relationships loaded");
        Ok(count)
    }
}
