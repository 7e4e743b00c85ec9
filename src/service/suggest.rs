//! Suggested accounts (Pleroma admin)
//!
//! Marks accounts as suggested/unsuggested. The store is updated before the
//! request and reverted if the server rejects it.

use std::sync::Arc;

use crate::api::{ApiClient, NicknamesRequest};
use crate::data::{Event, Store};
use crate::error::{ClientError, Result};

#[derive(Clone)]
pub struct SuggestService {
    api: Arc<ApiClient>,
    store: Arc<Store>,
}

impl SuggestService {
    pub fn new(api: Arc<ApiClient>, store: Arc<Store>) -> Self {
        Self { api, store }
    }

    pub async fn suggest(&self, account_ids: &[String]) -> Result<()> {
        self.set_suggested(account_ids, true).await
    }

    pub async fn unsuggest(&self, account_ids: &[String]) -> Result<()> {
        self.set_suggested(account_ids, false).await
    }

    async fn set_suggested(&self, account_ids: &[String], suggested: bool) -> Result<()> {
        if !self.api.is_authenticated() {
            return Err(ClientError::Unauthenticated);
        }

        // Ids without a stored account cannot be mapped to a nickname.
        let nicknames: Vec<String> = self
            .store
            .read(|state| {
                account_ids
                    .iter()
                    .filter_map(|id| state.accounts.get(id).map(|account| account.acct.clone()))
                    .collect::<Vec<_>>()
            })
            .await;

        if nicknames.is_empty() {
            tracing::debug!("No known accounts to update");
            return Ok(());
        }

        self.store
            .dispatch(Event::SuggestedChanged {
                account_ids: account_ids.to_vec(),
                suggested,
            })
            .await;

        let path = if suggested {
            "/api/v1/pleroma/admin/users/suggest"
        } else {
            "/api/v1/pleroma/admin/users/unsuggest"
        };

        match self.api.patch_json(path, &NicknamesRequest { nicknames }).await {
            Ok(_) => {
                tracing::info!(count = account_ids.len(), suggested, "Suggestion flag updated");
                Ok(())
            }
            Err(error) => {
                tracing::warn!(%error, suggested, "Suggestion update rejected; reverting");
                self.store
                    .dispatch(Event::SuggestedChanged {
                        account_ids: account_ids.to_vec(),
                        suggested: !suggested,
                    })
                    .await;
                Err(error)
            }
        }
    }
}
