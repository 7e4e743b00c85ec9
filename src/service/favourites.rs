//! Favourited statuses
//!
//! The authenticated user's favourites (`/api/v1/favourites`) and, on
//! Pleroma-compatible servers, another account's public favourites
//! (`/api/v1/pleroma/accounts/{id}/favourites`).

use super::pagination::{Collection, OperationConfig, Outcome, Paging, PaginationController};
use crate::data::{CollectionKey, EntityKind};

/// Favourites service
#[derive(Clone)]
pub struct FavouritesService {
    controller: PaginationController,
    page_size: u32,
}

impl FavouritesService {
    pub fn new(controller: PaginationController, page_size: u32) -> Self {
        Self {
            controller,
            page_size,
        }
    }

    /// Collection for the authenticated user's favourites
    pub fn collection(&self) -> Collection {
        self.statuses_collection(
            CollectionKey::favourites(),
            "/api/v1/favourites".to_string(),
        )
    }

    /// Collection for another account's favourites
    pub fn account_collection(&self, account_id: &str) -> Collection {
        self.statuses_collection(
            CollectionKey::account_favourites(account_id),
            account_favourites_path(account_id),
        )
    }

    fn statuses_collection(&self, key: CollectionKey, endpoint: String) -> Collection {
        Collection {
            key,
            endpoint,
            entity: EntityKind::Status,
            page_size: self.page_size,
            requires_auth: true,
            paging: Paging::Link,
            // First loads are silent; only "load more" shows the indicator.
            fetch: OperationConfig::UNTRACKED,
            expand: OperationConfig::TRACKED,
        }
    }

    pub async fn fetch_favourited_statuses(&self) -> Outcome {
        self.controller
            .fetch_first_page(&self.collection(), &[])
            .await
    }

    pub async fn expand_favourited_statuses(&self) -> Outcome {
        self.controller.expand_next_page(&self.collection()).await
    }

    pub async fn fetch_account_favourited_statuses(&self, account_id: &str) -> Outcome {
        self.controller
            .fetch_first_page(&self.account_collection(account_id), &[])
            .await
    }

    pub async fn expand_account_favourited_statuses(&self, account_id: &str) -> Outcome {
        self.controller
            .expand_next_page(&self.account_collection(account_id))
            .await
    }
}

/// Endpoint path for an account's favourites; the id is one path segment
fn account_favourites_path(account_id: &str) -> String {
    format!(
        "/api/v1/pleroma/accounts/{}/favourites",
        urlencoding::encode(account_id)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn account_id_is_percent_encoded_as_path_segment() {
        assert_eq!(
            account_favourites_path("9zX"),
            "/api/v1/pleroma/accounts/9zX/favourites"
        );
        assert_eq!(
            account_favourites_path("a b+c/d"),
            "/api/v1/pleroma/accounts/a%20b%2Bc%2Fd/favourites"
        );
    }
}
