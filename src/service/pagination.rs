//! Pagination controller
//!
//! Drives one page load for a collection:
//! request → import → success/fail dispatch → cursor update.
//!
//! Errors never leave this module as `Err`. A failed load dispatches exactly
//! one `Fail` event and leaves the cursor's items and `next` untouched.
//! There is no retry; calling the operation again is the retry.

use std::sync::Arc;

use tracing::Instrument;
use url::Url;

use crate::api::{AccountResponse, ApiClient, ApiResponse, StatusResponse};
use crate::data::{
    Begin, CollectionKey, EntityKind, EntityRef, Event, ImportBatch, Phase, SkipReason, Store,
    account_refs, status_refs,
};
use crate::error::{ClientError, Result};

/// How a collection advertises its next page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Paging {
    /// `Link: <..>; rel="next"` response header
    Link,
    /// `offset`/`limit` query parameters; a short page ends the collection
    Offset,
}

/// Per-operation settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperationConfig {
    /// Count the request on the global loading indicator
    pub track_progress: bool,
}

impl OperationConfig {
    pub const TRACKED: Self = Self {
        track_progress: true,
    };
    pub const UNTRACKED: Self = Self {
        track_progress: false,
    };
}

/// Description of one remote list endpoint
#[derive(Debug, Clone)]
pub struct Collection {
    pub key: CollectionKey,
    /// Path relative to the instance base URL
    pub endpoint: String,
    pub entity: EntityKind,
    /// `limit` sent with the first page
    pub page_size: u32,
    pub requires_auth: bool,
    pub paging: Paging,
    pub fetch: OperationConfig,
    pub expand: OperationConfig,
}

impl Collection {
    fn operation(&self, phase: Phase) -> OperationConfig {
        match phase {
            Phase::Fetch => self.fetch,
            Phase::Expand => self.expand,
        }
    }
}

/// What a controller operation did
#[derive(Debug, Clone)]
pub enum Outcome {
    /// No request was issued and no event dispatched
    Skipped(SkipReason),
    /// Page imported and merged into the cursor
    Loaded {
        /// References of this page only, in response order
        items: Vec<EntityRef>,
        has_more: bool,
    },
    /// Request failed; one `Fail` event was dispatched
    Failed(Arc<ClientError>),
}

impl Outcome {
    pub fn is_loaded(&self) -> bool {
        matches!(self, Outcome::Loaded { .. })
    }

    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Skipped(_) => "skipped",
            Outcome::Loaded { .. } => "loaded",
            Outcome::Failed(_) => "failed",
        }
    }
}

/// One decoded page
struct Page {
    items: Vec<EntityRef>,
    batch: ImportBatch,
    next: Option<String>,
}

/// Pagination controller shared by all list-backed collections
#[derive(Clone)]
pub struct PaginationController {
    api: Arc<ApiClient>,
    store: Arc<Store>,
}

impl PaginationController {
    pub fn new(api: Arc<ApiClient>, store: Arc<Store>) -> Self {
        Self { api, store }
    }

    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    /// Load the first page and replace the cursor
    ///
    /// # Arguments
    /// * `collection` - Endpoint description
    /// * `base_params` - Endpoint-specific filters; `limit` and `offset`
    ///   are controlled by the collection and overridden
    pub async fn fetch_first_page(
        &self,
        collection: &Collection,
        base_params: &[(String, String)],
    ) -> Outcome {
        let mut query: Vec<(String, String)> = base_params
            .iter()
            .filter(|(name, _)| name != "limit" && name != "offset")
            .cloned()
            .collect();
        query.push(("limit".to_string(), collection.page_size.to_string()));

        self.run(collection, Phase::Fetch, query).await
    }

    /// Load the page behind the cursor's `next` URL and append it
    ///
    /// Silent no-op when the cursor does not exist, is loading, or has no
    /// `next` URL.
    pub async fn expand_next_page(&self, collection: &Collection) -> Outcome {
        self.run(collection, Phase::Expand, Vec::new()).await
    }

    async fn run(&self, collection: &Collection, phase: Phase, query: Vec<(String, String)>) -> Outcome {
        let request_id = ulid::Ulid::new();
        let span = tracing::info_span!(
            "page",
            collection = %collection.key,
            %phase,
            %request_id
        );

        // The load runs as its own task: once `begin` has marked the cursor
        // as loading, only `Success` or `Fail` may clear it, even if the
        // caller stops waiting.
        let controller = self.clone();
        let owned = collection.clone();
        let task = tokio::spawn(
            async move { controller.run_inner(&owned, phase, query).await }.instrument(span),
        );

        match task.await {
            Ok(outcome) => outcome,
            Err(error) => {
                tracing::error!(
                    collection = %collection.key,
                    %phase,
                    error = %error,
                    "Page load task aborted"
                );
                Outcome::Failed(Arc::new(ClientError::Internal(anyhow::anyhow!(
                    "page load task aborted: {}",
                    error
                ))))
            }
        }
    }

    async fn run_inner(
        &self,
        collection: &Collection,
        phase: Phase,
        query: Vec<(String, String)>,
    ) -> Outcome {
        use crate::metrics::{ERRORS_TOTAL, FETCH_DURATION_SECONDS, FETCH_REQUESTS_TOTAL};

        let family = collection.key.family();

        if collection.requires_auth && !self.api.is_authenticated() {
            tracing::debug!("Skipping page load: not authenticated");
            return self.skipped(collection, phase, SkipReason::Unauthenticated);
        }

        let (loaded, next) = match self.store.begin(&collection.key, phase).await {
            Begin::Started { loaded, next } => (loaded, next),
            Begin::Skipped(reason) => {
                tracing::debug!(reason = reason.as_str(), "Skipping page load");
                return self.skipped(collection, phase, reason);
            }
        };

        let _loading = collection
            .operation(phase)
            .track_progress
            .then(|| self.store.loading().start());

        let timer = FETCH_DURATION_SECONDS
            .with_label_values(&[family, phase.as_str()])
            .start_timer();

        let target = match phase {
            Phase::Fetch => Ok(collection.endpoint.clone()),
            Phase::Expand => next.ok_or_else(|| {
                ClientError::Internal(anyhow::anyhow!("expandable cursor without next URL"))
            }),
        };
        let result = match target {
            Ok(target) => self.load_page(collection, &target, &query, loaded, phase).await,
            Err(error) => Err(error),
        };
        timer.observe_duration();

        match result {
            Ok(page) => {
                let count = page.items.len();
                let has_more = page.next.is_some();

                if !page.batch.is_empty() {
                    self.store.dispatch(Event::Import(Arc::new(page.batch))).await;
                }
                self.store
                    .dispatch(Event::Success {
                        key: collection.key.clone(),
                        phase,
                        items: page.items.clone(),
                        next: page.next,
                    })
                    .await;

                FETCH_REQUESTS_TOTAL
                    .with_label_values(&[family, phase.as_str(), "loaded"])
                    .inc();
                tracing::info!(items = count, has_more, "Page loaded");

                Outcome::Loaded {
                    items: page.items,
                    has_more,
                }
            }
            Err(error) => {
                FETCH_REQUESTS_TOTAL
                    .with_label_values(&[family, phase.as_str(), "failed"])
                    .inc();
                ERRORS_TOTAL
                    .with_label_values(&[error.kind(), family])
                    .inc();
                tracing::warn!(error = %error, error_type = error.kind(), "Page load failed");

                let error = Arc::new(error);
                self.store
                    .dispatch(Event::Fail {
                        key: collection.key.clone(),
                        phase,
                        error: Arc::clone(&error),
                    })
                    .await;

                Outcome::Failed(error)
            }
        }
    }

    fn skipped(&self, collection: &Collection, phase: Phase, reason: SkipReason) -> Outcome {
        crate::metrics::FETCH_REQUESTS_TOTAL
            .with_label_values(&[collection.key.family(), phase.as_str(), "skipped"])
            .inc();
        Outcome::Skipped(reason)
    }

    async fn load_page(
        &self,
        collection: &Collection,
        target: &str,
        query: &[(String, String)],
        loaded: usize,
        phase: Phase,
    ) -> Result<Page> {
        let response = self.api.get(target, query).await?;

        let (items, batch) = match collection.entity {
            EntityKind::Status => {
                let statuses: Vec<StatusResponse> = response.json()?;
                (status_refs(&statuses), ImportBatch::from_statuses(&statuses))
            }
            EntityKind::Account => {
                let accounts: Vec<AccountResponse> = response.json()?;
                (account_refs(&accounts), ImportBatch::from_accounts(&accounts))
            }
        };

        let next = match collection.paging {
            Paging::Link => response.next().map(Url::to_string),
            Paging::Offset => {
                let total = match phase {
                    Phase::Fetch => items.len(),
                    Phase::Expand => loaded + items.len(),
                };
                offset_next(&response, items.len(), collection.page_size, total)
            }
        };

        Ok(Page { items, batch, next })
    }
}

/// Next URL for offset paging: same URL with `offset` moved past what is
/// loaded, or `None` once a page comes back short.
fn offset_next(response: &ApiResponse, page_len: usize, page_size: u32, total: usize) -> Option<String> {
    if page_len < page_size as usize {
        return None;
    }

    let mut url = response.url().clone();
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(name, _)| name != "offset" && name != "limit")
        .map(|(name, value)| (name.into_owned(), value.into_owned()))
        .collect();

    url.query_pairs_mut()
        .clear()
        .extend_pairs(kept)
        .append_pair("offset", &total.to_string())
        .append_pair("limit", &page_size.to_string());

    Some(url.to_string())
}
