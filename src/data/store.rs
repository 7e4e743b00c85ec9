//! State container
//!
//! Holds the normalized entity tables and the per-collection cursors.
//! State is only changed by dispatching an `Event`; `StoreState::apply` is
//! the single reducer. Dispatched events are broadcast to subscribers.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use futures::Stream;
use tokio::sync::{RwLock, broadcast};
use tokio_stream::StreamExt as _;
use tokio_stream::wrappers::BroadcastStream;

use crate::data::events::{Event, Phase};
use crate::data::models::{
    AccountRecord, CollectionKey, Cursor, CursorStatus, RelationshipRecord, StatusRecord,
};

// =============================================================================
// Reducer
// =============================================================================

/// Plain state; cloneable for snapshots and tests
#[derive(Debug, Clone, Default)]
pub struct StoreState {
    pub accounts: HashMap<String, AccountRecord>,
    pub statuses: HashMap<String, StatusRecord>,
    pub relationships: HashMap<String, RelationshipRecord>,
    pub cursors: HashMap<CollectionKey, Cursor>,
}

impl StoreState {
    /// Apply one event
    pub fn apply(&mut self, event: &Event) {
        match event {
            Event::Request { key, .. } => {
                let cursor = self.cursors.entry(key.clone()).or_default();
                cursor.is_loading = true;
                cursor.status = CursorStatus::Loading;
            }
            Event::Success {
                key,
                phase,
                items,
                next,
            } => {
                let cursor = self.cursors.entry(key.clone()).or_default();
                match phase {
                    Phase::Fetch => cursor.items = items.clone(),
                    Phase::Expand => cursor.items.extend(items.iter().cloned()),
                }
                cursor.next = next.clone();
                cursor.is_loading = false;
                cursor.status = CursorStatus::Loaded;
                cursor.last_error = None;

                use crate::metrics::CURSOR_ITEMS;
                CURSOR_ITEMS
                    .with_label_values(&[key.family()])
                    .set(cursor.items.len() as i64);
            }
            Event::Fail { key, error, .. } => {
                // Items and next stay as they were so the view keeps stale data.
                let cursor = self.cursors.entry(key.clone()).or_default();
                cursor.is_loading = false;
                cursor.status = CursorStatus::Failed;
                cursor.last_error = Some(error.to_string());
            }
            Event::Import(batch) => {
                for account in &batch.accounts {
                    self.accounts.insert(account.id.clone(), account.clone());
                }
                for status in &batch.statuses {
                    self.statuses.insert(status.id.clone(), status.clone());
                }
                for relationship in &batch.relationships {
                    self.relationships
                        .insert(relationship.id.clone(), relationship.clone());
                }

                use crate::metrics::ENTITIES_IMPORTED_TOTAL;
                ENTITIES_IMPORTED_TOTAL
                    .with_label_values(&["account"])
                    .inc_by(batch.accounts.len() as u64);
                ENTITIES_IMPORTED_TOTAL
                    .with_label_values(&["status"])
                    .inc_by(batch.statuses.len() as u64);
                ENTITIES_IMPORTED_TOTAL
                    .with_label_values(&["relationship"])
                    .inc_by(batch.relationships.len() as u64);
            }
            Event::SuggestedChanged {
                account_ids,
                suggested,
            } => {
                for id in account_ids {
                    if let Some(pleroma) = self
                        .accounts
                        .get_mut(id)
                        .and_then(|account| account.pleroma.as_mut())
                    {
                        pleroma.is_suggested = *suggested;
                    }
                }
            }
        }
    }
}

// =============================================================================
// Begin (guarded request)
// =============================================================================

/// Why an operation did not start
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Collection needs an access token and none is configured
    Unauthenticated,
    /// A request for the same key is outstanding
    AlreadyLoading,
    /// Expand requested before any fetch
    NotFetched,
    /// Expand requested but `next` is empty
    Exhausted,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::Unauthenticated => "unauthenticated",
            SkipReason::AlreadyLoading => "already_loading",
            SkipReason::NotFetched => "not_fetched",
            SkipReason::Exhausted => "exhausted",
        }
    }
}

/// Result of `Store::begin`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Begin {
    /// `Request` was dispatched; the caller owns the in-flight slot
    Started {
        /// Items already held by the cursor
        loaded: usize,
        /// Stored `next` URL (always set for expand)
        next: Option<String>,
    },
    Skipped(SkipReason),
}

// =============================================================================
// Loading indicator
// =============================================================================

/// Counter behind the global loading indicator
#[derive(Debug, Default)]
pub struct LoadingIndicator {
    pending: AtomicUsize,
}

impl LoadingIndicator {
    /// Count one request until the returned guard is dropped
    pub fn start(self: &Arc<Self>) -> LoadingGuard {
        let pending = self.pending.fetch_add(1, Ordering::SeqCst) + 1;
        crate::metrics::PENDING_REQUESTS.set(pending as i64);
        LoadingGuard {
            indicator: Arc::clone(self),
        }
    }

    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }
}

/// Keeps one request on the loading indicator
#[derive(Debug)]
pub struct LoadingGuard {
    indicator: Arc<LoadingIndicator>,
}

impl Drop for LoadingGuard {
    fn drop(&mut self) {
        let pending = self.indicator.pending.fetch_sub(1, Ordering::SeqCst) - 1;
        crate::metrics::PENDING_REQUESTS.set(pending as i64);
    }
}

// =============================================================================
// Store
// =============================================================================

/// Shared state container
///
/// Thread-safe; cloned handles are passed around as `Arc<Store>`.
pub struct Store {
    state: RwLock<StoreState>,
    events: broadcast::Sender<Event>,
    loading: Arc<LoadingIndicator>,
}

impl Store {
    /// Create an empty store
    ///
    /// # Arguments
    /// * `channel_capacity` - Events buffered per subscriber before it lags
    pub fn new(channel_capacity: usize) -> Self {
        let (events, _) = broadcast::channel(channel_capacity.max(1));
        Self {
            state: RwLock::new(StoreState::default()),
            events,
            loading: Arc::new(LoadingIndicator::default()),
        }
    }

    /// Apply an event and broadcast it
    pub async fn dispatch(&self, event: Event) {
        let mut state = self.state.write().await;
        state.apply(&event);
        tracing::trace!(action = %event.action_type(), "Dispatched");
        // Sent under the lock so subscribers observe events in apply order.
        let _ = self.events.send(event);
    }

    /// Check the cursor guards and dispatch `Request` atomically
    ///
    /// A fetch only requires that no request for `key` is outstanding. An
    /// expand additionally requires an existing cursor with a `next` URL.
    pub async fn begin(&self, key: &CollectionKey, phase: Phase) -> Begin {
        let mut state = self.state.write().await;

        let (loaded, next) = match (state.cursors.get(key), phase) {
            (Some(cursor), _) if cursor.is_loading => {
                return Begin::Skipped(SkipReason::AlreadyLoading);
            }
            (None, Phase::Expand) => return Begin::Skipped(SkipReason::NotFetched),
            (Some(cursor), Phase::Expand) if cursor.next.is_none() => {
                return Begin::Skipped(SkipReason::Exhausted);
            }
            (Some(cursor), _) => (cursor.items.len(), cursor.next.clone()),
            (None, Phase::Fetch) => (0, None),
        };

        let event = Event::Request {
            key: key.clone(),
            phase,
        };
        state.apply(&event);
        let _ = self.events.send(event);

        Begin::Started { loaded, next }
    }

    /// Subscribe to dispatched events
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }

    /// Dispatched events as a stream; lagged gaps are skipped
    pub fn events(&self) -> impl Stream<Item = Event> + Send + 'static {
        BroadcastStream::new(self.events.subscribe()).filter_map(|event| match event {
            Ok(event) => Some(event),
            Err(error) => {
                tracing::warn!(%error, "Event subscriber lagged");
                None
            }
        })
    }

    pub fn loading(&self) -> &Arc<LoadingIndicator> {
        &self.loading
    }

    /// Read-only access to the whole state
    pub async fn read<R>(&self, f: impl FnOnce(&StoreState) -> R) -> R {
        let state = self.state.read().await;
        f(&state)
    }

    pub async fn snapshot(&self) -> StoreState {
        self.state.read().await.clone()
    }

    pub async fn cursor(&self, key: &CollectionKey) -> Option<Cursor> {
        self.read(|state| state.cursors.get(key).cloned()).await
    }

    pub async fn account(&self, id: &str) -> Option<AccountRecord> {
        self.read(|state| state.accounts.get(id).cloned()).await
    }

    pub async fn status(&self, id: &str) -> Option<StatusRecord> {
        self.read(|state| state.statuses.get(id).cloned()).await
    }

    pub async fn relationship(&self, id: &str) -> Option<RelationshipRecord> {
        self.read(|state| state.relationships.get(id).cloned()).await
    }

    /// Resolve a cursor's items against the account table
    ///
    /// References without a stored entity are skipped.
    pub async fn cursor_accounts(&self, key: &CollectionKey) -> Vec<AccountRecord> {
        self.read(|state| {
            state
                .cursors
                .get(key)
                .map(|cursor| {
                    cursor
                        .items
                        .iter()
                        .filter_map(|item| state.accounts.get(item.as_str()).cloned())
                        .collect()
                })
                .unwrap_or_default()
        })
        .await
    }

    /// Resolve a cursor's items against the status table
    pub async fn cursor_statuses(&self, key: &CollectionKey) -> Vec<StatusRecord> {
        self.read(|state| {
            state
                .cursors
                .get(key)
                .map(|cursor| {
                    cursor
                        .items
                        .iter()
                        .filter_map(|item| state.statuses.get(item.as_str()).cloned())
                        .collect()
                })
                .unwrap_or_default()
        })
        .await
    }
}
