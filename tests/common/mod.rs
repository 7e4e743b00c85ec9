//! Common test utilities for E2E tests
//!
//! Spins up an in-process mock of a Mastodon/Pleroma instance on an
//! ephemeral port and builds a `ClientState` pointing at it.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicU16, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode, Uri, header},
    response::{IntoResponse, Response},
    routing::{get, patch},
};
use fedilist::{ClientState, config};
use serde_json::{Value, json};
use tokio::net::TcpListener;

pub const TEST_TOKEN: &str = "test-token";
pub const FAVOURITES_TOTAL: usize = 25;
pub const DIRECTORY_TOTAL: usize = 25;

/// Shared state of the mock instance
#[derive(Default)]
pub struct MockState {
    /// Base URL the mock listens on
    pub base: String,
    /// Every request as "METHOD /path?query"
    pub hits: Mutex<Vec<String>>,
    /// Requests that carried an `Authorization` header
    pub authorized_hits: Mutex<Vec<String>>,
    /// Origin used in the favourites `rel="next"` link instead of `base`
    pub next_origin: Mutex<Option<String>>,
    /// Bodies received by the admin suggest endpoints
    pub patches: Mutex<Vec<Value>>,
    /// Number of upcoming list requests answered with HTTP 500
    pub fail_remaining: AtomicUsize,
    /// Answer list requests with a payload that fails validation
    pub malformed: AtomicBool,
    /// Artificial latency for list requests
    pub delay_ms: AtomicU64,
    /// Status returned by the admin suggest endpoints
    pub suggest_status: AtomicU16,
}

impl MockState {
    pub fn hits(&self) -> Vec<String> {
        self.hits.lock().unwrap().clone()
    }

    pub fn hits_matching(&self, prefix: &str) -> Vec<String> {
        self.hits()
            .into_iter()
            .filter(|hit| hit.starts_with(prefix))
            .collect()
    }

    pub fn fail_next(&self, count: usize) {
        self.fail_remaining.store(count, Ordering::SeqCst);
    }

    pub fn authorized_hits(&self) -> Vec<String> {
        self.authorized_hits.lock().unwrap().clone()
    }

    /// Point the favourites `rel="next"` link at another instance
    pub fn link_next_to(&self, origin: &str) {
        *self.next_origin.lock().unwrap() = Some(origin.to_string());
    }

    fn record(&self, method: &str, uri: &Uri, headers: &HeaderMap) {
        let hit = format!("{} {}", method, uri);
        if headers.contains_key(header::AUTHORIZATION) {
            self.authorized_hits.lock().unwrap().push(hit.clone());
        }
        self.hits.lock().unwrap().push(hit);
    }

    /// Shared prelude of list endpoints: latency, failure injection
    async fn list_prelude(&self) -> Option<Response> {
        let delay = self.delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }

        let should_fail = self
            .fail_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if should_fail {
            return Some(
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "boom" })),
                )
                    .into_response(),
            );
        }

        if self.malformed.load(Ordering::SeqCst) {
            return Some(Json(json!([{ "id": "" }])).into_response());
        }

        None
    }
}

/// Test instance
pub struct MockInstance {
    pub addr: String,
    pub state: Arc<MockState>,
}

impl MockInstance {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = format!("http://{}", listener.local_addr().unwrap());

        let state = Arc::new(MockState {
            base: addr.clone(),
            suggest_status: AtomicU16::new(200),
            ..MockState::default()
        });

        let app = Router::new()
            .route("/api/v1/favourites", get(favourites))
            .route("/api/v1/pleroma/accounts/:id/favourites", get(account_favourites))
            .route("/api/v1/directory", get(directory))
            .route("/api/v1/accounts/relationships", get(relationships))
            .route("/api/v1/pleroma/admin/users/suggest", patch(suggest))
            .route("/api/v1/pleroma/admin/users/unsuggest", patch(suggest))
            .with_state(state.clone());

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { addr, state }
    }

    /// Client authenticated with `TEST_TOKEN`
    pub fn client(&self) -> ClientState {
        ClientState::new(test_config(&self.addr, Some(TEST_TOKEN))).unwrap()
    }

    pub fn anonymous_client(&self) -> ClientState {
        ClientState::new(test_config(&self.addr, None)).unwrap()
    }
}

pub fn test_config(base_url: &str, token: Option<&str>) -> config::ClientConfig {
    config::ClientConfig {
        instance: config::InstanceConfig {
            base_url: base_url.to_string(),
            access_token: token.map(str::to_string),
        },
        http: config::HttpConfig {
            timeout_seconds: 10,
            user_agent: "fedilist-tests".to_string(),
        },
        pagination: config::PaginationConfig {
            favourites_limit: 20,
            directory_limit: 20,
        },
        events: config::EventsConfig {
            channel_capacity: 64,
        },
        logging: config::LoggingConfig {
            level: "debug".to_string(),
            format: "pretty".to_string(),
        },
    }
}

pub fn account_json(id: &str) -> Value {
    json!({
        "id": id,
        "username": format!("user{}", id),
        "acct": format!("user{}@remote.example", id),
        "display_name": format!("User {}", id),
        "url": format!("https://remote.example/@user{}", id),
        "pleroma": { "is_admin": false, "is_suggested": false }
    })
}

pub fn status_json(id: &str, account_id: &str) -> Value {
    json!({
        "id": id,
        "created_at": "2024-05-01T12:00:00Z",
        "visibility": "public",
        "uri": format!("https://remote.example/statuses/{}", id),
        "content": format!("<p>status {}</p>", id),
        "favourited": true,
        "account": account_json(account_id)
    })
}

fn authorized(headers: &HeaderMap) -> bool {
    let expected = format!("Bearer {}", TEST_TOKEN);
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        == Some(expected.as_str())
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "error": "The access token is invalid" })),
    )
        .into_response()
}

/// GET /api/v1/favourites
///
/// First page holds 20 statuses and links to `?max_id=100`; that page holds
/// the remaining 5 and no link.
async fn favourites(
    State(state): State<Arc<MockState>>,
    uri: Uri,
    headers: HeaderMap,
    Query(params): Query<Vec<(String, String)>>,
) -> Response {
    state.record("GET", &uri, &headers);
    if !authorized(&headers) {
        return unauthorized();
    }
    if let Some(response) = state.list_prelude().await {
        return response;
    }

    let ids: Vec<usize> = (1..=FAVOURITES_TOTAL).rev().collect();
    let is_second_page = params.iter().any(|(k, v)| k == "max_id" && v == "100");

    if is_second_page {
        let page: Vec<Value> = ids[20..]
            .iter()
            .map(|id| status_json(&format!("s{}", id), "a1"))
            .collect();
        Json(page).into_response()
    } else {
        let page: Vec<Value> = ids[..20]
            .iter()
            .map(|id| status_json(&format!("s{}", id), "a1"))
            .collect();
        let next_origin = state
            .next_origin
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| state.base.clone());
        let link = format!(
            "<{}/api/v1/favourites?max_id=100>; rel=\"next\", <{}/api/v1/favourites?min_id=200>; rel=\"prev\"",
            next_origin, state.base
        );
        ([(header::LINK, link)], Json(page)).into_response()
    }
}

/// GET /api/v1/pleroma/accounts/:id/favourites
async fn account_favourites(
    State(state): State<Arc<MockState>>,
    Path(account_id): Path<String>,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    state.record("GET", &uri, &headers);
    if !authorized(&headers) {
        return unauthorized();
    }
    if let Some(response) = state.list_prelude().await {
        return response;
    }

    let page = vec![
        status_json(&format!("{}-fav1", account_id), "a2"),
        status_json(&format!("{}-fav2", account_id), "a3"),
    ];
    Json(page).into_response()
}

/// GET /api/v1/directory (offset paginated, public)
async fn directory(
    State(state): State<Arc<MockState>>,
    uri: Uri,
    headers: HeaderMap,
    Query(params): Query<Vec<(String, String)>>,
) -> Response {
    state.record("GET", &uri, &headers);
    if let Some(response) = state.list_prelude().await {
        return response;
    }

    let param = |name: &str| {
        params
            .iter()
            .find(|(k, _)| k == name)
            .and_then(|(_, v)| v.parse::<usize>().ok())
    };
    let offset = param("offset").unwrap_or(0);
    let limit = param("limit").unwrap_or(40);

    let page: Vec<Value> = (1..=DIRECTORY_TOTAL)
        .skip(offset)
        .take(limit)
        .map(|n| account_json(&format!("a{}", n)))
        .collect();
    Json(page).into_response()
}

/// GET /api/v1/accounts/relationships?id[]=..
async fn relationships(
    State(state): State<Arc<MockState>>,
    uri: Uri,
    headers: HeaderMap,
    Query(params): Query<Vec<(String, String)>>,
) -> Response {
    state.record("GET", &uri, &headers);
    if !authorized(&headers) {
        return unauthorized();
    }

    let relationships: Vec<Value> = params
        .iter()
        .filter(|(k, _)| k == "id[]")
        .map(|(_, id)| json!({ "id": id, "following": true }))
        .collect();
    Json(relationships).into_response()
}

/// PATCH /api/v1/pleroma/admin/users/{suggest,unsuggest}
async fn suggest(
    State(state): State<Arc<MockState>>,
    uri: Uri,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    state.record("PATCH", &uri, &headers);
    if !authorized(&headers) {
        return unauthorized();
    }
    state.patches.lock().unwrap().push(body);

    let status = StatusCode::from_u16(state.suggest_status.load(Ordering::SeqCst))
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, "").into_response()
}
