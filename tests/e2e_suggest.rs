//! E2E tests for suggested accounts (Pleroma admin)

mod common;

use std::sync::atomic::Ordering;

use common::*;
use fedilist::error::ClientError;
use fedilist::service::DirectoryParams;
use serde_json::json;

fn ids(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| value.to_string()).collect()
}

async fn is_suggested(client: &fedilist::ClientState, id: &str) -> bool {
    client
        .store
        .account(id)
        .await
        .and_then(|account| account.pleroma)
        .map(|pleroma| pleroma.is_suggested)
        .unwrap_or(false)
}

#[tokio::test]
async fn test_suggest_sends_nicknames_of_known_accounts() {
    let instance = MockInstance::start().await;
    let client = instance.client();
    client
        .directory()
        .fetch_directory(&DirectoryParams::default())
        .await;

    client
        .suggestions()
        .suggest(&ids(&["a1", "a2", "unknown"]))
        .await
        .unwrap();

    assert!(is_suggested(&client, "a1").await);
    assert!(is_suggested(&client, "a2").await);
    assert!(!is_suggested(&client, "a3").await);

    assert_eq!(
        instance.state.hits_matching("PATCH"),
        vec!["PATCH /api/v1/pleroma/admin/users/suggest".to_string()]
    );
    assert_eq!(
        instance.state.patches.lock().unwrap().clone(),
        vec![json!({ "nicknames": ["usera1@remote.example", "usera2@remote.example"] })]
    );

    client.suggestions().unsuggest(&ids(&["a1"])).await.unwrap();
    assert!(!is_suggested(&client, "a1").await);
    assert!(is_suggested(&client, "a2").await);
    assert_eq!(
        instance.state.hits_matching("PATCH").last().map(String::as_str),
        Some("PATCH /api/v1/pleroma/admin/users/unsuggest")
    );
}

#[tokio::test]
async fn test_rejected_suggest_is_reverted() {
    let instance = MockInstance::start().await;
    let client = instance.client();
    client
        .directory()
        .fetch_directory(&DirectoryParams::default())
        .await;
    instance.state.suggest_status.store(500, Ordering::SeqCst);

    let mut events = client.store.subscribe();
    let result = client.suggestions().suggest(&ids(&["a1"])).await;

    assert!(matches!(result, Err(ClientError::Status { status: 500, .. })));
    assert!(!is_suggested(&client, "a1").await);

    let actions: Vec<String> = std::iter::from_fn(|| events.try_recv().ok())
        .map(|event| event.action_type())
        .collect();
    assert_eq!(
        actions,
        vec![
            "ACCOUNTS_SUGGESTED_CHANGE".to_string(),
            "ACCOUNTS_SUGGESTED_CHANGE".to_string(),
        ]
    );
}

#[tokio::test]
async fn test_suggest_without_token_fails_locally() {
    let instance = MockInstance::start().await;
    let client = instance.anonymous_client();

    let result = client.suggestions().suggest(&ids(&["a1"])).await;

    assert!(matches!(result, Err(ClientError::Unauthenticated)));
    assert!(instance.state.hits().is_empty());
}

#[tokio::test]
async fn test_suggest_unknown_accounts_is_noop() {
    let instance = MockInstance::start().await;
    let client = instance.client();

    client.suggestions().suggest(&ids(&["nobody"])).await.unwrap();

    assert!(instance.state.hits().is_empty());
}
