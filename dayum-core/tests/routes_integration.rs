use std::sync::Arc;

use dayum_core::config::RouteConfig;
use dayum_core::contract::{Fields, MockDocumentStore, StoreError};
use dayum_core::memory::InMemoryStore;
use dayum_core::routes::static_params;
use dayum_core::stories::{ExecutionContext, StorySync};
use dayum_core::story::COLLECTION;
use serde_json::json;

fn fields(value: serde_json::Value) -> Fields {
    value.as_object().cloned().expect("object literal")
}

#[tokio::test]
async fn test_export_mode_uses_predeclared_slugs_without_store_access() {
    let mut store = MockDocumentStore::new();
    store.expect_query_once().times(0);
    store.expect_subscribe().times(0);
    let sync = StorySync::new(Arc::new(store), ExecutionContext::Client);

    let config = RouteConfig {
        export_mode: true,
        ..RouteConfig::default()
    };
    assert_eq!(
        static_params(&sync, &config).await,
        vec!["coding", "writing", "virtual-art"]
    );
}

#[tokio::test]
async fn test_prefetch_returns_newest_valid_slugs() {
    let store = InMemoryStore::new();
    store.insert(COLLECTION, "1", fields(json!({"slug": "old", "createdAt": 1})));
    store.insert(COLLECTION, "2", fields(json!({"slug": "new", "createdAt": 2})));
    store.insert(COLLECTION, "3", fields(json!({"slug": "bad slug", "createdAt": 3})));
    let sync = StorySync::new(Arc::new(store), ExecutionContext::Client);

    let config = RouteConfig {
        prefetch_limit: 2,
        ..RouteConfig::default()
    };
    assert_eq!(static_params(&sync, &config).await, vec!["new"]);
}

#[tokio::test]
async fn test_prefetch_failure_falls_back() {
    let mut store = MockDocumentStore::new();
    store
        .expect_query_once()
        .times(1)
        .returning(|_| Err(StoreError::Transport("dns failure".into())));
    let sync = StorySync::new(Arc::new(store), ExecutionContext::Client);

    assert_eq!(
        static_params(&sync, &RouteConfig::default()).await,
        vec!["coding"]
    );
}

#[tokio::test]
async fn test_static_build_context_yields_no_prefetched_routes() {
    let mut store = MockDocumentStore::new();
    store.expect_query_once().times(0);
    let sync = StorySync::new(Arc::new(store), ExecutionContext::StaticBuild);

    assert!(static_params(&sync, &RouteConfig::default()).await.is_empty());
}
