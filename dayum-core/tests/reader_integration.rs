use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use dayum_core::contract::{Fields, MockDocumentStore, StoreError};
use dayum_core::memory::InMemoryStore;
use dayum_core::reader::{
    Mounted, ReaderBoundary, ReaderController, ReaderError, ReaderState, RetryAction, SlugUpdate,
};
use dayum_core::stories::{ExecutionContext, StorySync};
use dayum_core::story::COLLECTION;
use serde_json::{json, Value};

fn fields(value: Value) -> Fields {
    value.as_object().cloned().expect("object literal")
}

fn store_with(stories: &[(&str, Value)]) -> Arc<InMemoryStore> {
    let store = InMemoryStore::new();
    for (id, value) in stories {
        store.insert(COLLECTION, *id, fields(value.clone()));
    }
    Arc::new(store)
}

fn reader(store: Arc<InMemoryStore>) -> ReaderController<InMemoryStore> {
    ReaderController::new(StorySync::new(store, ExecutionContext::Client))
}

#[tokio::test]
async fn test_open_loads_then_renders_paragraphs() {
    let store = store_with(&[(
        "h",
        json!({
            "slug": "the-haunted-house",
            "title": "The Haunted House",
            "content": "It was dark.\n\n\nThe door creaked.\r\n\r\nNobody was there.",
        }),
    )]);
    let mut reader = reader(store);
    reader.open("the-haunted-house").expect("valid slug");
    assert!(reader.state().is_loading());

    let state = reader.next_update().await.expect("first snapshot").clone();
    let ReaderState::Ready(view) = state else {
        panic!("expected a ready story");
    };
    assert_eq!(view.title, "The Haunted House");
    assert_eq!(
        view.paragraphs,
        vec!["It was dark.", "The door creaked.", "Nobody was there."]
    );
    assert_eq!(view.placeholder, None);
}

#[tokio::test]
async fn test_missing_story_is_not_found_not_loading() {
    let mut reader = reader(store_with(&[]));
    reader.open("nothing-here").expect("valid slug");
    let state = reader.next_update().await.expect("first snapshot");
    assert_eq!(
        state,
        &ReaderState::NotFound {
            slug: "nothing-here".into()
        }
    );
}

#[tokio::test]
async fn test_untitled_story_derives_display_title() {
    let store = store_with(&[("v", json!({"slug": "virtual_art-gallery"}))]);
    let mut reader = reader(store.clone());
    reader.open("virtual_art-gallery").expect("valid slug");
    let Some(ReaderState::Ready(view)) = reader.next_update().await else {
        panic!("expected ready");
    };
    assert_eq!(view.title, "Virtual Art Gallery");
    assert!(view.placeholder.is_some());

    // Derived titles are display-only; nothing was written back.
    let fetched = StorySync::new(store, ExecutionContext::Client)
        .fetch_by_slug("virtual_art-gallery")
        .await
        .expect("read")
        .expect("found");
    assert_eq!(fetched.title, "");
}

#[tokio::test]
async fn test_changing_slug_releases_before_resubscribing() {
    let store = store_with(&[
        ("a", json!({"slug": "coding", "title": "Coding"})),
        ("b", json!({"slug": "writing", "title": "Writing"})),
    ]);
    let mut reader = reader(store.clone());

    let first = reader.open("coding").expect("valid slug");
    reader.next_update().await;
    assert_eq!(store.listener_count(), 1);

    let second = reader.open("writing").expect("valid slug");
    assert!(second > first);
    assert_eq!(store.listener_count(), 1, "only the new subscription is live");
    assert_eq!(
        reader.state(),
        &ReaderState::Loading {
            slug: "writing".into()
        },
        "no stale story from the previous slug"
    );

    // A late delivery for the old slug is discarded.
    let stale = SlugUpdate {
        generation: first,
        result: Ok(None),
    };
    assert!(!reader.apply(stale));
    assert!(reader.state().is_loading());

    let Some(ReaderState::Ready(view)) = reader.next_update().await else {
        panic!("expected ready");
    };
    assert_eq!(view.slug, "writing");

    reader.close();
    assert_eq!(store.listener_count(), 0);
}

#[tokio::test]
async fn test_switching_to_an_invalid_slug_drops_the_previous_story() {
    let store = store_with(&[("a", json!({"slug": "coding", "title": "Coding"}))]);
    let mut reader = reader(store.clone());

    let first = reader.open("coding").expect("valid slug");
    reader.next_update().await;
    assert!(matches!(reader.state(), ReaderState::Ready(_)));

    assert_eq!(
        reader.open("bad slug"),
        Err(ReaderError::InvalidSlug("bad slug".into()))
    );
    assert!(matches!(reader.state(), ReaderState::Failed(_)));
    assert_eq!(reader.slug(), None);
    assert!(!reader.is_subscribed());
    assert_eq!(store.listener_count(), 0);

    // Neither late deliveries nor later writes reach the controller.
    assert!(!reader.apply(SlugUpdate {
        generation: first,
        result: Ok(None),
    }));
    store.update(COLLECTION, "a", fields(json!({"slug": "coding", "title": "Renamed"})));
    assert!(reader.next_update().await.is_none());
    assert!(matches!(reader.state(), ReaderState::Failed(_)));
}

#[tokio::test]
async fn test_live_updates_replace_the_view() {
    let store = store_with(&[("a", json!({"slug": "coding", "title": "Coding"}))]);
    let mut reader = reader(store.clone());
    reader.open("coding").expect("valid slug");
    reader.next_update().await;

    store.update(
        COLLECTION,
        "a",
        fields(json!({"slug": "coding", "title": "Coding, revised"})),
    );
    let Some(ReaderState::Ready(view)) = reader.next_update().await else {
        panic!("expected ready");
    };
    assert_eq!(view.title, "Coding, revised");

    store.remove(COLLECTION, "a");
    assert!(matches!(
        reader.next_update().await,
        Some(ReaderState::NotFound { .. })
    ));
}

#[tokio::test]
async fn test_store_failure_becomes_error_view_with_reload() {
    let store = store_with(&[("a", json!({"slug": "coding", "title": "Coding"}))]);
    let mut reader = reader(store.clone());
    reader.open("coding").expect("valid slug");
    reader.next_update().await;

    store.fail_listeners(COLLECTION, StoreError::Transport("connection reset".into()));
    let Some(ReaderState::Failed(view)) = reader.next_update().await else {
        panic!("expected failure");
    };
    assert_eq!(view.retry, RetryAction::Reload);
    assert!(view.message.contains("connection reset"));
    assert!(!reader.is_subscribed());
    assert!(reader.next_update().await.is_none());

    reader.reload().expect("reload");
    assert!(matches!(
        reader.next_update().await,
        Some(ReaderState::Ready(_))
    ));
}

#[tokio::test]
async fn test_subscribe_failure_is_contained() {
    let mut store = MockDocumentStore::new();
    store
        .expect_subscribe()
        .returning(|_| Err(StoreError::Status {
            status: 401,
            message: "unauthenticated".into(),
        }));
    let mut reader = ReaderController::new(StorySync::new(
        Arc::new(store),
        ExecutionContext::Client,
    ));
    reader.open("coding").expect("slug is valid");
    assert!(matches!(reader.state(), ReaderState::Failed(_)));
    assert!(reader.next_update().await.is_none());
}

#[test]
fn test_invalid_slug_is_rejected_without_subscribing() {
    let store = store_with(&[]);
    let mut reader = reader(store.clone());
    assert_eq!(
        reader.open("   "),
        Err(ReaderError::InvalidSlug(String::new()))
    );
    assert!(matches!(reader.open("a/b"), Err(ReaderError::InvalidSlug(_))));
    assert_eq!(store.listener_count(), 0);
}

#[tokio::test]
async fn test_boundary_uses_fallback_and_notifies_hook() {
    let store = store_with(&[]);
    let calls = Arc::new(AtomicUsize::new(0));
    let seen = calls.clone();

    let mounted = ReaderBoundary::new()
        .with_fallback("custom fallback")
        .on_error(move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        })
        .mount(StorySync::new(store.clone(), ExecutionContext::Client), None);

    assert!(matches!(mounted, Mounted::Fallback("custom fallback")));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(store.listener_count(), 0);
}

#[tokio::test]
async fn test_boundary_defaults_to_error_view() {
    let store = store_with(&[]);
    let mounted = ReaderBoundary::<()>::new()
        .mount(StorySync::new(store.clone(), ExecutionContext::Client), Some(""));
    let Mounted::Error(view) = mounted else {
        panic!("expected built-in error view");
    };
    assert_eq!(view.retry, RetryAction::Reload);

    let mounted = ReaderBoundary::<()>::new()
        .mount(StorySync::new(store.clone(), ExecutionContext::Client), Some("coding"));
    assert!(matches!(mounted, Mounted::Reader(_)));
    assert_eq!(store.listener_count(), 1);
}
