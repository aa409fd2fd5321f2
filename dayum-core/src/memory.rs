//! In-process document store with realtime push.
//!
//! Every write re-evaluates the queries of all live listeners on the touched
//! collection and pushes a full snapshot to each of them, in commit order. Used by the
//! test suite, by the CLI's `--memory` mode, and anywhere a hosted store is unavailable.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use async_trait::async_trait;
use tracing::{debug, info};

use crate::contract::{
    DocumentStore, DocumentWriter, Fields, Query, Record, Snapshot, SnapshotSender, StoreError,
    Subscription,
};

#[derive(Default)]
struct Inner {
    collections: HashMap<String, Vec<Record>>,
    listeners: BTreeMap<u64, Listener>,
    next_listener_id: u64,
    reads: usize,
}

struct Listener {
    query: Query,
    tx: SnapshotSender,
}

#[derive(Clone, Default)]
pub struct InMemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        lock_inner(&self.inner)
    }

    /// Inserts a document under an explicit id and notifies listeners.
    pub fn insert(&self, collection: &str, id: impl Into<String>, fields: Fields) -> String {
        let id = id.into();
        let mut inner = self.lock();
        inner
            .collections
            .entry(collection.to_string())
            .or_default()
            .push(Record::new(id.clone(), fields));
        debug!(collection, id = %id, "[MEMORY] Inserted document");
        notify(&mut inner, collection);
        id
    }

    /// Replaces the fields of an existing document. Returns `false` if it does not exist.
    pub fn update(&self, collection: &str, id: &str, fields: Fields) -> bool {
        let mut inner = self.lock();
        let Some(record) = inner
            .collections
            .get_mut(collection)
            .and_then(|docs| docs.iter_mut().find(|r| r.id == id))
        else {
            return false;
        };
        record.fields = fields;
        notify(&mut inner, collection);
        true
    }

    pub fn remove(&self, collection: &str, id: &str) -> bool {
        let mut inner = self.lock();
        let removed = match inner.collections.get_mut(collection) {
            Some(docs) => {
                let before = docs.len();
                docs.retain(|r| r.id != id);
                docs.len() != before
            }
            None => false,
        };
        if removed {
            notify(&mut inner, collection);
        }
        removed
    }

    /// Terminates every live listener on `collection` with `error`, as a dropped
    /// connection would.
    pub fn fail_listeners(&self, collection: &str, error: StoreError) {
        let mut inner = self.lock();
        let ids: Vec<u64> = inner
            .listeners
            .iter()
            .filter(|(_, l)| l.query.collection == collection)
            .map(|(id, _)| *id)
            .collect();
        for id in ids {
            if let Some(listener) = inner.listeners.remove(&id) {
                listener.tx.fail(error.clone());
            }
        }
    }

    /// Number of subscriptions that have not been released yet.
    pub fn listener_count(&self) -> usize {
        self.lock().listeners.len()
    }

    /// Number of subscribe and one-shot query calls served so far.
    pub fn read_count(&self) -> usize {
        self.lock().reads
    }
}

fn lock_inner(inner: &Mutex<Inner>) -> MutexGuard<'_, Inner> {
    // A panic while holding the lock cannot leave the maps half-updated.
    inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn evaluate(inner: &Inner, query: &Query) -> Snapshot {
    match inner.collections.get(&query.collection) {
        Some(docs) => query.apply(docs),
        None => Vec::new(),
    }
}

fn notify(inner: &mut Inner, collection: &str) {
    let mut closed = Vec::new();
    for (id, listener) in inner.listeners.iter() {
        if listener.query.collection != collection {
            continue;
        }
        let snapshot = evaluate(inner, &listener.query);
        if !listener.tx.send(snapshot) {
            closed.push(*id);
        }
    }
    for id in closed {
        inner.listeners.remove(&id);
    }
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    fn subscribe(&self, query: Query) -> Result<Subscription, StoreError> {
        let (tx, subscription) = Subscription::channel();
        let mut inner = self.lock();
        inner.reads += 1;
        tx.send(evaluate(&inner, &query));

        let id = inner.next_listener_id;
        inner.next_listener_id += 1;
        info!(listener_id = id, collection = %query.collection, "[MEMORY] Listener registered");
        inner.listeners.insert(id, Listener { query, tx });
        drop(inner);

        let weak: Weak<Mutex<Inner>> = Arc::downgrade(&self.inner);
        Ok(subscription.on_release(move || {
            if let Some(inner) = weak.upgrade() {
                lock_inner(&inner).listeners.remove(&id);
                debug!(listener_id = id, "[MEMORY] Listener released");
            }
        }))
    }

    async fn query_once(&self, query: &Query) -> Result<Snapshot, StoreError> {
        let mut inner = self.lock();
        inner.reads += 1;
        Ok(evaluate(&inner, query))
    }
}

#[async_trait]
impl DocumentWriter for InMemoryStore {
    async fn add(&self, collection: &str, fields: Fields) -> Result<String, StoreError> {
        let id = uuid::Uuid::new_v4().simple().to_string();
        Ok(self.insert(collection, id, fields))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::{Direction, Filter};
    use serde_json::json;

    fn fields(value: serde_json::Value) -> Fields {
        value.as_object().cloned().expect("object fixture")
    }

    #[tokio::test]
    async fn listeners_receive_full_snapshots_in_commit_order() {
        let store = InMemoryStore::new();
        let query = Query::collection("stories").order_by("createdAt", Direction::Descending);
        let mut sub = store.subscribe(query).expect("subscribe");

        assert_eq!(sub.next().await, Some(Ok(vec![])));

        store.insert("stories", "one", fields(json!({"slug": "one", "createdAt": 1})));
        store.insert("stories", "two", fields(json!({"slug": "two", "createdAt": 2})));

        let first = sub.next().await.expect("snapshot").expect("ok");
        assert_eq!(first.len(), 1);
        let second = sub.next().await.expect("snapshot").expect("ok");
        let ids: Vec<_> = second.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["two", "one"]);
    }

    #[tokio::test]
    async fn dropping_a_subscription_removes_the_listener() {
        let store = InMemoryStore::new();
        let sub = store
            .subscribe(Query::collection("stories").filter(Filter::eq("slug", "x")))
            .expect("subscribe");
        assert_eq!(store.listener_count(), 1);
        drop(sub);
        assert_eq!(store.listener_count(), 0);
    }

    #[tokio::test]
    async fn writes_to_other_collections_are_not_pushed() {
        let store = InMemoryStore::new();
        let mut sub = store.subscribe(Query::collection("stories")).expect("subscribe");
        let _ = sub.next().await;

        store.insert("drafts", "d", fields(json!({"slug": "d"})));
        store.insert("stories", "s", fields(json!({"slug": "s"})));

        let snapshot = sub.next().await.expect("snapshot").expect("ok");
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].id, "s");
    }
}
