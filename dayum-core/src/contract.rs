//! # contract: Universal interface to the remote document store
//!
//! This module defines the traits ([`DocumentStore`], [`DocumentWriter`]) and the
//! plain data types used to read from a hosted document collection (the
//! `"stories"` collection in production), either once or as a live subscription.
//!
//! ## Interface & Extensibility
//! - Implement [`DocumentStore`] to plug in a new backend (Firestore REST, in-memory, etc).
//! - Reads are expressed as a [`Query`]: one collection, equality filters, an optional
//!   ordering and an optional result limit.
//! - A live read returns a [`Subscription`]: an ordered stream of full snapshots with an
//!   explicit teardown. Dropping the subscription releases it as well.
//! - Errors are reported as [`StoreError`]. Implementations never retry on their own.
//!
//! ## Mocking & Testing
//! - Both traits are annotated for `mockall` so consumers can generate deterministic mocks.
//! - [`Subscription::channel`] hands out the producing half so tests can drive snapshots by hand.

use std::cmp::Ordering;
use std::pin::Pin;
use std::task::{Context, Poll};

use async_trait::async_trait;
use futures::Stream;
use mockall::automock;
use serde_json::{Map, Value};
use tokio::sync::mpsc;

/// Raw document fields as delivered by the store, before any validation.
pub type Fields = Map<String, Value>;

/// One document from a query result.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    /// Opaque identifier assigned by the store.
    pub id: String,
    pub fields: Fields,
}

impl Record {
    pub fn new(id: impl Into<String>, fields: Fields) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.fields.get(field).and_then(Value::as_str)
    }
}

/// A full result set. Every notification carries the whole list, never a diff.
pub type Snapshot = Vec<Record>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    pub field: String,
    pub direction: Direction,
}

/// Equality predicate on a single field.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub field: String,
    pub value: Value,
}

impl Filter {
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub collection: String,
    pub filters: Vec<Filter>,
    pub order_by: Option<OrderBy>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn collection(name: impl Into<String>) -> Self {
        Self {
            collection: name.into(),
            filters: Vec::new(),
            order_by: None,
            limit: None,
        }
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn filters(mut self, filters: impl IntoIterator<Item = Filter>) -> Self {
        self.filters.extend(filters);
        self
    }

    pub fn order_by(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.order_by = Some(OrderBy {
            field: field.into(),
            direction,
        });
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Whether a record satisfies every equality filter.
    pub fn matches(&self, record: &Record) -> bool {
        self.filters
            .iter()
            .all(|f| record.get(&f.field) == Some(&f.value))
    }

    /// Evaluates the query over an in-process document list.
    ///
    /// Ordering by a field excludes documents that lack the field, which is the
    /// behaviour of the hosted store as well.
    pub fn apply<'a, I>(&self, records: I) -> Snapshot
    where
        I: IntoIterator<Item = &'a Record>,
    {
        let mut out: Vec<Record> = records
            .into_iter()
            .filter(|r| self.matches(r))
            .filter(|r| match &self.order_by {
                Some(order) => r.get(&order.field).is_some_and(|v| !v.is_null()),
                None => true,
            })
            .cloned()
            .collect();

        if let Some(order) = &self.order_by {
            out.sort_by(|a, b| {
                let ord = compare_values(
                    a.get(&order.field).unwrap_or(&Value::Null),
                    b.get(&order.field).unwrap_or(&Value::Null),
                );
                match order.direction {
                    Direction::Ascending => ord,
                    Direction::Descending => ord.reverse(),
                }
            });
        }

        if let Some(limit) = self.limit {
            out.truncate(limit);
        }
        out
    }
}

/// Total order over JSON values: null < bool < number < string < array < object.
/// Values of the same kind compare naturally; arrays and objects compare as equal.
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    fn rank(v: &Value) -> u8 {
        match v {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Number(_) => 2,
            Value::String(_) => 3,
            Value::Array(_) => 4,
            Value::Object(_) => 5,
        }
    }
    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => {
            let x = x.as_f64().unwrap_or(f64::NAN);
            let y = y.as_f64().unwrap_or(f64::NAN);
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StoreError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("store returned status {status}: {message}")]
    Status { status: u16, message: String },
    #[error("failed to decode store response: {0}")]
    Decode(String),
    #[error("subscription closed")]
    Closed,
}

type SnapshotResult = Result<Snapshot, StoreError>;
type Teardown = Box<dyn FnOnce() + Send + 'static>;

/// Producing half of a [`Subscription`].
#[derive(Debug, Clone)]
pub struct SnapshotSender {
    tx: mpsc::UnboundedSender<SnapshotResult>,
}

impl SnapshotSender {
    /// Delivers a snapshot. Returns `false` once the subscription has been released.
    pub fn send(&self, snapshot: Snapshot) -> bool {
        self.tx.send(Ok(snapshot)).is_ok()
    }

    /// Delivers a terminal error. Returns `false` once the subscription has been released.
    pub fn fail(&self, error: StoreError) -> bool {
        self.tx.send(Err(error)).is_ok()
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// A live query. Snapshots arrive in the store's commit order.
///
/// The subscription is released exactly once: on [`Subscription::unsubscribe`], on drop,
/// or after the stream yields an error.
pub struct Subscription {
    rx: mpsc::UnboundedReceiver<SnapshotResult>,
    teardown: Option<Teardown>,
    failed: bool,
}

impl Subscription {
    pub fn channel() -> (SnapshotSender, Subscription) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            SnapshotSender { tx },
            Subscription {
                rx,
                teardown: None,
                failed: false,
            },
        )
    }

    /// Attaches the backend-specific release action (listener removal, task abort, ...).
    pub fn on_release<F>(mut self, teardown: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        self.teardown = Some(Box::new(teardown));
        self
    }

    /// Waits for the next snapshot. `None` means the subscription has ended.
    pub async fn next(&mut self) -> Option<SnapshotResult> {
        if self.failed {
            return None;
        }
        let item = self.rx.recv().await;
        self.observe(&item);
        item
    }

    pub fn unsubscribe(mut self) {
        self.release();
    }

    fn observe(&mut self, item: &Option<SnapshotResult>) {
        if let Some(Err(_)) = item {
            self.failed = true;
            self.release();
        }
    }

    fn release(&mut self) {
        self.rx.close();
        if let Some(teardown) = self.teardown.take() {
            teardown();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("released", &self.teardown.is_none())
            .field("failed", &self.failed)
            .finish()
    }
}

impl Stream for Subscription {
    type Item = SnapshotResult;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.failed {
            return Poll::Ready(None);
        }
        let polled = self.rx.poll_recv(cx);
        if let Poll::Ready(item) = &polled {
            self.observe(item);
        }
        polled
    }
}

/// Read access to a remote document collection.
///
/// The trait is `Send + Sync` and meant to be held behind an `Arc` and injected into
/// the services that need it; there is no process-wide client.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Opens a live subscription. The first snapshot is delivered asynchronously.
    fn subscribe(&self, query: Query) -> Result<Subscription, StoreError>;

    /// Runs the query once.
    async fn query_once(&self, query: &Query) -> Result<Snapshot, StoreError>;
}

/// Write access, used only by offline seeding tools.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait DocumentWriter: Send + Sync {
    /// Inserts a new document and returns its store-assigned id.
    async fn add(&self, collection: &str, fields: Fields) -> Result<String, StoreError>;
}
