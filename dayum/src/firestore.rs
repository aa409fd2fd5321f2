//! Firestore REST backend for the document store contract: one-shot queries, polled
//! live queries and document creation.
//!
//! # Firestore Integration (CLI <-> Core)
//!
//! This module wires the [`DocumentStore`] and [`DocumentWriter`] traits from
//! `dayum-core::contract` to the Firestore REST API.
//!
//! - Reads go through `documents:runQuery` with a `structuredQuery` built from a core [`Query`].
//! - Live queries re-run the same request every `poll_interval_ms` and emit a snapshot only
//!   when the result differs from the previous one. The first error ends the subscription.
//! - Seeding uses `createDocument` and lets Firestore assign the id.
//! - Documents travel as Firestore typed values (`stringValue`, `integerValue`, ...) and are
//!   flattened into plain JSON [`Fields`] at this boundary.
//!
//! Construct the client with [`FirestoreClient::new_from_env`]; the API key comes from
//! `FIREBASE_API_KEY`.

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use dayum_core::contract::{
    Direction, DocumentStore, DocumentWriter, Fields, Filter, Query, Record, Snapshot, StoreError,
    Subscription,
};
use serde_json::{json, Map, Value};

use crate::load_config::StoreSection;

#[derive(Clone)]
pub struct FirestoreClient {
    http: reqwest::Client,
    documents_url: String,
    api_key: Option<String>,
    poll_interval: Duration,
}

impl FirestoreClient {
    pub fn new_from_env(store: &StoreSection) -> Result<Self> {
        dotenvy::dotenv().ok(); // loads environment variables from .env if present
        let mut store = store.clone();
        if store.api_key.is_none() {
            store.api_key = std::env::var(crate::load_config::API_KEY_ENV).ok();
        }
        Self::new(&store)
    }

    pub fn new(store: &StoreSection) -> Result<Self> {
        if store.project_id.trim().is_empty() {
            tracing::error!("Firestore project id missing from config and environment");
            anyhow::bail!(
                "No Firestore project id: set store.project_id or {}",
                crate::load_config::PROJECT_ID_ENV
            );
        }
        let documents_url = format!(
            "{}/projects/{}/databases/{}/documents",
            store.base_url.trim_end_matches('/'),
            store.project_id,
            store.database
        );
        tracing::info!(
            api_key_set = store.api_key.is_some(),
            project_id = %store.project_id,
            poll_interval_ms = store.poll_interval_ms,
            "Initialized FirestoreClient"
        );
        Ok(Self {
            http: reqwest::Client::new(),
            documents_url,
            api_key: store.api_key.clone(),
            poll_interval: Duration::from_millis(store.poll_interval_ms.max(1)),
        })
    }

    fn with_key(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => request.query(&[("key", key)]),
            None => request,
        }
    }

    async fn run_query(&self, query: &Query) -> Result<Snapshot, StoreError> {
        let url = format!("{}:runQuery", self.documents_url);
        let body = json!({ "structuredQuery": structured_query(query) });
        tracing::debug!(collection = %query.collection, "[FIRESTORE] runQuery");

        let response = self
            .with_key(self.http.post(&url).json(&body))
            .send()
            .await
            .map_err(|e| StoreError::Transport(e.to_string()))?;
        let payload = read_json(response).await?;
        decode_run_query(&payload)
    }
}

async fn read_json(response: reqwest::Response) -> Result<Value, StoreError> {
    let status = response.status();
    if !status.is_success() {
        let message = response.text().await.unwrap_or_default();
        tracing::error!(status = status.as_u16(), message = %message, "[FIRESTORE] Request failed");
        return Err(StoreError::Status {
            status: status.as_u16(),
            message,
        });
    }
    response
        .json::<Value>()
        .await
        .map_err(|e| StoreError::Decode(e.to_string()))
}

/// Builds the `structuredQuery` object for a core query.
pub fn structured_query(query: &Query) -> Value {
    let mut structured = Map::new();
    structured.insert(
        "from".to_string(),
        json!([{ "collectionId": query.collection }]),
    );

    let mut filters: Vec<Value> = query.filters.iter().map(field_filter).collect();
    match filters.len() {
        0 => {}
        1 => {
            structured.insert("where".to_string(), filters.remove(0));
        }
        _ => {
            structured.insert(
                "where".to_string(),
                json!({ "compositeFilter": { "op": "AND", "filters": filters } }),
            );
        }
    }

    if let Some(order) = &query.order_by {
        let direction = match order.direction {
            Direction::Ascending => "ASCENDING",
            Direction::Descending => "DESCENDING",
        };
        structured.insert(
            "orderBy".to_string(),
            json!([{ "field": { "fieldPath": order.field }, "direction": direction }]),
        );
    }

    if let Some(limit) = query.limit {
        structured.insert("limit".to_string(), json!(limit));
    }
    Value::Object(structured)
}

fn field_filter(filter: &Filter) -> Value {
    json!({
        "fieldFilter": {
            "field": { "fieldPath": filter.field },
            "op": "EQUAL",
            "value": to_firestore_value(&filter.value),
        }
    })
}

/// Converts a runQuery response (an array of `{document?, readTime}` entries) into records.
pub fn decode_run_query(payload: &Value) -> Result<Snapshot, StoreError> {
    let entries = payload
        .as_array()
        .ok_or_else(|| StoreError::Decode("runQuery response is not an array".to_string()))?;
    entries
        .iter()
        .filter_map(|entry| entry.get("document"))
        .map(decode_document)
        .collect()
}

fn decode_document(document: &Value) -> Result<Record, StoreError> {
    let name = document
        .get("name")
        .and_then(Value::as_str)
        .ok_or_else(|| StoreError::Decode("document without a name".to_string()))?;
    let id = name.rsplit('/').next().unwrap_or(name).to_string();
    let fields = match document.get("fields") {
        Some(Value::Object(fields)) => decode_fields(fields),
        _ => Fields::new(),
    };
    Ok(Record::new(id, fields))
}

fn decode_fields(fields: &Map<String, Value>) -> Fields {
    fields
        .iter()
        .map(|(key, value)| (key.clone(), from_firestore_value(value)))
        .collect()
}

/// Flattens one Firestore typed value into plain JSON. Unknown shapes become `null`.
pub fn from_firestore_value(value: &Value) -> Value {
    let Some((kind, inner)) = value.as_object().and_then(|o| o.iter().next()) else {
        return Value::Null;
    };
    match kind.as_str() {
        "stringValue" | "timestampValue" | "referenceValue" | "bytesValue" | "booleanValue"
        | "doubleValue" => inner.clone(),
        // Firestore sends 64-bit integers as strings.
        "integerValue" => match inner {
            Value::String(s) => s.parse::<i64>().map(Value::from).unwrap_or(Value::Null),
            other => other.clone(),
        },
        "mapValue" => match inner.get("fields") {
            Some(Value::Object(fields)) => Value::Object(decode_fields(fields)),
            _ => Value::Object(Map::new()),
        },
        "arrayValue" => Value::Array(
            inner
                .get("values")
                .and_then(Value::as_array)
                .map(|values| values.iter().map(from_firestore_value).collect())
                .unwrap_or_default(),
        ),
        _ => Value::Null,
    }
}

pub fn to_firestore_value(value: &Value) -> Value {
    match value {
        Value::Null => json!({ "nullValue": null }),
        Value::Bool(b) => json!({ "booleanValue": b }),
        Value::Number(n) => match n.as_i64() {
            Some(i) => json!({ "integerValue": i.to_string() }),
            None => json!({ "doubleValue": n.as_f64() }),
        },
        Value::String(s) => json!({ "stringValue": s }),
        Value::Array(values) => json!({
            "arrayValue": { "values": values.iter().map(to_firestore_value).collect::<Vec<_>>() }
        }),
        Value::Object(fields) => json!({ "mapValue": { "fields": encode_fields(fields) } }),
    }
}

fn encode_fields(fields: &Fields) -> Map<String, Value> {
    fields
        .iter()
        .map(|(key, value)| (key.clone(), to_firestore_value(value)))
        .collect()
}

#[async_trait]
impl DocumentStore for FirestoreClient {
    fn subscribe(&self, query: Query) -> Result<Subscription, StoreError> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| StoreError::Transport(format!("no async runtime: {e}")))?;
        let (tx, subscription) = Subscription::channel();
        let client = self.clone();
        tracing::info!(
            collection = %query.collection,
            interval = ?self.poll_interval,
            "[FIRESTORE] Polling live query"
        );

        let handle = runtime.spawn(async move {
            let mut last: Option<Snapshot> = None;
            loop {
                match client.run_query(&query).await {
                    Ok(snapshot) => {
                        if last.as_ref() != Some(&snapshot) {
                            if !tx.send(snapshot.clone()) {
                                break;
                            }
                            last = Some(snapshot);
                        }
                    }
                    Err(e) => {
                        tracing::warn!(
                            error = %e,
                            "[FIRESTORE] Live query failed, ending subscription"
                        );
                        tx.fail(e);
                        break;
                    }
                }
                if tx.is_closed() {
                    break;
                }
                tokio::time::sleep(client.poll_interval).await;
            }
        });

        Ok(subscription.on_release(move || handle.abort()))
    }

    async fn query_once(&self, query: &Query) -> Result<Snapshot, StoreError> {
        self.run_query(query).await
    }
}

#[async_trait]
impl DocumentWriter for FirestoreClient {
    async fn add(&self, collection: &str, fields: Fields) -> Result<String, StoreError> {
        let url = format!("{}/{}", self.documents_url, collection);
        let body = json!({ "fields": encode_fields(&fields) });
        let response = self
            .with_key(self.http.post(&url).json(&body))
            .send()
            .await
            .map_err(|e| StoreError::Transport(e.to_string()))?;
        let created = read_json(response).await?;
        let record = decode_document(&created)?;
        tracing::info!(collection, id = %record.id, "[FIRESTORE] Document created");
        Ok(record.id)
    }
}
