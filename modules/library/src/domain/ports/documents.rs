use std::collections::BTreeMap;
use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};

/// Slash-separated path of a document collection, e.g. `users/u1/library`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CollectionPath(String);

impl CollectionPath {
    pub fn from_segments<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let joined = segments
            .into_iter()
            .map(|s| s.as_ref().trim_matches('/').to_string())
            .collect::<Vec<_>>()
            .join("/");
        Self(joined)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CollectionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Value supplied on write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldValue {
    Text(String),
    /// Replaced by the backend's clock at commit time.
    ServerTimestamp,
}

/// Value as stored and returned in snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StoredValue {
    Text(String),
    Timestamp(DateTime<Utc>),
}

/// Set of fields to write. On update only these fields change.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentWrite {
    pub fields: BTreeMap<String, FieldValue>,
}

impl DocumentWrite {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, name: &str, value: impl Into<String>) -> Self {
        self.fields
            .insert(name.to_string(), FieldValue::Text(value.into()));
        self
    }

    pub fn server_timestamp(mut self, name: &str) -> Self {
        self.fields
            .insert(name.to_string(), FieldValue::ServerTimestamp);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub id: String,
    pub fields: BTreeMap<String, StoredValue>,
}

impl Document {
    pub fn text(&self, name: &str) -> Option<&str> {
        match self.fields.get(name) {
            Some(StoredValue::Text(s)) => Some(s),
            _ => None,
        }
    }

    pub fn timestamp(&self, name: &str) -> Option<DateTime<Utc>> {
        match self.fields.get(name) {
            Some(StoredValue::Timestamp(t)) => Some(*t),
            _ => None,
        }
    }
}

/// Full listing of a queried collection at one point in time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    /// Grows with every committed change; newer snapshots carry larger versions.
    pub version: u64,
    pub documents: Vec<Document>,
}

/// Live query: every document of `path`, ascending by the text field `order_by`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionQuery {
    pub path: CollectionPath,
    pub order_by: String,
}

impl CollectionQuery {
    pub fn new(path: CollectionPath, order_by: impl Into<String>) -> Self {
        Self {
            path,
            order_by: order_by.into(),
        }
    }
}

/// Snapshots in delivery order. An `Err` item reports a delivery failure; the
/// stream ends when the backend stops listening.
pub type SnapshotStream = BoxStream<'static, anyhow::Result<Snapshot>>;

/// Real-time document collection backend.
#[async_trait]
pub trait DocumentBackend: Send + Sync {
    /// Create a document with a backend-assigned id and return that id.
    async fn add(&self, path: &CollectionPath, write: DocumentWrite) -> anyhow::Result<String>;
    /// Merge `write` into an existing document. Fails if the id is unknown.
    async fn update(
        &self,
        path: &CollectionPath,
        id: &str,
        write: DocumentWrite,
    ) -> anyhow::Result<()>;
    /// Hard delete. Deleting an unknown id is not an error for every backend.
    async fn delete(&self, path: &CollectionPath, id: &str) -> anyhow::Result<()>;
    /// Start a live query. The first item is the current state.
    fn watch(&self, query: CollectionQuery) -> SnapshotStream;
}
