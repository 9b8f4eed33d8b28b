use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use anyhow::anyhow;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use futures::{stream, StreamExt};
use parking_lot::Mutex;
use rand::distr::Alphanumeric;
use rand::Rng;
use tokio::sync::broadcast;
use tokio_stream::wrappers::{errors::BroadcastStreamRecvError, BroadcastStream};
use tracing::debug;

use crate::domain::ports::{
    CollectionPath, CollectionQuery, Document, DocumentBackend, DocumentWrite, FieldValue,
    Snapshot, SnapshotStream, StoredValue,
};

const CHANGE_CAPACITY: usize = 64;
const ID_LENGTH: usize = 20;

#[derive(Debug, Clone)]
enum Change {
    Committed(CollectionPath),
    ListenerFailed {
        path: CollectionPath,
        message: String,
    },
}

#[derive(Default)]
struct Collections {
    by_path: HashMap<CollectionPath, HashMap<String, Document>>,
    revision: u64,
    last_timestamp: Option<DateTime<Utc>>,
}

impl Collections {
    /// Wall clock, bumped by a microsecond when needed so commits are strictly ordered.
    fn server_timestamp(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        let ts = match self.last_timestamp {
            Some(last) if now <= last => last + Duration::microseconds(1),
            _ => now,
        };
        self.last_timestamp = Some(ts);
        ts
    }

    fn resolve(&mut self, write: DocumentWrite) -> BTreeMap<String, StoredValue> {
        let mut commit_ts = None;
        write
            .fields
            .into_iter()
            .map(|(name, value)| {
                let stored = match value {
                    FieldValue::Text(s) => StoredValue::Text(s),
                    // one timestamp per commit, shared by every sentinel in it
                    FieldValue::ServerTimestamp => {
                        StoredValue::Timestamp(*commit_ts.get_or_insert_with(|| self.server_timestamp()))
                    }
                };
                (name, stored)
            })
            .collect()
    }

    fn snapshot(&self, query: &CollectionQuery) -> Snapshot {
        let mut documents: Vec<Document> = self
            .by_path
            .get(&query.path)
            .map(|docs| docs.values().cloned().collect())
            .unwrap_or_default();
        documents.sort_by(|a, b| {
            let ka = a.text(&query.order_by).unwrap_or("");
            let kb = b.text(&query.order_by).unwrap_or("");
            ka.cmp(kb).then_with(|| a.id.cmp(&b.id))
        });
        Snapshot {
            version: self.revision,
            documents,
        }
    }
}

/// In-process realtime document store.
///
/// Listeners receive the current snapshot first and a fresh one after every
/// commit to their collection. Ordering is byte-wise on the `order_by` text
/// field, so it is case-sensitive.
#[derive(Clone)]
pub struct MemoryDocuments {
    inner: Arc<Mutex<Collections>>,
    changes: broadcast::Sender<Change>,
    failing_writes: Arc<Mutex<Option<String>>>,
}

impl Default for MemoryDocuments {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDocuments {
    pub fn new() -> Self {
        let (changes, _rx) = broadcast::channel(CHANGE_CAPACITY);
        Self {
            inner: Arc::new(Mutex::new(Collections::default())),
            changes,
            failing_writes: Arc::new(Mutex::new(None)),
        }
    }

    /// Make the next add/update/delete fail with `message`.
    pub fn fail_next_write(&self, message: impl Into<String>) {
        *self.failing_writes.lock() = Some(message.into());
    }

    /// Deliver an error to every listener of `path`.
    pub fn fail_listeners(&self, path: &CollectionPath, message: impl Into<String>) {
        let _ = self.changes.send(Change::ListenerFailed {
            path: path.clone(),
            message: message.into(),
        });
    }

    pub fn documents(&self, path: &CollectionPath) -> Vec<Document> {
        self.inner
            .lock()
            .by_path
            .get(path)
            .map(|docs| docs.values().cloned().collect())
            .unwrap_or_default()
    }

    pub fn listener_count(&self) -> usize {
        self.changes.receiver_count()
    }

    fn take_injected_failure(&self) -> anyhow::Result<()> {
        match self.failing_writes.lock().take() {
            Some(message) => Err(anyhow!(message)),
            None => Ok(()),
        }
    }

    fn committed(&self, path: &CollectionPath) {
        // no listeners is fine
        let _ = self.changes.send(Change::Committed(path.clone()));
    }
}

fn generate_id() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(ID_LENGTH)
        .map(char::from)
        .collect()
}

#[async_trait]
impl DocumentBackend for MemoryDocuments {
    async fn add(&self, path: &CollectionPath, write: DocumentWrite) -> anyhow::Result<String> {
        self.take_injected_failure()?;
        let id = {
            let mut inner = self.inner.lock();
            let fields = inner.resolve(write);
            let id = generate_id();
            inner.revision += 1;
            inner.by_path.entry(path.clone()).or_default().insert(
                id.clone(),
                Document {
                    id: id.clone(),
                    fields,
                },
            );
            id
        };
        debug!(%path, %id, "document added");
        self.committed(path);
        Ok(id)
    }

    async fn update(
        &self,
        path: &CollectionPath,
        id: &str,
        write: DocumentWrite,
    ) -> anyhow::Result<()> {
        self.take_injected_failure()?;
        {
            let mut inner = self.inner.lock();
            let exists = inner
                .by_path
                .get(path)
                .is_some_and(|docs| docs.contains_key(id));
            if !exists {
                return Err(anyhow!("No document to update: {path}/{id}"));
            }
            let fields = inner.resolve(write);
            inner.revision += 1;
            if let Some(doc) = inner.by_path.get_mut(path).and_then(|d| d.get_mut(id)) {
                doc.fields.extend(fields);
            }
        }
        self.committed(path);
        Ok(())
    }

    async fn delete(&self, path: &CollectionPath, id: &str) -> anyhow::Result<()> {
        self.take_injected_failure()?;
        let removed = {
            let mut inner = self.inner.lock();
            let removed = inner
                .by_path
                .get_mut(path)
                .and_then(|docs| docs.remove(id))
                .is_some();
            if removed {
                inner.revision += 1;
            }
            removed
        };
        // Deleting a missing document succeeds silently.
        if removed {
            self.committed(path);
        }
        Ok(())
    }

    fn watch(&self, query: CollectionQuery) -> SnapshotStream {
        // Subscribe before reading so no commit falls between the two.
        let rx = self.changes.subscribe();
        let initial = self.inner.lock().snapshot(&query);
        let inner = Arc::clone(&self.inner);

        let updates = BroadcastStream::new(rx).filter_map(move |change| {
            let result = match change {
                Ok(Change::Committed(path)) if path == query.path => {
                    Some(Ok(inner.lock().snapshot(&query)))
                }
                Ok(Change::ListenerFailed { path, message }) if path == query.path => {
                    Some(Err(anyhow!(message)))
                }
                Ok(_) => None,
                // Missed notifications: the current state covers them.
                Err(BroadcastStreamRecvError::Lagged(_)) => Some(Ok(inner.lock().snapshot(&query))),
            };
            futures::future::ready(result)
        });

        stream::once(futures::future::ready(Ok(initial)))
            .chain(updates)
            .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path() -> CollectionPath {
        CollectionPath::from_segments(["users", "u1", "library"])
    }

    #[tokio::test]
    async fn timestamps_strictly_increase() {
        let docs = MemoryDocuments::new();
        let mut last = None;
        for i in 0..50 {
            let id = docs
                .add(
                    &path(),
                    DocumentWrite::new()
                        .text("title", format!("t{i}"))
                        .server_timestamp("createdAt")
                        .server_timestamp("updatedAt"),
                )
                .await
                .unwrap();
            let doc = docs
                .documents(&path())
                .into_iter()
                .find(|d| d.id == id)
                .unwrap();
            let created = doc.timestamp("createdAt").unwrap();
            assert_eq!(Some(created), doc.timestamp("updatedAt"));
            if let Some(prev) = last {
                assert!(created > prev);
            }
            last = Some(created);
        }
    }

    #[tokio::test]
    async fn listener_gets_initial_then_ordered_snapshots() {
        let docs = MemoryDocuments::new();
        docs.add(&path(), DocumentWrite::new().text("title", "b"))
            .await
            .unwrap();

        let mut stream = docs.watch(CollectionQuery::new(path(), "title"));
        let first = stream.next().await.unwrap().unwrap();
        assert_eq!(first.documents.len(), 1);

        docs.add(&path(), DocumentWrite::new().text("title", "B"))
            .await
            .unwrap();
        docs.add(&path(), DocumentWrite::new().text("title", "a"))
            .await
            .unwrap();

        let second = stream.next().await.unwrap().unwrap();
        let third = stream.next().await.unwrap().unwrap();
        assert!(second.version > first.version);
        assert!(third.version >= second.version);
        let titles: Vec<_> = third
            .documents
            .iter()
            .map(|d| d.text("title").unwrap().to_string())
            .collect();
        assert_eq!(titles, vec!["B", "a", "b"]);
    }

    #[tokio::test]
    async fn other_collections_do_not_notify() {
        let docs = MemoryDocuments::new();
        let mut stream = docs.watch(CollectionQuery::new(path(), "title"));
        stream.next().await.unwrap().unwrap();

        let other = CollectionPath::from_segments(["users", "u2", "library"]);
        docs.add(&other, DocumentWrite::new().text("title", "x"))
            .await
            .unwrap();
        docs.add(&path(), DocumentWrite::new().text("title", "mine"))
            .await
            .unwrap();

        let next = stream.next().await.unwrap().unwrap();
        assert_eq!(next.documents.len(), 1);
        assert_eq!(next.documents[0].text("title"), Some("mine"));
    }

    #[tokio::test]
    async fn update_of_missing_document_fails_and_delete_is_silent() {
        let docs = MemoryDocuments::new();
        let err = docs
            .update(&path(), "nope", DocumentWrite::new().text("title", "x"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("No document to update"));
        assert!(docs.delete(&path(), "nope").await.is_ok());
    }

    #[tokio::test]
    async fn update_merges_fields() {
        let docs = MemoryDocuments::new();
        let id = docs
            .add(
                &path(),
                DocumentWrite::new()
                    .text("title", "t")
                    .text("storyImageUrl", "http://img"),
            )
            .await
            .unwrap();
        docs.update(&path(), &id, DocumentWrite::new().text("title", "t2"))
            .await
            .unwrap();

        let doc = &docs.documents(&path())[0];
        assert_eq!(doc.text("title"), Some("t2"));
        assert_eq!(doc.text("storyImageUrl"), Some("http://img"));
    }

    #[tokio::test]
    async fn injected_failures() {
        let docs = MemoryDocuments::new();
        docs.fail_next_write("permission-denied");
        let err = docs
            .add(&path(), DocumentWrite::new().text("title", "x"))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "permission-denied");
        assert!(docs
            .add(&path(), DocumentWrite::new().text("title", "x"))
            .await
            .is_ok());

        let mut stream = docs.watch(CollectionQuery::new(path(), "title"));
        stream.next().await.unwrap().unwrap();
        docs.fail_listeners(&path(), "unavailable");
        let err = stream.next().await.unwrap().unwrap_err();
        assert_eq!(err.to_string(), "unavailable");
    }
}
