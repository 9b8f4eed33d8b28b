use std::sync::Arc;

use futures::StreamExt;
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, trace, warn};

use crate::contract::model::{ItemDraft, ItemId, LibraryItem, LibraryState, SyncStatus, UserId};
use crate::domain::error::DomainError;
use crate::domain::layout::StorageLayout;
use crate::domain::mapper;
use crate::domain::ports::{AuthPort, CollectionQuery, DocumentBackend, Snapshot, SnapshotStream};
use crate::domain::subscription::Subscription;

/// Everything the watch channel carries. `session` fences listener callbacks
/// from earlier sessions; `version` is the last applied snapshot version.
#[derive(Debug, Clone)]
struct StoreState {
    view: LibraryState,
    session: u64,
    version: Option<u64>,
}

/// Live, ordered projection of the signed-in user's library plus the
/// mutations on it.
///
/// The projection is only ever replaced by a newer backend snapshot; writes do
/// not touch it locally and become visible once the backend reports them.
#[derive(Clone)]
pub struct LibraryStore {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    documents: Arc<dyn DocumentBackend>,
    auth: Arc<dyn AuthPort>,
    layout: StorageLayout,
    state: Arc<watch::Sender<StoreState>>,
    subscription: Mutex<Option<Subscription>>,
}

impl LibraryStore {
    pub fn new(
        documents: Arc<dyn DocumentBackend>,
        auth: Arc<dyn AuthPort>,
        layout: StorageLayout,
    ) -> Self {
        let state = watch::Sender::new(StoreState {
            view: LibraryState::unauthenticated(),
            session: 0,
            version: None,
        });
        Self {
            inner: Arc::new(StoreInner {
                documents,
                auth,
                layout,
                state: Arc::new(state),
                subscription: Mutex::new(None),
            }),
        }
    }

    pub fn state(&self) -> LibraryState {
        self.inner.state.borrow().view.clone()
    }

    /// Items of the latest snapshot, ordered by title. Never touches the network.
    pub fn list(&self) -> Arc<[LibraryItem]> {
        Arc::clone(&self.inner.state.borrow().view.items)
    }

    pub fn watch(&self) -> StateWatcher {
        StateWatcher {
            rx: self.inner.state.subscribe(),
        }
    }

    pub fn is_subscribed(&self) -> bool {
        self.inner
            .subscription
            .lock()
            .as_ref()
            .is_some_and(Subscription::is_active)
    }

    /// Start (or keep) the live query for `owner`.
    #[instrument(name = "library.store.activate", skip_all, fields(owner = %owner))]
    pub fn activate(&self, owner: &UserId) {
        let mut slot = self.inner.subscription.lock();
        if slot
            .as_ref()
            .is_some_and(|s| s.owner() == owner && s.is_active())
        {
            trace!("subscription already active");
            return;
        }
        if let Some(previous) = slot.take() {
            previous.unsubscribe();
        }

        let mut session = 0;
        self.inner.state.send_modify(|s| {
            s.session += 1;
            session = s.session;
            s.version = None;
            if s.view.owner.as_ref() != Some(owner) {
                s.view.items = Arc::from(Vec::new());
            }
            s.view.owner = Some(owner.clone());
            s.view.status = SyncStatus::Subscribing;
            s.view.error = None;
        });

        let query = CollectionQuery::new(
            self.inner.layout.items_of(owner),
            self.inner.layout.order_by(),
        );
        let stream = self.inner.documents.watch(query);
        let cancel = CancellationToken::new();
        let task = tokio::spawn(pump(
            stream,
            Arc::clone(&self.inner.state),
            session,
            cancel.clone(),
        ));
        *slot = Some(Subscription::new(owner.clone(), cancel, task));
        info!(session, "subscribed to library collection");
    }

    /// Drop the live query and clear the projection. Once this returns no
    /// snapshot of the released session can change the state.
    #[instrument(name = "library.store.deactivate", skip(self))]
    pub fn deactivate(&self) {
        let mut slot = self.inner.subscription.lock();
        if let Some(subscription) = slot.take() {
            subscription.unsubscribe();
        }
        self.inner.state.send_modify(|s| {
            s.session += 1;
            s.version = None;
            s.view = LibraryState::unauthenticated();
        });
        debug!("library projection cleared");
    }

    /// Follow the auth collaborator: sign-in activates, sign-out deactivates.
    pub fn follow_auth(&self) -> SessionBinding {
        let mut identities = self.inner.auth.watch();
        let store = self.clone();
        let cancel = CancellationToken::new();
        let token = cancel.clone();

        let task = tokio::spawn(async move {
            loop {
                let identity = identities.borrow_and_update().clone();
                match identity {
                    Some(user) => store.activate(&user.uid),
                    None => store.deactivate(),
                }
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    changed = identities.changed() => {
                        if changed.is_err() {
                            debug!("auth identity stream closed");
                            break;
                        }
                    }
                }
            }
        });

        SessionBinding { cancel, task }
    }

    #[instrument(name = "library.store.add", skip(self, draft), fields(title = %draft.title))]
    pub async fn add(&self, draft: &ItemDraft) -> Result<ItemId, DomainError> {
        let owner = self.require_user()?;
        let path = self.inner.layout.items_of(&owner);

        let id = self
            .inner
            .documents
            .add(&path, mapper::creation_write(draft))
            .await
            .map_err(|e| mutation_error("adding", e, "Failed to add library item"))?;

        info!(item_id = %id, "library item added");
        Ok(ItemId::new(id))
    }

    #[instrument(name = "library.store.update", skip(self, draft), fields(item_id = %id))]
    pub async fn update(&self, id: &ItemId, draft: &ItemDraft) -> Result<(), DomainError> {
        let owner = self.require_user()?;
        let path = self.inner.layout.items_of(&owner);

        self.inner
            .documents
            .update(&path, id.as_str(), mapper::update_write(draft))
            .await
            .map_err(|e| mutation_error("updating", e, "Failed to update library item"))?;

        info!("library item updated");
        Ok(())
    }

    #[instrument(name = "library.store.delete", skip(self), fields(item_id = %id))]
    pub async fn delete(&self, id: &ItemId) -> Result<(), DomainError> {
        let owner = self.require_user()?;
        let path = self.inner.layout.items_of(&owner);

        self.inner
            .documents
            .delete(&path, id.as_str())
            .await
            .map_err(|e| mutation_error("deleting", e, "Failed to delete library item"))?;

        info!("library item deleted");
        Ok(())
    }

    fn require_user(&self) -> Result<UserId, DomainError> {
        self.inner
            .auth
            .current_user()
            .map(|u| u.uid)
            .ok_or(DomainError::NotAuthenticated)
    }
}

fn mutation_error(action: &str, err: anyhow::Error, fallback: &str) -> DomainError {
    error!("Error {action} library item: {err:#}");
    let message = err.to_string();
    if message.trim().is_empty() {
        DomainError::mutation_failed(fallback)
    } else {
        DomainError::mutation_failed(message)
    }
}

/// Listener loop of one session.
async fn pump(
    mut stream: SnapshotStream,
    state: Arc<watch::Sender<StoreState>>,
    session: u64,
    cancel: CancellationToken,
) {
    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            next = stream.next() => next,
        };
        match next {
            Some(Ok(snapshot)) => {
                apply_snapshot(&state, session, snapshot);
            }
            Some(Err(e)) => {
                apply_error(&state, session, &e);
            }
            None => {
                debug!(session, "snapshot stream ended");
                break;
            }
        }
    }
}

fn apply_snapshot(state: &watch::Sender<StoreState>, session: u64, snapshot: Snapshot) -> bool {
    let items: Arc<[LibraryItem]> = snapshot
        .documents
        .iter()
        .map(mapper::item_from_document)
        .collect();
    let version = snapshot.version;

    state.send_if_modified(|s| {
        if s.session != session {
            trace!(session, "dropping snapshot of a released session");
            return false;
        }
        if s.version.is_some_and(|applied| version <= applied) {
            debug!(version, "dropping stale snapshot");
            return false;
        }
        s.version = Some(version);
        s.view.items = items;
        s.view.status = SyncStatus::Synced;
        s.view.error = None;
        true
    })
}

fn apply_error(state: &watch::Sender<StoreState>, session: u64, err: &anyhow::Error) -> bool {
    warn!("Error fetching library items: {err:#}");
    let message = err.to_string();

    state.send_if_modified(|s| {
        if s.session != session {
            return false;
        }
        // Keep the last good items on screen.
        s.view.status = SyncStatus::SubscriptionError;
        s.view.error = Some(message);
        true
    })
}

/// Read side of the projection for consumers that react to changes.
pub struct StateWatcher {
    rx: watch::Receiver<StoreState>,
}

impl StateWatcher {
    pub fn current(&self) -> LibraryState {
        self.rx.borrow().view.clone()
    }

    /// Next published state; `None` once the store is gone.
    pub async fn changed(&mut self) -> Option<LibraryState> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().view.clone())
    }

    /// First state (current included) satisfying `predicate`.
    pub async fn wait_for<F>(&mut self, mut predicate: F) -> Option<LibraryState>
    where
        F: FnMut(&LibraryState) -> bool,
    {
        self.rx
            .wait_for(|s| predicate(&s.view))
            .await
            .ok()
            .map(|s| s.view.clone())
    }
}

/// Keeps the store following auth identity changes until dropped.
pub struct SessionBinding {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl Drop for SessionBinding {
    fn drop(&mut self) {
        self.cancel.cancel();
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::Document;
    use crate::domain::ports::StoredValue;
    use std::collections::BTreeMap;

    fn state_for(session: u64) -> watch::Sender<StoreState> {
        watch::Sender::new(StoreState {
            view: LibraryState {
                status: SyncStatus::Subscribing,
                owner: Some(UserId::new("u")),
                items: Arc::from(Vec::new()),
                error: None,
            },
            session,
            version: None,
        })
    }

    fn snapshot(version: u64, titles: &[&str]) -> Snapshot {
        Snapshot {
            version,
            documents: titles
                .iter()
                .enumerate()
                .map(|(i, t)| {
                    let mut fields = BTreeMap::new();
                    fields.insert("title".to_string(), StoredValue::Text(t.to_string()));
                    Document {
                        id: format!("d{i}"),
                        fields,
                    }
                })
                .collect(),
        }
    }

    #[test]
    fn newer_snapshot_replaces_projection_wholesale() {
        let state = state_for(1);
        assert!(apply_snapshot(&state, 1, snapshot(1, &["a", "b"])));
        assert!(apply_snapshot(&state, 1, snapshot(2, &["c"])));

        let s = state.borrow();
        assert_eq!(s.view.items.len(), 1);
        assert_eq!(s.view.items[0].title, "c");
        assert_eq!(s.view.status, SyncStatus::Synced);
    }

    #[test]
    fn stale_snapshot_is_discarded() {
        let state = state_for(1);
        apply_snapshot(&state, 1, snapshot(5, &["new"]));
        assert!(!apply_snapshot(&state, 1, snapshot(4, &["old"])));
        assert!(!apply_snapshot(&state, 1, snapshot(5, &["dup"])));
        assert_eq!(state.borrow().view.items[0].title, "new");
    }

    #[test]
    fn snapshot_of_other_session_is_ignored() {
        let state = state_for(2);
        assert!(!apply_snapshot(&state, 1, snapshot(9, &["ghost"])));
        assert!(state.borrow().view.items.is_empty());
    }

    #[test]
    fn error_keeps_last_good_items() {
        let state = state_for(1);
        apply_snapshot(&state, 1, snapshot(1, &["kept"]));
        assert!(apply_error(&state, 1, &anyhow::anyhow!("permission denied")));

        let s = state.borrow();
        assert_eq!(s.view.status, SyncStatus::SubscriptionError);
        assert_eq!(s.view.error.as_deref(), Some("permission denied"));
        assert_eq!(s.view.items[0].title, "kept");
        assert!(!s.view.loading());
    }

    #[tokio::test]
    async fn dropped_binding_stops_following_auth() {
        use crate::domain::ports::{AuthPort, DocumentBackend};
        use crate::infra::memory::{MemoryAuth, MemoryDocuments};

        let auth = MemoryAuth::new();
        let store = LibraryStore::new(
            Arc::new(MemoryDocuments::new()) as Arc<dyn DocumentBackend>,
            Arc::new(auth.clone()) as Arc<dyn AuthPort>,
            StorageLayout::default(),
        );

        let binding = store.follow_auth();
        auth.sign_up("bound@example.com", "secret1").await.unwrap();
        let mut watcher = store.watch();
        tokio::time::timeout(
            std::time::Duration::from_secs(5),
            watcher.wait_for(|s| s.status == SyncStatus::Synced),
        )
        .await
        .unwrap()
        .unwrap();

        drop(binding);
        store.deactivate();
        auth.sign_in("bound@example.com", "secret1").await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;

        assert_eq!(store.state().status, SyncStatus::Unauthenticated);
        assert!(!store.is_subscribed());
    }

    #[test]
    fn snapshot_after_error_clears_it() {
        let state = state_for(1);
        apply_error(&state, 1, &anyhow::anyhow!("offline"));
        apply_snapshot(&state, 1, snapshot(3, &["x"]));
        let s = state.borrow();
        assert_eq!(s.view.status, SyncStatus::Synced);
        assert!(s.view.error.is_none());
    }
}
