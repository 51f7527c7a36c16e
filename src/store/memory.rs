//! In-process collection store for tests and embedded use.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use chrono::Utc;
use tokio::sync::{broadcast, mpsc};
use uuid::Uuid;

use crate::config::ScopePath;

use super::{NewProject, Project, ProjectStore, SnapshotEvent, StoreError, Subscription, Task};

const EVENT_CHANNEL_CAPACITY: usize = 16;
const BROADCAST_CAPACITY: usize = 16;

/// One scoped collection and its change feed
struct Shelf {
    docs: Vec<Project>,
    changes: broadcast::Sender<Vec<Project>>,
}

impl Shelf {
    fn new() -> Self {
        let (changes, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self {
            docs: Vec::new(),
            changes,
        }
    }
}

/// Store implementation holding every collection in memory.
///
/// Behaves like the real store from the sync core's point of view: writes are
/// acknowledged asynchronously, and every accepted write pushes a fresh full
/// snapshot to all live subscriptions of that scope. Knobs exist to suppress
/// the automatic push and to inject failures, so tests can observe optimistic
/// state and error paths deterministically.
#[derive(Default)]
pub struct MemoryStore {
    collections: Mutex<HashMap<String, Shelf>>,
    suppress_push: AtomicBool,
    fail_writes: AtomicBool,
    fail_subscriptions: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// When suppressed, writes are stored but no snapshot is pushed until
    /// [`MemoryStore::push_snapshot`] is called.
    pub fn suppress_push(&self, suppress: bool) {
        self.suppress_push.store(suppress, Ordering::SeqCst);
    }

    /// Make every subsequent write fail with [`StoreError::Unavailable`].
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Make every subsequent subscription fail immediately.
    pub fn fail_subscriptions(&self, fail: bool) {
        self.fail_subscriptions.store(fail, Ordering::SeqCst);
    }

    /// Insert a document as-given, without pushing a snapshot.
    pub fn insert(&self, scope: &ScopePath, project: Project) {
        let mut collections = self.collections.lock().unwrap();
        let shelf = collections
            .entry(scope.as_str().to_string())
            .or_insert_with(Shelf::new);
        shelf.docs.push(project);
    }

    /// Current documents of a scope, in insertion order.
    pub fn documents(&self, scope: &ScopePath) -> Vec<Project> {
        let collections = self.collections.lock().unwrap();
        collections
            .get(scope.as_str())
            .map(|shelf| shelf.docs.clone())
            .unwrap_or_default()
    }

    /// Push the current contents of a scope to all its live subscriptions.
    pub fn push_snapshot(&self, scope: &ScopePath) {
        let collections = self.collections.lock().unwrap();
        if let Some(shelf) = collections.get(scope.as_str()) {
            // No receivers is fine; the send result only reports that
            let _ = shelf.changes.send(shelf.docs.clone());
        }
    }

    fn push_unless_suppressed(&self, scope: &ScopePath) {
        if !self.suppress_push.load(Ordering::SeqCst) {
            self.push_snapshot(scope);
        }
    }

    fn write_fault(&self) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable);
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl ProjectStore for MemoryStore {
    fn subscribe(&self, scope: &ScopePath) -> Subscription {
        let (events_tx, events_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel(1);

        if self.fail_subscriptions.load(Ordering::SeqCst) {
            tokio::spawn(async move {
                let _ = events_tx
                    .send(SnapshotEvent::Failed(StoreError::Unavailable))
                    .await;
            });
            return Subscription::new(events_rx, shutdown_tx);
        }

        let (initial, mut changes) = {
            let mut collections = self.collections.lock().unwrap();
            let shelf = collections
                .entry(scope.as_str().to_string())
                .or_insert_with(Shelf::new);
            (shelf.docs.clone(), shelf.changes.subscribe())
        };

        let scope_name = scope.to_string();
        tokio::spawn(async move {
            if events_tx.send(SnapshotEvent::Snapshot(initial)).await.is_err() {
                return;
            }
            loop {
                tokio::select! {
                    changed = changes.recv() => {
                        match changed {
                            Ok(docs) => {
                                if events_tx.send(SnapshotEvent::Snapshot(docs)).await.is_err() {
                                    return;
                                }
                            }
                            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                                // Older snapshots are superseded anyway
                                log::warn!(
                                    "memory store: subscription to {} lagged, skipped {}",
                                    scope_name,
                                    skipped,
                                );
                            }
                            Err(broadcast::error::RecvError::Closed) => return,
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        log::debug!("memory store: subscription to {} cancelled", scope_name);
                        return;
                    }
                }
            }
        });

        Subscription::new(events_rx, shutdown_tx)
    }

    async fn create(&self, scope: &ScopePath, fields: NewProject) -> Result<String, StoreError> {
        self.write_fault()?;

        let id = Uuid::new_v4().to_string();
        {
            let mut collections = self.collections.lock().unwrap();
            let shelf = collections
                .entry(scope.as_str().to_string())
                .or_insert_with(Shelf::new);
            shelf.docs.push(Project {
                id: id.clone(),
                title: fields.title,
                description: fields.description,
                // The store's clock stands in for the sentinel
                created_at: Some(Utc::now()),
                created_by: fields.created_by,
                tasks: fields.tasks,
                status: fields.status,
            });
        }

        self.push_unless_suppressed(scope);
        Ok(id)
    }

    async fn update_tasks(
        &self,
        scope: &ScopePath,
        id: &str,
        tasks: Vec<Task>,
    ) -> Result<(), StoreError> {
        self.write_fault()?;

        {
            let mut collections = self.collections.lock().unwrap();
            let doc = collections
                .get_mut(scope.as_str())
                .and_then(|shelf| shelf.docs.iter_mut().find(|p| p.id == id))
                .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
            doc.tasks = tasks;
        }

        self.push_unless_suppressed(scope);
        Ok(())
    }

    async fn delete(&self, scope: &ScopePath, id: &str) -> Result<(), StoreError> {
        self.write_fault()?;

        {
            let mut collections = self.collections.lock().unwrap();
            let shelf = collections
                .get_mut(scope.as_str())
                .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
            let before = shelf.docs.len();
            shelf.docs.retain(|p| p.id != id);
            if shelf.docs.len() == before {
                return Err(StoreError::NotFound(id.to_string()));
            }
        }

        self.push_unless_suppressed(scope);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_stamps_server_timestamp() {
        let store = MemoryStore::new();
        let scope = ScopePath::shared("test");

        let id = store
            .create(&scope, NewProject::new("Garden", None))
            .await
            .unwrap();

        let docs = store.documents(&scope);
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].id, id);
        assert!(docs[0].created_at.is_some());
    }

    #[tokio::test]
    async fn subscription_gets_initial_and_write_snapshots() {
        let store = MemoryStore::new();
        let scope = ScopePath::shared("test");

        let mut subscription = store.subscribe(&scope);
        match subscription.next_event().await {
            Some(SnapshotEvent::Snapshot(docs)) => assert!(docs.is_empty()),
            other => panic!("expected initial snapshot, got {:?}", other),
        }

        store
            .create(&scope, NewProject::new("Garden", None))
            .await
            .unwrap();
        match subscription.next_event().await {
            Some(SnapshotEvent::Snapshot(docs)) => assert_eq!(docs.len(), 1),
            other => panic!("expected write snapshot, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn injected_write_failure_leaves_documents_untouched() {
        let store = MemoryStore::new();
        let scope = ScopePath::shared("test");

        store.fail_writes(true);
        let result = store.create(&scope, NewProject::new("Garden", None)).await;
        assert!(matches!(result, Err(StoreError::Unavailable)));
        assert!(store.documents(&scope).is_empty());
    }

    #[tokio::test]
    async fn cancelled_subscription_stops_delivery() {
        let store = MemoryStore::new();
        let scope = ScopePath::shared("test");

        let mut subscription = store.subscribe(&scope);
        let cancel = subscription.cancel_handle();
        assert!(matches!(
            subscription.next_event().await,
            Some(SnapshotEvent::Snapshot(_))
        ));

        cancel.cancel();
        // Channel closes once the forwarder winds down
        assert!(subscription.next_event().await.is_none());
    }
}
