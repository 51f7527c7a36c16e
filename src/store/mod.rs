//! Remote collection store: the document database the tracker syncs against.
//!
//! The store delivers the full collection as a push snapshot on every change
//! and accepts asynchronous create/update/delete writes. `RestStore` talks to
//! a real deployment; `MemoryStore` backs tests and embedded use.

mod listen;
pub mod memory;
pub mod models;
pub mod rest;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::config::ScopePath;

pub use memory::MemoryStore;
pub use models::{
    NewProject, Project, ProjectStatus, ServerTimestamp, Task, SERVER_TIMESTAMP_SENTINEL,
};
pub use rest::RestStore;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("authentication failed")]
    AuthFailed,
    #[error("document not found: {0}")]
    NotFound(String),
    #[error("server error: {status} - {message}")]
    Server { status: u16, message: String },
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("event stream error: {0}")]
    Stream(String),
    #[error("event stream closed")]
    StreamClosed,
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
    #[error("store backend unavailable")]
    Unavailable,
    #[error("configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),
}

/// One push delivery on a live subscription.
#[derive(Debug)]
pub enum SnapshotEvent {
    /// Full replacement view of the collection
    Snapshot(Vec<Project>),
    /// The subscription failed; terminal for this subscription
    Failed(StoreError),
}

/// Cancellation handle for a live subscription.
///
/// Cancelling stops all further snapshot delivery; the event channel closes
/// once the store-side listener winds down.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    shutdown_tx: mpsc::Sender<()>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        let _ = self.shutdown_tx.try_send(());
    }
}

/// A live subscription to one collection scope.
pub struct Subscription {
    events: mpsc::Receiver<SnapshotEvent>,
    shutdown_tx: mpsc::Sender<()>,
}

impl Subscription {
    pub fn new(events: mpsc::Receiver<SnapshotEvent>, shutdown_tx: mpsc::Sender<()>) -> Self {
        Self {
            events,
            shutdown_tx,
        }
    }

    /// Next push delivery; `None` once the subscription has wound down.
    pub async fn next_event(&mut self) -> Option<SnapshotEvent> {
        self.events.recv().await
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle {
            shutdown_tx: self.shutdown_tx.clone(),
        }
    }
}

/// Contract of the remote collection store.
///
/// Writes address whole documents; task edits rewrite the parent project's
/// entire task list (the store offers no per-task addressing).
#[async_trait]
pub trait ProjectStore: Send + Sync {
    /// Open a live subscription delivering a full snapshot on every change.
    /// Must be called from within a Tokio runtime.
    fn subscribe(&self, scope: &ScopePath) -> Subscription;

    /// Create a project document; returns the store-assigned identifier.
    async fn create(&self, scope: &ScopePath, fields: NewProject) -> Result<String, StoreError>;

    /// Replace the task list of one project document.
    async fn update_tasks(
        &self,
        scope: &ScopePath,
        id: &str,
        tasks: Vec<Task>,
    ) -> Result<(), StoreError>;

    /// Delete a project document (and, implicitly, its embedded tasks).
    async fn delete(&self, scope: &ScopePath, id: &str) -> Result<(), StoreError>;
}
