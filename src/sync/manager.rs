use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::Utc;
use thiserror::Error;
use tokio::sync::watch;

use crate::config::{Identity, ScopePath};
use crate::export::{self, ExportArtifact, ExportError};
use crate::store::{
    CancelHandle, NewProject, ProjectStore, SnapshotEvent, StoreError, Subscription, Task,
};

use super::board::Board;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("project title is empty")]
    EmptyTitle,
    #[error("task text is empty")]
    EmptyTask,
    #[error("no signed-in identity for the create write")]
    NoIdentity,
    #[error("task not found in selected project: {0}")]
    TaskNotFound(String),
    #[error("synchronization has not been started")]
    NotStarted,
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("export error: {0}")]
    Export(#[from] ExportError),
}

/// Per-subscription session state
struct Session {
    scope: Option<ScopePath>,
    identity: Option<Identity>,
    cancel: Option<CancelHandle>,
}

/// Operational shell around the [`Board`].
///
/// Owns the live subscription (exactly one at a time), applies push snapshots
/// to the shared board, and exposes the mutation operations. Writes go to the
/// store first; on success the board is patched optimistically so the
/// presentation layer reflects the change before the next snapshot lands. On
/// failure local state stays at the last confirmed remote state.
pub struct BoardManager {
    store: Arc<dyn ProjectStore>,
    board: Arc<Mutex<Board>>,
    session: Mutex<Session>,
    /// Bumped on every (re)subscription; events from older generations are
    /// discarded even when they were already in flight at cancel time.
    generation: Arc<AtomicU64>,
    changes_tx: Arc<watch::Sender<u64>>,
}

impl BoardManager {
    pub fn new(store: Arc<dyn ProjectStore>) -> Self {
        let (changes_tx, _) = watch::channel(0);
        Self {
            store,
            board: Arc::new(Mutex::new(Board::new())),
            session: Mutex::new(Session {
                scope: None,
                identity: None,
                cancel: None,
            }),
            generation: Arc::new(AtomicU64::new(0)),
            changes_tx: Arc::new(changes_tx),
        }
    }

    /// Shared board state read by the presentation layer
    pub fn board(&self) -> Arc<Mutex<Board>> {
        Arc::clone(&self.board)
    }

    /// Receiver ticked on every observable state change
    pub fn changes(&self) -> watch::Receiver<u64> {
        self.changes_tx.subscribe()
    }

    fn notify_changed(&self) {
        self.changes_tx.send_modify(|version| *version += 1);
    }

    /// Record the signed-in principal stamped onto created documents.
    ///
    /// Changing the principal does not re-subscribe by itself; when the
    /// deployment scopes collections per user, the caller derives the new
    /// [`ScopePath`] and calls [`BoardManager::set_scope`].
    pub fn set_identity(&self, identity: Option<Identity>) {
        self.session.lock().unwrap().identity = identity;
    }

    /// Subscribe to a collection scope. Must be called from within a Tokio
    /// runtime.
    pub fn start(&self, scope: ScopePath) {
        self.resubscribe(scope);
    }

    /// Tear down the current subscription and subscribe to a new scope.
    pub fn set_scope(&self, scope: ScopePath) {
        self.resubscribe(scope);
    }

    /// Stop snapshot delivery for good. In-flight writes are not cancelled;
    /// their optimistic patches simply stop mattering.
    pub fn shutdown(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        let mut session = self.session.lock().unwrap();
        if let Some(cancel) = session.cancel.take() {
            cancel.cancel();
        }
        session.scope = None;
        log::info!("sync: shut down");
    }

    fn resubscribe(&self, scope: ScopePath) {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        {
            let mut session = self.session.lock().unwrap();
            if let Some(cancel) = session.cancel.take() {
                cancel.cancel();
            }

            self.board.lock().unwrap().reset_for_rescope();

            let subscription = self.store.subscribe(&scope);
            session.cancel = Some(subscription.cancel_handle());
            session.scope = Some(scope.clone());
            self.spawn_apply(subscription, generation);
        }

        self.notify_changed();
        log::info!("sync: subscribed to {} (generation {})", scope, generation);
    }

    fn spawn_apply(&self, mut subscription: Subscription, generation: u64) {
        let board = Arc::clone(&self.board);
        let current = Arc::clone(&self.generation);
        let changes = Arc::clone(&self.changes_tx);

        tokio::spawn(async move {
            while let Some(event) = subscription.next_event().await {
                if current.load(Ordering::SeqCst) != generation {
                    log::debug!("sync: dropping event for stale generation {}", generation);
                    break;
                }
                match event {
                    SnapshotEvent::Snapshot(docs) => {
                        log::debug!("sync: applying snapshot with {} project(s)", docs.len());
                        board.lock().unwrap().apply_snapshot(docs);
                        changes.send_modify(|version| *version += 1);
                    }
                    SnapshotEvent::Failed(err) => {
                        log::error!("sync: subscription failed: {}", err);
                        board.lock().unwrap().mark_failed();
                        changes.send_modify(|version| *version += 1);
                        break;
                    }
                }
            }
            log::debug!("sync: apply task for generation {} exited", generation);
        });
    }

    fn scope(&self) -> Result<ScopePath, SyncError> {
        self.session
            .lock()
            .unwrap()
            .scope
            .clone()
            .ok_or(SyncError::NotStarted)
    }

    // ===== View navigation and form input =====

    pub fn open_create(&self) {
        self.board.lock().unwrap().open_create();
        self.notify_changed();
    }

    pub fn open_project(&self, id: &str) -> bool {
        let opened = self.board.lock().unwrap().open_project(id);
        if opened {
            self.notify_changed();
        }
        opened
    }

    pub fn back_to_dashboard(&self) {
        self.board.lock().unwrap().back_to_dashboard();
        self.notify_changed();
    }

    pub fn set_project_form(&self, title: impl Into<String>, description: impl Into<String>) {
        self.board
            .lock()
            .unwrap()
            .set_project_form(title, description);
    }

    pub fn set_task_input(&self, text: impl Into<String>) {
        self.board.lock().unwrap().set_task_input(text);
    }

    // ===== Mutation operations =====

    /// Create a project from the current form state.
    ///
    /// On success the form is cleared and the view returns to the dashboard;
    /// on failure the form is retained for retry.
    pub async fn create_project(&self) -> Result<String, SyncError> {
        let scope = self.scope()?;

        let identity = self.session.lock().unwrap().identity.clone();
        let Some(identity) = identity else {
            return Err(SyncError::NoIdentity);
        };

        let fields = {
            let board = self.board.lock().unwrap();
            let form = board.project_form();
            let title = form.title.trim();
            if title.is_empty() {
                return Err(SyncError::EmptyTitle);
            }
            let description = form.description.trim();
            let description = (!description.is_empty()).then(|| description.to_string());
            NewProject {
                created_by: Some(identity.user_id),
                ..NewProject::new(title, description)
            }
        };

        let id = match self.store.create(&scope, fields).await {
            Ok(id) => id,
            Err(err) => {
                log::error!("sync: create project failed: {}", err);
                return Err(err.into());
            }
        };

        self.board.lock().unwrap().clear_project_form();
        self.notify_changed();
        log::info!("sync: created project {}", id);
        Ok(id)
    }

    /// Delete a project document. The caller is expected to have confirmed
    /// destructive intent; in a shared scope the document disappears for
    /// every reader.
    pub async fn delete_project(&self, id: &str) -> Result<(), SyncError> {
        let scope = self.scope()?;

        if let Err(err) = self.store.delete(&scope, id).await {
            log::error!("sync: delete project {} failed: {}", id, err);
            return Err(err.into());
        }

        self.board.lock().unwrap().clear_selection_if(id);
        self.notify_changed();
        log::info!("sync: deleted project {}", id);
        Ok(())
    }

    /// Append a task from the current input to the selected project.
    ///
    /// A no-op when nothing is selected. On success the input is cleared; on
    /// failure it is retained for retry.
    pub async fn add_task(&self) -> Result<(), SyncError> {
        let scope = self.scope()?;

        let (project_id, new_tasks) = {
            let board = self.board.lock().unwrap();
            let Some(project) = board.selected_project() else {
                return Ok(());
            };
            let text = board.task_input().trim().to_string();
            if text.is_empty() {
                return Err(SyncError::EmptyTask);
            }
            let mut tasks = project.tasks.clone();
            let id = fresh_task_id(&tasks, Utc::now().timestamp_millis());
            tasks.push(Task::new(id, text));
            (project.id.clone(), tasks)
        };

        self.write_task_list(&scope, &project_id, new_tasks).await?;
        self.board.lock().unwrap().clear_task_input();
        self.notify_changed();
        Ok(())
    }

    /// Invert the completed flag of one task in the selected project.
    /// A no-op when nothing is selected.
    pub async fn toggle_task(&self, task_id: &str) -> Result<(), SyncError> {
        let scope = self.scope()?;

        let (project_id, new_tasks) = {
            let board = self.board.lock().unwrap();
            let Some(project) = board.selected_project() else {
                return Ok(());
            };
            if !project.tasks.iter().any(|t| t.id == task_id) {
                return Err(SyncError::TaskNotFound(task_id.to_string()));
            }
            let tasks: Vec<Task> = project
                .tasks
                .iter()
                .cloned()
                .map(|mut task| {
                    if task.id == task_id {
                        task.completed = !task.completed;
                    }
                    task
                })
                .collect();
            (project.id.clone(), tasks)
        };

        self.write_task_list(&scope, &project_id, new_tasks).await
    }

    /// Remove one task from the selected project.
    /// A no-op when nothing is selected.
    pub async fn delete_task(&self, task_id: &str) -> Result<(), SyncError> {
        let scope = self.scope()?;

        let (project_id, new_tasks) = {
            let board = self.board.lock().unwrap();
            let Some(project) = board.selected_project() else {
                return Ok(());
            };
            if !project.tasks.iter().any(|t| t.id == task_id) {
                return Err(SyncError::TaskNotFound(task_id.to_string()));
            }
            let tasks: Vec<Task> = project
                .tasks
                .iter()
                .filter(|t| t.id != task_id)
                .cloned()
                .collect();
            (project.id.clone(), tasks)
        };

        self.write_task_list(&scope, &project_id, new_tasks).await
    }

    /// Write a whole task list and, on success, apply it optimistically.
    ///
    /// Task edits always rewrite the parent's entire list: tasks are embedded
    /// with no per-task addressing, so concurrent edits from two parties race
    /// at whole-list granularity and the later write wins.
    async fn write_task_list(
        &self,
        scope: &ScopePath,
        project_id: &str,
        new_tasks: Vec<Task>,
    ) -> Result<(), SyncError> {
        if let Err(err) = self
            .store
            .update_tasks(scope, project_id, new_tasks.clone())
            .await
        {
            log::error!("sync: task write to {} failed: {}", project_id, err);
            return Err(err.into());
        }

        self.board
            .lock()
            .unwrap()
            .patch_tasks(project_id, new_tasks);
        self.notify_changed();
        Ok(())
    }

    /// Serialize the current collection into a downloadable backup artifact.
    /// Read-only and synchronous; errs when there is nothing to export.
    pub fn export_backup(&self) -> Result<ExportArtifact, SyncError> {
        let board = self.board.lock().unwrap();
        let artifact = export::build_backup(board.projects(), Utc::now())?;
        log::info!(
            "sync: exported {} project(s) as {}",
            board.projects().len(),
            artifact.filename,
        );
        Ok(artifact)
    }
}

/// Task ids derive from the creation instant; on a same-millisecond
/// collision the id is bumped forward until unique within the project.
fn fresh_task_id(tasks: &[Task], now_millis: i64) -> String {
    let mut candidate = now_millis;
    loop {
        let id = candidate.to_string();
        if !tasks.iter().any(|t| t.id == id) {
            return id;
        }
        candidate += 1;
    }
}
