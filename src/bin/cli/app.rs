use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tokio::sync::watch;
use uuid::Uuid;

use focal::config::{self, Identity, StoreConfig};
use focal::store::{Project, RestStore, Task};
use focal::sync::{BoardManager, LoadPhase};

/// Shared application state for CLI commands
pub struct App {
    pub manager: BoardManager,
    changes: watch::Receiver<u64>,
}

impl App {
    /// Initialize configuration from the environment, pick an identity, and
    /// subscribe to the configured collection scope.
    pub fn connect() -> Result<Self> {
        let store_config = StoreConfig::from_env().context("reading store configuration")?;
        config::init(store_config).context("initializing store configuration")?;

        // Sign-in proper happens outside this tool; a stable user id from the
        // environment (or a throwaway one) is all the sync core needs.
        let identity = Identity::new(
            std::env::var("FOCAL_USER").unwrap_or_else(|_| Uuid::new_v4().to_string()),
        );

        let scope = config::get()?
            .scope_path(Some(&identity))
            .context("no collection scope for the configured mode")?;

        let store = Arc::new(RestStore::from_config().context("building store client")?);
        let manager = BoardManager::new(store);
        manager.set_identity(Some(identity));
        let changes = manager.changes();
        manager.start(scope);

        Ok(Self { manager, changes })
    }

    /// Block until the first snapshot lands, or fail when the subscription
    /// does.
    pub async fn wait_ready(&mut self) -> Result<()> {
        loop {
            let phase = self.manager.board().lock().unwrap().phase();
            match phase {
                LoadPhase::Ready => return Ok(()),
                LoadPhase::Failed => bail!("could not load projects from the store"),
                LoadPhase::Loading => {}
            }
            self.changes
                .changed()
                .await
                .context("sync ended before the first snapshot")?;
        }
    }

    /// Wait for the next applied board change.
    pub async fn next_change(&mut self) -> Result<()> {
        self.changes.changed().await.context("sync ended")?;
        Ok(())
    }

    /// Find a project by id, or by case-insensitive title prefix.
    pub fn find_project(&self, needle: &str) -> Result<Project> {
        let board = self.manager.board();
        let board = board.lock().unwrap();

        if let Some(project) = board.projects().iter().find(|p| p.id == needle) {
            return Ok(project.clone());
        }

        let needle_lower = needle.to_lowercase();
        let mut matches = board
            .projects()
            .iter()
            .filter(|p| p.title.to_lowercase().starts_with(&needle_lower));

        match (matches.next(), matches.next()) {
            (Some(project), None) => Ok(project.clone()),
            (Some(_), Some(_)) => bail!("'{}' matches more than one project", needle),
            (None, _) => bail!("project '{}' not found", needle),
        }
    }

    /// Find a task in a project by id, or by case-insensitive text prefix.
    pub fn find_task(&self, project: &Project, needle: &str) -> Result<Task> {
        if let Some(task) = project.tasks.iter().find(|t| t.id == needle) {
            return Ok(task.clone());
        }

        let needle_lower = needle.to_lowercase();
        let mut matches = project
            .tasks
            .iter()
            .filter(|t| t.text.to_lowercase().starts_with(&needle_lower));

        match (matches.next(), matches.next()) {
            (Some(task), None) => Ok(task.clone()),
            (Some(_), Some(_)) => bail!("'{}' matches more than one task", needle),
            (None, _) => bail!("task '{}' not found in '{}'", needle, project.title),
        }
    }

    /// Ask the user to confirm a destructive action.
    pub fn confirm(&self, prompt: &str) -> Result<bool> {
        use std::io::Write;

        print!("{} [y/N] ", prompt);
        std::io::stdout().flush()?;

        let mut answer = String::new();
        std::io::stdin().read_line(&mut answer)?;
        Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
    }
}
