//! Typed records for the remote project collection.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};

/// Lifecycle tag on a project document
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ProjectStatus {
    Active,
    Archived,
}

impl Default for ProjectStatus {
    fn default() -> Self {
        Self::Active
    }
}

/// A single checkable to-do item embedded in a project document.
///
/// Tasks have no identity outside their parent project: every task mutation
/// rewrites the parent's whole task list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Task {
    /// Client-assigned identifier, derived from the creation instant
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub completed: bool,
}

impl Task {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            completed: false,
        }
    }
}

/// A tracked project as read from the collection store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    /// Store-assigned document identifier
    pub id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Server-assigned; absent momentarily until the store stamps the document
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    /// An absent task list reads as empty
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub status: ProjectStatus,
}

impl Project {
    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    pub fn completed_count(&self) -> usize {
        self.tasks.iter().filter(|t| t.completed).count()
    }

    pub fn pending_count(&self) -> usize {
        self.tasks.iter().filter(|t| !t.completed).count()
    }

    /// Completion percentage, rounded; 0 for a project with no tasks
    pub fn progress_percent(&self) -> u8 {
        let total = self.task_count();
        if total == 0 {
            return 0;
        }
        ((self.completed_count() * 100) as f64 / total as f64).round() as u8
    }

    /// A project with at least one task, all of them completed
    pub fn is_complete(&self) -> bool {
        !self.tasks.is_empty() && self.tasks.iter().all(|t| t.completed)
    }
}

/// Reserved field value the store replaces with its own clock at write time
pub const SERVER_TIMESTAMP_SENTINEL: &str = "__server_timestamp__";

/// Sentinel written in place of a concrete timestamp on create.
#[derive(Debug, Clone, Copy, Default)]
pub struct ServerTimestamp;

impl Serialize for ServerTimestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(SERVER_TIMESTAMP_SENTINEL)
    }
}

/// Field bundle for a project create write.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProject {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub created_at: ServerTimestamp,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    pub tasks: Vec<Task>,
    pub status: ProjectStatus,
}

impl NewProject {
    /// A fresh project document: empty task list, active status.
    pub fn new(title: impl Into<String>, description: Option<String>) -> Self {
        Self {
            title: title.into(),
            description,
            created_at: ServerTimestamp,
            created_by: None,
            tasks: Vec::new(),
            status: ProjectStatus::Active,
        }
    }
}
