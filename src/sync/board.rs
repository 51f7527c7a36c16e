//! Local board state mirrored from the remote project collection.

use chrono::{DateTime, Utc};

use crate::store::{Project, Task};

/// Where the board stands relative to its live subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadPhase {
    /// Subscribed, nothing delivered yet — distinct from "zero projects"
    Loading,
    /// At least one snapshot ingested
    Ready,
    /// The subscription failed; terminal until a new subscription starts
    Failed,
}

/// Which screen the presentation layer is on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ActiveView {
    #[default]
    Dashboard,
    Create,
    Detail,
}

/// Input state of the project creation form
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectForm {
    pub title: String,
    pub description: String,
}

impl ProjectForm {
    pub fn is_empty(&self) -> bool {
        self.title.is_empty() && self.description.is_empty()
    }
}

/// In-memory mirror of the project collection plus the view-facing state the
/// mutation operations act on.
///
/// Snapshots from the store replace the collection wholesale; optimistic
/// patches are a local convenience display that the next snapshot supersedes.
#[derive(Debug)]
pub struct Board {
    phase: LoadPhase,
    projects: Vec<Project>,
    selected: Option<Project>,
    view: ActiveView,
    project_form: ProjectForm,
    task_input: String,
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

impl Board {
    pub fn new() -> Self {
        Self {
            phase: LoadPhase::Loading,
            projects: Vec::new(),
            selected: None,
            view: ActiveView::Dashboard,
            project_form: ProjectForm::default(),
            task_input: String::new(),
        }
    }

    // ===== Read side (the presentation contract) =====

    pub fn phase(&self) -> LoadPhase {
        self.phase
    }

    pub fn loading(&self) -> bool {
        self.phase == LoadPhase::Loading
    }

    pub fn load_failed(&self) -> bool {
        self.phase == LoadPhase::Failed
    }

    /// The collection, ordered newest-first
    pub fn projects(&self) -> &[Project] {
        &self.projects
    }

    pub fn selected_project(&self) -> Option<&Project> {
        self.selected.as_ref()
    }

    pub fn view(&self) -> ActiveView {
        self.view
    }

    pub fn project_form(&self) -> &ProjectForm {
        &self.project_form
    }

    pub fn task_input(&self) -> &str {
        &self.task_input
    }

    /// Open tasks across the whole collection
    pub fn pending_total(&self) -> usize {
        self.projects.iter().map(|p| p.pending_count()).sum()
    }

    // ===== View navigation and form input =====

    pub fn set_project_form(&mut self, title: impl Into<String>, description: impl Into<String>) {
        self.project_form = ProjectForm {
            title: title.into(),
            description: description.into(),
        };
    }

    pub fn set_task_input(&mut self, text: impl Into<String>) {
        self.task_input = text.into();
    }

    pub fn open_create(&mut self) {
        self.view = ActiveView::Create;
    }

    /// Select a project by identifier and switch to the detail view.
    pub fn open_project(&mut self, id: &str) -> bool {
        match self.projects.iter().find(|p| p.id == id) {
            Some(project) => {
                self.selected = Some(project.clone());
                self.view = ActiveView::Detail;
                true
            }
            None => false,
        }
    }

    pub fn back_to_dashboard(&mut self) {
        self.view = ActiveView::Dashboard;
    }

    // ===== Snapshot ingestion =====

    /// Replace the collection with a fresh snapshot.
    ///
    /// The snapshot is sorted by creation timestamp, newest first; documents
    /// the server has not stamped yet sort to the bottom instead of jumping
    /// to the top, and ties keep their snapshot order. The selected project,
    /// if any, is re-resolved against the fresh contents so edits made by any
    /// party show up. A selected project missing from the snapshot keeps its
    /// previous copy; the deletion operation itself clears the selection.
    pub fn apply_snapshot(&mut self, mut docs: Vec<Project>) {
        docs.sort_by(|a, b| {
            let a_ts = a.created_at.unwrap_or(DateTime::<Utc>::MIN_UTC);
            let b_ts = b.created_at.unwrap_or(DateTime::<Utc>::MIN_UTC);
            b_ts.cmp(&a_ts)
        });
        self.projects = docs;
        self.phase = LoadPhase::Ready;

        if let Some(current) = &self.selected {
            if let Some(fresh) = self.projects.iter().find(|p| p.id == current.id) {
                self.selected = Some(fresh.clone());
            }
        }
    }

    /// Record a terminal subscription failure. Previously ingested state is
    /// left alone; callers decide what, if anything, to keep showing.
    pub fn mark_failed(&mut self) {
        self.phase = LoadPhase::Failed;
    }

    /// Drop all state from the previous scope and go back to loading.
    pub(crate) fn reset_for_rescope(&mut self) {
        self.phase = LoadPhase::Loading;
        self.projects.clear();
        self.selected = None;
        self.view = ActiveView::Dashboard;
    }

    // ===== Mutation support =====

    pub(crate) fn clear_project_form(&mut self) {
        self.project_form = ProjectForm::default();
        self.view = ActiveView::Dashboard;
    }

    pub(crate) fn clear_task_input(&mut self) {
        self.task_input.clear();
    }

    /// Optimistically apply a freshly written task list.
    ///
    /// A no-op when the project is no longer selected — the write still
    /// happened remotely and the next snapshot carries it. While selected,
    /// the collection entry is patched too so dashboard aggregates agree
    /// with the detail view.
    pub(crate) fn patch_tasks(&mut self, project_id: &str, tasks: Vec<Task>) {
        let still_selected = matches!(&self.selected, Some(p) if p.id == project_id);
        if !still_selected {
            log::debug!(
                "board: dropping optimistic patch for {}, no longer selected",
                project_id,
            );
            return;
        }

        if let Some(entry) = self.projects.iter_mut().find(|p| p.id == project_id) {
            entry.tasks = tasks.clone();
        }
        if let Some(selected) = &mut self.selected {
            selected.tasks = tasks;
        }
    }

    /// Clear selection after the selected project was deleted.
    pub(crate) fn clear_selection_if(&mut self, project_id: &str) {
        if matches!(&self.selected, Some(p) if p.id == project_id) {
            self.selected = None;
            self.view = ActiveView::Dashboard;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn project(id: &str, ts: Option<i64>) -> Project {
        Project {
            id: id.to_string(),
            title: format!("Project {}", id),
            description: None,
            created_at: ts.map(|secs| Utc.timestamp_opt(secs, 0).unwrap()),
            created_by: None,
            tasks: Vec::new(),
            status: Default::default(),
        }
    }

    fn ids(board: &Board) -> Vec<&str> {
        board.projects().iter().map(|p| p.id.as_str()).collect()
    }

    #[test]
    fn starts_loading_with_empty_collection() {
        let board = Board::new();
        assert!(board.loading());
        assert!(board.projects().is_empty());
        assert_eq!(board.view(), ActiveView::Dashboard);
    }

    #[test]
    fn snapshot_sorts_newest_first_with_unstamped_last() {
        let mut board = Board::new();
        board.apply_snapshot(vec![
            project("old", Some(100)),
            project("unstamped-a", None),
            project("new", Some(300)),
            project("unstamped-b", None),
            project("mid", Some(200)),
        ]);

        assert!(!board.loading());
        assert_eq!(
            ids(&board),
            vec!["new", "mid", "old", "unstamped-a", "unstamped-b"]
        );
    }

    #[test]
    fn snapshot_ties_keep_snapshot_order() {
        let mut board = Board::new();
        board.apply_snapshot(vec![
            project("b", Some(100)),
            project("a", Some(100)),
            project("c", Some(100)),
        ]);
        assert_eq!(ids(&board), vec!["b", "a", "c"]);
    }

    #[test]
    fn snapshot_replaces_collection_wholesale() {
        let mut board = Board::new();
        board.apply_snapshot(vec![project("a", Some(1)), project("b", Some(2))]);
        board.apply_snapshot(vec![project("c", Some(3))]);
        assert_eq!(ids(&board), vec!["c"]);
    }

    #[test]
    fn selection_resyncs_to_fresh_copy() {
        let mut board = Board::new();
        board.apply_snapshot(vec![project("a", Some(1))]);
        assert!(board.open_project("a"));

        let mut edited = project("a", Some(1));
        edited.title = "Renamed elsewhere".to_string();
        edited.tasks = vec![Task::new("1", "Added elsewhere")];
        board.apply_snapshot(vec![edited.clone()]);

        assert_eq!(board.selected_project(), Some(&edited));
    }

    #[test]
    fn selection_survives_a_snapshot_missing_it() {
        let mut board = Board::new();
        board.apply_snapshot(vec![project("a", Some(1)), project("b", Some(2))]);
        assert!(board.open_project("a"));

        board.apply_snapshot(vec![project("b", Some(2))]);

        // Transiently stale; the delete operation is what clears selection
        assert_eq!(board.selected_project().map(|p| p.id.as_str()), Some("a"));
    }

    #[test]
    fn open_project_requires_a_known_id() {
        let mut board = Board::new();
        board.apply_snapshot(vec![project("a", Some(1))]);
        assert!(!board.open_project("zzz"));
        assert_eq!(board.view(), ActiveView::Dashboard);
        assert!(board.selected_project().is_none());
    }

    #[test]
    fn patch_applies_to_selection_and_collection() {
        let mut board = Board::new();
        board.apply_snapshot(vec![project("a", Some(1))]);
        board.open_project("a");

        let tasks = vec![Task::new("1", "Buy milk")];
        board.patch_tasks("a", tasks.clone());

        assert_eq!(board.selected_project().unwrap().tasks, tasks);
        assert_eq!(board.projects()[0].tasks, tasks);
    }

    #[test]
    fn patch_is_noop_without_matching_selection() {
        let mut board = Board::new();
        board.apply_snapshot(vec![project("a", Some(1)), project("b", Some(2))]);
        board.open_project("b");

        board.patch_tasks("a", vec![Task::new("1", "Stale write")]);

        let a = board.projects().iter().find(|p| p.id == "a").unwrap();
        assert!(a.tasks.is_empty());
    }

    #[test]
    fn snapshot_carrying_the_patch_is_idempotent() {
        let mut board = Board::new();
        board.apply_snapshot(vec![project("a", Some(1))]);
        board.open_project("a");

        let tasks = vec![Task::new("1", "Buy milk")];
        board.patch_tasks("a", tasks.clone());

        let mut confirmed = project("a", Some(1));
        confirmed.tasks = tasks.clone();
        board.apply_snapshot(vec![confirmed]);

        assert_eq!(board.projects().len(), 1);
        assert_eq!(board.projects()[0].tasks, tasks);
        assert_eq!(board.selected_project().unwrap().tasks, tasks);
    }

    #[test]
    fn clear_selection_returns_to_dashboard() {
        let mut board = Board::new();
        board.apply_snapshot(vec![project("a", Some(1)), project("b", Some(2))]);
        board.open_project("a");

        board.clear_selection_if("b");
        assert!(board.selected_project().is_some());

        board.clear_selection_if("a");
        assert!(board.selected_project().is_none());
        assert_eq!(board.view(), ActiveView::Dashboard);
    }

    #[test]
    fn pending_total_spans_all_projects() {
        let mut one = project("a", Some(1));
        one.tasks = vec![Task::new("1", "x"), {
            let mut done = Task::new("2", "y");
            done.completed = true;
            done
        }];
        let mut two = project("b", Some(2));
        two.tasks = vec![Task::new("3", "z")];

        let mut board = Board::new();
        board.apply_snapshot(vec![one, two]);
        assert_eq!(board.pending_total(), 2);
    }

    #[test]
    fn rescope_drops_previous_state() {
        let mut board = Board::new();
        board.apply_snapshot(vec![project("a", Some(1))]);
        board.open_project("a");

        board.reset_for_rescope();
        assert!(board.loading());
        assert!(board.projects().is_empty());
        assert!(board.selected_project().is_none());
        assert_eq!(board.view(), ActiveView::Dashboard);
    }

    #[test]
    fn failure_is_recorded_without_clearing_state() {
        let mut board = Board::new();
        board.apply_snapshot(vec![project("a", Some(1))]);
        board.mark_failed();
        assert!(board.load_failed());
        assert_eq!(board.projects().len(), 1);
    }
}
