//! Backup export of the project collection.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::store::Project;

/// Marker distinguishing these artifacts from other JSON lying around
pub const BACKUP_KIND: &str = "shared_backup";

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("no projects to export")]
    Empty,
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Serialized form of one backup
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportBundle {
    pub export_date: DateTime<Utc>,
    #[serde(rename = "type")]
    pub kind: String,
    pub projects: Vec<Project>,
}

/// A downloadable artifact: contents plus the date-keyed filename to offer
#[derive(Debug, Clone)]
pub struct ExportArtifact {
    pub filename: String,
    pub contents: String,
}

/// Serialize the collection into a backup artifact.
///
/// Read-only and offline: the bundle reflects whatever state the caller
/// currently holds. Errs when the collection is empty.
pub fn build_backup(
    projects: &[Project],
    now: DateTime<Utc>,
) -> Result<ExportArtifact, ExportError> {
    if projects.is_empty() {
        return Err(ExportError::Empty);
    }

    let bundle = ExportBundle {
        export_date: now,
        kind: BACKUP_KIND.to_string(),
        projects: projects.to_vec(),
    };

    Ok(ExportArtifact {
        filename: format!("backup_{}.json", now.format("%Y-%m-%d")),
        contents: serde_json::to_string_pretty(&bundle)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Task;
    use chrono::TimeZone;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 6, 12, 30, 0).unwrap()
    }

    fn sample_project() -> Project {
        Project {
            id: "p1".to_string(),
            title: "Kitchen".to_string(),
            description: Some("Remodel".to_string()),
            created_at: Some(fixed_now()),
            created_by: Some("u-1".to_string()),
            tasks: vec![Task::new("1", "Tiles")],
            status: Default::default(),
        }
    }

    #[test]
    fn empty_collection_is_an_error() {
        assert!(matches!(build_backup(&[], fixed_now()), Err(ExportError::Empty)));
    }

    #[test]
    fn bundle_reflects_current_state() {
        let artifact = build_backup(&[sample_project()], fixed_now()).unwrap();
        assert_eq!(artifact.filename, "backup_2026-08-06.json");

        let bundle: ExportBundle = serde_json::from_str(&artifact.contents).unwrap();
        assert_eq!(bundle.kind, BACKUP_KIND);
        assert_eq!(bundle.export_date, fixed_now());
        assert_eq!(bundle.projects.len(), 1);
        assert_eq!(bundle.projects[0], sample_project());

        // Wire fields are camelCase with an ISO-8601 export date
        let raw: serde_json::Value = serde_json::from_str(&artifact.contents).unwrap();
        assert!(raw["exportDate"].as_str().unwrap().starts_with("2026-08-06T12:30:00"));
        assert_eq!(raw["type"], BACKUP_KIND);
    }

    #[test]
    fn artifact_round_trips_through_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = build_backup(&[sample_project()], fixed_now()).unwrap();

        let path = dir.path().join(&artifact.filename);
        std::fs::write(&path, &artifact.contents).unwrap();

        let read_back: ExportBundle =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(read_back.projects[0].id, "p1");
    }
}
