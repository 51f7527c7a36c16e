pub mod config;
pub mod export;
pub mod store;
pub mod sync;

pub use config::{Identity, ScopeMode, ScopePath, StoreConfig};
pub use export::{ExportArtifact, ExportBundle};
pub use store::{MemoryStore, NewProject, Project, ProjectStore, RestStore, StoreError, Task};
pub use sync::{ActiveView, Board, BoardManager, LoadPhase, SyncError};
