//! Client-side synchronization model: local board state kept consistent with
//! the remote project collection under optimistic mutation.

mod board;
mod manager;

pub use board::{ActiveView, Board, LoadPhase, ProjectForm};
pub use manager::{BoardManager, SyncError};
