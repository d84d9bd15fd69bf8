#![forbid(unsafe_code)]

//! Layout history.
//!
//! The planner undoes by snapshot rather than by command: every edit pushes
//! the whole resulting layout, and undo/redo restore a stored snapshot
//! verbatim. See [`SnapshotStore`].

pub mod snapshot_store;

pub use snapshot_store::{HistoryConfig, SnapshotStore};
