#![forbid(unsafe_code)]

//! Runtime around the Case Planner layout engine.
//!
//! [`PlannerSession`] owns the working layout, the product catalog and the
//! saved layouts, and is the only thing that mutates them. Around it:
//!
//! - [`undo`]: bounded snapshot history
//! - [`policy`]: which edits need the user's confirmation
//! - [`persistence`]: storage backends and versioned load/migrate
//! - [`saved`]: named saved layouts
//! - [`case_file`]: `.fishcase` export and validated import
//! - [`share`]: publishing under short share codes

pub mod case_file;
pub mod error;
pub mod persistence;
pub mod policy;
pub mod saved;
pub mod session;
pub mod share;
pub mod undo;

pub use case_file::{CaseFile, CaseRecord};
pub use error::{CaseFileError, SessionError, SessionResult, ShareError, StorageError};
pub use persistence::{FileStorage, MemoryStorage, PersistedState, StorageBackend, StorageKeys};
pub use policy::{ConfirmPolicy, Decision, PendingAction};
pub use saved::{SavedLayout, SavedLayouts};
pub use session::{PlannerSession, SessionConfig};
pub use share::{MemoryShareBackend, NewShare, Page, ShareBackend, ShareCode, SharedLayout};
pub use undo::{HistoryConfig, SnapshotStore};
