#![forbid(unsafe_code)]

//! Error types for the planner runtime.

use caseplan_core::LayoutError;
use thiserror::Error;

/// Failures of a [`StorageBackend`](crate::persistence::StorageBackend).
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("storage corruption: {message}")]
    Corruption { message: String },

    #[error("storage lock poisoned")]
    Poisoned,
}

/// Rejections from `.fishcase` import. The message is shown to the user
/// as-is.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CaseFileError {
    #[error("Could not parse file. Make sure it's a valid .fishcase file.")]
    Parse,

    #[error("{0}")]
    Invalid(String),
}

impl CaseFileError {
    #[must_use]
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid(message.into())
    }
}

/// Failures of the sharing collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShareError {
    #[error("No case found with code \"{code}\".")]
    NotFound { code: String },

    #[error("Failed to generate a unique code. Please try again.")]
    CodeExhausted,

    #[error("share code {code} is already taken")]
    CodeTaken { code: String },

    #[error("Sharing is not configured.")]
    Unavailable,

    #[error("{message}")]
    Backend { message: String },
}

/// Errors surfaced by [`PlannerSession`](crate::session::PlannerSession).
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Layout(#[from] LayoutError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    CaseFile(#[from] CaseFileError),

    #[error(transparent)]
    Share(#[from] ShareError),

    #[error("no saved layout at index {index}")]
    UnknownSavedLayout { index: usize },

    #[error("layout name must not be empty")]
    EmptyName,
}

pub type SessionResult<T> = std::result::Result<T, SessionError>;
