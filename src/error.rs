use std::path::PathBuf;

use thiserror::Error;

use crate::api::ApiError;
use crate::state_machine::SessionState;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error on store {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("store lock poisoned")]
    Poisoned,
}

#[derive(Debug, Error)]
pub enum StateError {
    #[error("cannot leave terminal state {from} for {to}; only a new login may follow")]
    TerminalState { from: SessionState, to: SessionState },

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Failures of a submission attempt.
///
/// Only `Setup` and a `Network` error that survived the fallback ever reach
/// the user; soft collaborator failures are absorbed where they happen.
#[derive(Debug, Error)]
pub enum SubmitError {
    /// No workspace or source folder to package. Aborts before any network call.
    #[error("Setup error: {0}")]
    Setup(String),

    #[error("Network error: {0}")]
    Network(#[from] ApiError),

    #[error("Score evaluation failed: {0}")]
    Score(String),

    #[error("Archive error: {0}")]
    Archive(#[from] std::io::Error),
}

/// How a submission was triggered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum SubmitMode {
    /// The candidate asked to submit.
    Manual,
    /// The timer ran out.
    Automatic,
}

impl std::fmt::Display for SubmitMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SubmitMode::Manual => write!(f, "manual"),
            SubmitMode::Automatic => write!(f, "auto"),
        }
    }
}
