//! Defines the custom error type for the `core` module.

use std::path::PathBuf;
use thiserror::Error;

use super::{FileId, FileStatus, Transition};

/// The primary error type for the `core` module.
///
/// Every variant is scoped to the smallest unit it affects. Only
/// `NoFilesSelected` is reported for a whole analysis pass; everything else
/// belongs to a single file.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Analysis was requested while the registry holds no files.
    #[error("No files selected for analysis")]
    NoFilesSelected,

    /// Analysis was requested while a previous pass is still running.
    #[error("An analysis pass is already in progress")]
    AnalysisInProgress,

    /// The local bytes of a file could not be turned into a preview.
    #[error("Preview unavailable for {path}: {source}")]
    PreviewUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The inference endpoint rejected a file or could not be reached.
    #[error("Analysis failed for {file}: {reason}")]
    AnalysisFailed { file: String, reason: String },

    /// An operation referenced an id that is no longer in the registry.
    #[error("No file with id {0} in the registry")]
    ItemNotFound(FileId),

    /// A status change that the lifecycle table does not allow.
    #[error("Cannot apply {transition} to {id} while it is {from}")]
    InvalidTransition {
        id: FileId,
        from: FileStatus,
        transition: &'static str,
    },

    /// Represents an I/O error, typically from file system operations.
    #[error("I/O error for path {1}: {0}")]
    Io(#[source] std::io::Error, PathBuf),

    /// A background task panicked or was cancelled before reporting back.
    #[error("Task join error: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl CoreError {
    pub(crate) fn invalid(id: &FileId, from: FileStatus, transition: &Transition) -> Self {
        CoreError::InvalidTransition {
            id: id.clone(),
            from,
            transition: transition.name(),
        }
    }

    /// `true` for errors that callers treat as a silent no-op.
    pub fn is_item_not_found(&self) -> bool {
        matches!(self, CoreError::ItemNotFound(_))
    }
}
