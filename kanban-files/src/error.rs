//! Error types for the task store

use crate::types::FolderConflict;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for store operations
pub type Result<T> = std::result::Result<T, KanbanError>;

/// Errors that can occur in store operations
#[derive(Debug, Error)]
pub enum KanbanError {
    /// No board configuration file in the root
    #[error("board configuration missing at {path}")]
    ConfigMissing { path: PathBuf },

    /// The board configuration holds no usable column
    #[error("board must have at least one column")]
    EmptyBoard,

    /// Task not found
    #[error("task not found: {id}")]
    TaskNotFound { id: String },

    /// Task id does not match the slug pattern
    #[error("invalid task id: {id}")]
    InvalidTaskId { id: String },

    /// Folder is not a configured column
    #[error("invalid folder: {id}")]
    InvalidFolder { id: String },

    /// Column id does not match `[a-z0-9_-]+`
    #[error("invalid column id: {id}")]
    InvalidColumnId { id: String },

    /// Column title ends in a `wip=N` token and would not read back
    #[error("column title of {id} must not end with a wip=N token")]
    InvalidColumnTitle { id: String },

    /// Column id appears twice in one board
    #[error("duplicate column id: {id}")]
    DuplicateColumnId { id: String },

    /// Removing columns would orphan tasks; a resolution is required
    #[error("{} removed column(s) still hold tasks", conflicts.len())]
    Conflict { conflicts: Vec<FolderConflict> },

    /// Conflict resolution names a column that is not in the new board
    #[error("invalid destination column: {id}")]
    InvalidDestination { id: String },

    /// A file could not be decoded
    #[error("parse error in {path}: {message}")]
    Parse { path: PathBuf, message: String },

    /// Another process holds the store lock
    #[error("lock busy - another operation in progress")]
    LockBusy,

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl KanbanError {
    /// Create a task-not-found error
    pub fn task_not_found(id: impl Into<String>) -> Self {
        Self::TaskNotFound { id: id.into() }
    }

    /// Create an invalid folder error
    pub fn invalid_folder(id: impl Into<String>) -> Self {
        Self::InvalidFolder { id: id.into() }
    }

    /// Create a parse error
    pub fn parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Parse {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Check if this is a retryable error
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::LockBusy)
    }

    /// Check if this is a not-found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::TaskNotFound { .. })
    }

    /// HTTP status the API layer should answer with
    pub fn http_status(&self) -> u16 {
        match self {
            Self::TaskNotFound { .. } => 404,
            Self::InvalidTaskId { .. }
            | Self::InvalidFolder { .. }
            | Self::InvalidColumnId { .. }
            | Self::InvalidColumnTitle { .. }
            | Self::DuplicateColumnId { .. }
            | Self::InvalidDestination { .. }
            | Self::EmptyBoard => 400,
            Self::Conflict { .. } => 409,
            Self::ConfigMissing { .. } | Self::LockBusy => 503,
            Self::Parse { .. } | Self::Io(_) => 500,
        }
    }
}
