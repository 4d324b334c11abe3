//! Core types for the task store

mod board;
mod ids;
mod task;

// Re-export all types
pub use board::{BoardConfig, Column, ConflictResolution, FolderConflict, ResolutionOption};
pub(crate) use board::split_wip_suffix;
pub use ids::{is_valid_column_id, is_valid_task_id, ColumnId, TaskId};
pub use task::{NewTask, ParseWarning, Task, TaskListing, TaskPatch};
