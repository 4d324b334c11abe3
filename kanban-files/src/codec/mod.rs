//! On-disk formats for task files and the board file.
//!
//! Pure string transforms; all I/O lives in [`crate::KanbanContext`].

mod board_file;
mod slug;
mod task_file;

pub use board_file::{decode_board, encode_board, SkippedLine};
pub use slug::{slugify, unique_slug};
pub use task_file::{decode_task, encode_task, format_timestamp, DecodeError};
