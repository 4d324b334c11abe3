//! Kanban board stored as plain files, with long-poll change notification
//!
//! Every task is a small text file inside the folder of the column it sits
//! in. The board configuration is a line-oriented text file in the root.
//! Browser clients stay in sync by long-polling a version counter that
//! advances on every successful mutation.
//!
//! ## Basic Usage
//!
//! ```rust,no_run
//! use kanban_files::{KanbanStore, NewTask, StoreSettings};
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let settings = StoreSettings::new("./kanban_data").with_create_missing(true);
//! let store = KanbanStore::open(settings).await?;
//!
//! let task = store
//!     .create_task(NewTask::new("Draft onboarding flow").with_status("backlog"))
//!     .await?;
//! store.move_task(&task.id, &"done".into()).await?;
//!
//! // Blocks until another mutation happens or the timeout elapses
//! let outcome = store
//!     .wait_for_change(store.version(), Some(Duration::from_secs(5)))
//!     .await;
//! println!("version {} changed {}", outcome.version, outcome.changed);
//! # Ok(())
//! # }
//! ```
//!
//! ## Storage Structure
//!
//! ```text
//! kanban_data/
//! ├── .workspace-kanban       # Board: one `id: Title [wip=N]` line per column
//! ├── .kanban.lock            # Advisory lock held during mutations
//! ├── backlog/
//! │   └── {id}.md             # Task: header lines, blank line, description
//! ├── planned/
//! ├── in_progress/
//! └── done/
//! ```
//!
//! The folder a file sits in is authoritative. The `status` header is a copy
//! kept in step on every write and repaired at startup when a file was moved
//! by hand.

pub mod board;
pub mod codec;
mod context;
mod error;
mod feed;
mod settings;
mod store;
pub mod task;
pub mod types;

pub use board::{BoardConfigManager, ReconciliationPlan, SaveOutcome};
pub use context::{KanbanContext, KanbanLock};
pub use error::{KanbanError, Result};
pub use feed::{ChangeFeed, WaitOutcome};
pub use settings::{StoreSettings, UiDefaults};
pub use store::KanbanStore;
pub use task::{RecoveryReport, TaskStore};
pub use types::{
    BoardConfig, Column, ColumnId, ConflictResolution, FolderConflict, NewTask, ParseWarning,
    ResolutionOption, Task, TaskId, TaskListing, TaskPatch,
};
