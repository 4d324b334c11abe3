//! Startup configuration for a store

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Settings a host passes to [`crate::KanbanStore::open`].
///
/// Missing fields take their defaults when deserialized, so a host can load
/// a partial value from whatever source it reads configuration from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    /// Directory holding the board file and the column folders
    pub root: PathBuf,
    /// Create the root and a default board when they are missing
    pub create_missing: bool,
    /// Long-poll timeout when the caller does not ask for one
    pub long_poll_timeout_secs: u64,
    /// Upper bound for caller-supplied long-poll timeouts
    pub max_long_poll_timeout_secs: u64,
    pub show_task_editor: bool,
    pub show_board_editor: bool,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            root: PathBuf::from("./kanban_data"),
            create_missing: false,
            long_poll_timeout_secs: 25,
            max_long_poll_timeout_secs: 60,
            show_task_editor: true,
            show_board_editor: false,
        }
    }
}

impl StoreSettings {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }

    pub fn with_create_missing(mut self, create_missing: bool) -> Self {
        self.create_missing = create_missing;
        self
    }

    pub fn with_long_poll_timeout(mut self, timeout: Duration) -> Self {
        self.long_poll_timeout_secs = timeout.as_secs();
        self
    }

    pub fn with_max_long_poll_timeout(mut self, timeout: Duration) -> Self {
        self.max_long_poll_timeout_secs = timeout.as_secs();
        self
    }

    pub fn with_show_task_editor(mut self, show: bool) -> Self {
        self.show_task_editor = show;
        self
    }

    pub fn with_show_board_editor(mut self, show: bool) -> Self {
        self.show_board_editor = show;
        self
    }

    pub fn long_poll_timeout(&self) -> Duration {
        Duration::from_secs(self.long_poll_timeout_secs)
    }

    pub fn max_long_poll_timeout(&self) -> Duration {
        Duration::from_secs(self.max_long_poll_timeout_secs)
    }

    /// The requested timeout, defaulted and clamped to the maximum
    pub fn effective_timeout(&self, requested: Option<Duration>) -> Duration {
        requested
            .unwrap_or_else(|| self.long_poll_timeout())
            .min(self.max_long_poll_timeout())
    }

    pub fn ui_defaults(&self) -> UiDefaults {
        UiDefaults {
            show_task_editor: self.show_task_editor,
            show_board_editor: self.show_board_editor,
        }
    }
}

/// Initial visibility of the editor panels in the client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UiDefaults {
    pub show_task_editor: bool,
    pub show_board_editor: bool,
}
