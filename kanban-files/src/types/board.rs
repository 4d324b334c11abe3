//! Board-level types: BoardConfig, Column, and the conflict payloads used
//! when a config change would orphan tasks

use super::ids::ColumnId;
use crate::error::{KanbanError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A column defines a workflow stage and names the folder holding its tasks
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Column {
    pub id: ColumnId,
    #[serde(default)]
    pub title: String,
    /// Advisory task limit; `0` means no limit
    #[serde(default)]
    pub wip_limit: u32,
}

impl Column {
    /// Create a column whose title defaults to its id
    pub fn new(id: impl Into<ColumnId>) -> Self {
        let id = id.into();
        Self {
            title: id.to_string(),
            id,
            wip_limit: 0,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_wip_limit(mut self, wip_limit: u32) -> Self {
        self.wip_limit = wip_limit;
        self
    }

    /// True when the column carries a WIP limit
    pub fn has_wip_limit(&self) -> bool {
        self.wip_limit > 0
    }
}

/// Ordered list of columns; order is display order and survives persistence
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct BoardConfig {
    pub columns: Vec<Column>,
}

impl BoardConfig {
    pub fn new(columns: Vec<Column>) -> Self {
        Self { columns }
    }

    /// The board written when none exists yet
    pub fn default_board() -> Self {
        Self::new(vec![
            Column::new("backlog").with_title("Backlog"),
            Column::new("planned").with_title("Planned"),
            Column::new("in_progress").with_title("In Progress"),
            Column::new("done").with_title("Done"),
        ])
    }

    pub fn find_column(&self, id: &ColumnId) -> Option<&Column> {
        self.columns.iter().find(|c| &c.id == id)
    }

    pub fn contains(&self, id: &ColumnId) -> bool {
        self.find_column(id).is_some()
    }

    pub fn first_column(&self) -> Option<&Column> {
        self.columns.first()
    }

    pub fn column_ids(&self) -> impl Iterator<Item = &ColumnId> {
        self.columns.iter().map(|c| &c.id)
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Check the pattern and uniqueness of every column id
    pub fn validate(&self) -> Result<()> {
        if self.columns.is_empty() {
            return Err(KanbanError::EmptyBoard);
        }
        let mut seen = HashSet::new();
        for column in &self.columns {
            if !column.id.is_valid() {
                return Err(KanbanError::InvalidColumnId {
                    id: column.id.to_string(),
                });
            }
            if !seen.insert(&column.id) {
                return Err(KanbanError::DuplicateColumnId {
                    id: column.id.to_string(),
                });
            }
            // Would be read back as a WIP limit
            if split_wip_suffix(&column.title).is_some() {
                return Err(KanbanError::InvalidColumnTitle {
                    id: column.id.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Copy with blank titles replaced by the column id and titles trimmed
    pub fn normalized(&self) -> Self {
        let columns = self
            .columns
            .iter()
            .map(|c| {
                let title = c.title.trim();
                Column {
                    id: c.id.clone(),
                    title: if title.is_empty() {
                        c.id.to_string()
                    } else {
                        title.replace(['\r', '\n'], " ")
                    },
                    wip_limit: c.wip_limit,
                }
            })
            .collect();
        Self { columns }
    }
}

/// Split a trailing `wip=N` token off a column title.
///
/// Only the last whitespace-separated word counts, and only when `N` is all
/// digits and fits a `u32`.
pub(crate) fn split_wip_suffix(title: &str) -> Option<(&str, u32)> {
    let trimmed = title.trim_end();
    let (head, last) = match trimmed.rsplit_once(char::is_whitespace) {
        Some((head, last)) => (head.trim_end(), last),
        None => ("", trimmed),
    };
    let digits = last.strip_prefix("wip=")?;
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok().map(|limit| (head, limit))
}

/// How the caller wants tasks in removed columns handled
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ConflictResolution {
    /// Delete every task left in the removed columns
    DeleteTasks,
    /// Move the tasks into a column of the new board
    MoveTasksTo { destination: ColumnId },
    /// Leave the board and the tasks untouched
    Abort,
}

impl ConflictResolution {
    pub fn move_to(destination: impl Into<ColumnId>) -> Self {
        Self::MoveTasksTo {
            destination: destination.into(),
        }
    }
}

/// A resolution the caller may pick for a [`FolderConflict`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ResolutionOption {
    DeleteTasks,
    MoveTasksTo { destinations: Vec<ColumnId> },
    Abort,
}

/// A removed column that still holds tasks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderConflict {
    pub folder_id: ColumnId,
    pub task_count: usize,
    pub options: Vec<ResolutionOption>,
}

impl FolderConflict {
    pub fn new(folder_id: ColumnId, task_count: usize) -> Self {
        Self {
            folder_id,
            task_count,
            options: vec![
                ResolutionOption::DeleteTasks,
                ResolutionOption::MoveTasksTo {
                    destinations: Vec::new(),
                },
                ResolutionOption::Abort,
            ],
        }
    }

    /// Fill in the columns a `MoveTasksTo` resolution may target
    pub fn with_destinations(mut self, destinations: Vec<ColumnId>) -> Self {
        for option in &mut self.options {
            if let ResolutionOption::MoveTasksTo { destinations: d } = option {
                *d = destinations.clone();
            }
        }
        self
    }
}
