//! Task types: Task, the create/update inputs, and listing results

use super::board::BoardConfig;
use super::ids::{ColumnId, TaskId};
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// A task/card on the board, stored as `<folder>/<id>.md`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub creator: Option<String>,
    #[serde(default)]
    pub assigned_to: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Persisted copy of `folder`
    pub status: ColumnId,
    /// Column whose folder contains the file
    pub folder: ColumnId,
}

impl Task {
    /// Create a task placed in `folder`, created and updated at `now`
    pub fn new(
        id: TaskId,
        title: impl Into<String>,
        folder: ColumnId,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            title: single_line(&title.into()),
            description: String::new(),
            creator: None,
            assigned_to: None,
            tags: Vec::new(),
            created_at: now,
            updated_at: now,
            status: folder.clone(),
            folder,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = unix_newlines(&description.into());
        self
    }

    pub fn with_creator(mut self, creator: Option<String>) -> Self {
        self.creator = non_blank(creator);
        self
    }

    pub fn with_assigned_to(mut self, assigned_to: Option<String>) -> Self {
        self.assigned_to = non_blank(assigned_to);
        self
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = normalize_tags(tags);
        self
    }

    /// Place the task in `folder`, keeping `status` in step
    pub fn place_in(&mut self, folder: ColumnId) {
        self.status = folder.clone();
        self.folder = folder;
    }

    /// Record a mutation at `now`
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }

    /// True when the persisted status agrees with the physical folder
    pub fn is_consistent(&self) -> bool {
        self.status == self.folder
    }
}

/// Fields for creating a task
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewTask {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub creator: Option<String>,
    #[serde(default)]
    pub assigned_to: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    /// Target column; the first column when unset or blank
    #[serde(default)]
    pub status: Option<ColumnId>,
}

impl NewTask {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_creator(mut self, creator: impl Into<String>) -> Self {
        self.creator = Some(creator.into());
        self
    }

    pub fn with_assigned_to(mut self, assigned_to: impl Into<String>) -> Self {
        self.assigned_to = Some(assigned_to.into());
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = Some(tags.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_status(mut self, status: impl Into<ColumnId>) -> Self {
        self.status = Some(status.into());
        self
    }

    /// The requested column, if one was given
    pub fn requested_status(&self) -> Option<&ColumnId> {
        self.status.as_ref().filter(|s| !s.as_str().trim().is_empty())
    }
}

/// Partial update of a task's content. `status` is accepted for wire
/// compatibility but ignored: folder changes go through a move.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskPatch {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub creator: Option<String>,
    #[serde(default)]
    pub assigned_to: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub status: Option<ColumnId>,
}

impl TaskPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_creator(mut self, creator: impl Into<String>) -> Self {
        self.creator = Some(creator.into());
        self
    }

    pub fn with_assigned_to(mut self, assigned_to: impl Into<String>) -> Self {
        self.assigned_to = Some(assigned_to.into());
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = Some(tags.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_status(mut self, status: impl Into<ColumnId>) -> Self {
        self.status = Some(status.into());
        self
    }

    /// Apply the content fields to `task`
    pub fn apply_to(&self, task: &mut Task) {
        if let Some(title) = &self.title {
            task.title = single_line(title);
        }
        if let Some(description) = &self.description {
            task.description = unix_newlines(description);
        }
        if let Some(creator) = &self.creator {
            task.creator = non_blank(Some(creator.clone()));
        }
        if let Some(assigned_to) = &self.assigned_to {
            task.assigned_to = non_blank(Some(assigned_to.clone()));
        }
        if let Some(tags) = &self.tags {
            task.tags = normalize_tags(tags.clone());
        }
    }
}

/// A task file that could not be decoded and was left out of a listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseWarning {
    pub path: PathBuf,
    pub folder: ColumnId,
    pub message: String,
}

impl fmt::Display for ParseWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path.display(), self.message)
    }
}

/// Every task grouped by folder, in board order, plus non-fatal warnings
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskListing {
    pub board: BoardConfig,
    pub folders: IndexMap<ColumnId, Vec<Task>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<ParseWarning>,
}

impl TaskListing {
    /// Tasks in `folder`, empty when the folder is not listed
    pub fn tasks_in(&self, folder: &str) -> &[Task] {
        self.folders
            .iter()
            .find(|(id, _)| id.as_str() == folder)
            .map(|(_, tasks)| tasks.as_slice())
            .unwrap_or(&[])
    }

    /// Find a task by id in any folder
    pub fn find(&self, id: &TaskId) -> Option<&Task> {
        self.folders.values().flatten().find(|t| &t.id == id)
    }

    pub fn task_count(&self) -> usize {
        self.folders.values().map(Vec::len).sum()
    }
}

/// Header values live on one line and are stored trimmed
pub(crate) fn single_line(value: &str) -> String {
    value
        .replace("\r\n", " ")
        .replace(['\r', '\n'], " ")
        .trim()
        .to_string()
}

/// Descriptions are stored with `\n` line endings
pub(crate) fn unix_newlines(value: &str) -> String {
    value.replace("\r\n", "\n").replace('\r', "\n")
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| single_line(v.trim()))
        .filter(|v| !v.is_empty())
}

/// Trim tags, drop empty ones, and split on commas so the in-memory list
/// matches what a later read of the header returns
pub(crate) fn normalize_tags(tags: Vec<String>) -> Vec<String> {
    tags.iter()
        .flat_map(|t| t.split(','))
        .map(|t| single_line(t.trim()))
        .filter(|t| !t.is_empty())
        .collect()
}
