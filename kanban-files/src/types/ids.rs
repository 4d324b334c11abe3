//! Identifier newtypes

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a column; doubles as the folder name on disk.
///
/// Construction is unchecked so that configs received from clients can be
/// carried around and reported back; [`ColumnId::is_valid`] enforces the
/// `[a-z0-9_-]+` pattern before anything touches the filesystem.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColumnId(String);

impl ColumnId {
    pub fn from_string(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True when the id is non-empty and only uses `[a-z0-9_-]`
    pub fn is_valid(&self) -> bool {
        is_valid_column_id(&self.0)
    }
}

/// Identifier of a task; the file stem of `<id>.md`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    pub fn from_string(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True when the id is non-empty and only uses `[a-z0-9-]`
    pub fn is_valid(&self) -> bool {
        is_valid_task_id(&self.0)
    }
}

/// Column ids: `[a-z0-9_-]+`
pub fn is_valid_column_id(id: &str) -> bool {
    !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-')
}

/// Task ids: `[a-z0-9-]+`
pub fn is_valid_task_id(id: &str) -> bool {
    !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

macro_rules! impl_id_conversions {
    ($ty:ty) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $ty {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $ty {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl From<String> for $ty {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl PartialEq<str> for $ty {
            fn eq(&self, other: &str) -> bool {
                self.0 == other
            }
        }

        impl PartialEq<&str> for $ty {
            fn eq(&self, other: &&str) -> bool {
                self.0 == *other
            }
        }
    };
}

impl_id_conversions!(ColumnId);
impl_id_conversions!(TaskId);
