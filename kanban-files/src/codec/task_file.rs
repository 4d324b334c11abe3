//! Task file format: `key: value` header lines, a blank line, then the
//! description body.
//!
//! ```text
//! creator: ana
//! assigned_to: sam
//! created_at: 2024-05-01T09:30:00Z
//! updated_at: 2024-05-02T14:00:00Z
//! status: backlog
//! tags: ux, onboarding
//! title: Draft onboarding flow
//!
//! Free text description.
//! ```

use crate::types::{ColumnId, Task, TaskId};
use chrono::{DateTime, SecondsFormat, Utc};
use std::collections::HashMap;
use thiserror::Error;

/// Why a task file could not be decoded
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("missing required header field '{0}'")]
    MissingField(&'static str),

    #[error("invalid timestamp in '{field}': {value}")]
    InvalidTimestamp { field: &'static str, value: String },
}

/// Render a timestamp the way it is stored in headers
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

fn parse_timestamp(field: &'static str, value: &str) -> Result<DateTime<Utc>, DecodeError> {
    DateTime::parse_from_rfc3339(value)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|_| DecodeError::InvalidTimestamp {
            field,
            value: value.to_string(),
        })
}

/// Encode a task into file content
pub fn encode_task(task: &Task) -> String {
    format!(
        "creator: {}\nassigned_to: {}\ncreated_at: {}\nupdated_at: {}\nstatus: {}\ntags: {}\ntitle: {}\n\n{}\n",
        task.creator.as_deref().unwrap_or_default(),
        task.assigned_to.as_deref().unwrap_or_default(),
        format_timestamp(&task.created_at),
        format_timestamp(&task.updated_at),
        task.status,
        task.tags.join(", "),
        task.title,
        task.description
    )
}

/// Decode file content found at `<folder>/<id>.md`.
///
/// `status` comes from the header when present and falls back to `folder`;
/// callers compare the two to detect a file whose header went stale.
pub fn decode_task(id: TaskId, folder: ColumnId, content: &str) -> Result<Task, DecodeError> {
    let mut header: HashMap<&str, &str> = HashMap::new();
    let mut body: Vec<&str> = Vec::new();
    let mut in_body = false;

    for line in content.lines() {
        if in_body {
            body.push(line);
        } else if line.trim().is_empty() {
            in_body = true;
        } else if let Some((key, value)) = line.split_once(':') {
            header.insert(key.trim(), value.trim());
        }
    }

    let title = header
        .get("title")
        .ok_or(DecodeError::MissingField("title"))?;
    let created_at = header
        .get("created_at")
        .ok_or(DecodeError::MissingField("created_at"))
        .and_then(|v| parse_timestamp("created_at", v))?;
    let updated_at = header
        .get("updated_at")
        .ok_or(DecodeError::MissingField("updated_at"))
        .and_then(|v| parse_timestamp("updated_at", v))?;

    let optional = |key: &str| {
        header
            .get(key)
            .map(|v| v.to_string())
            .filter(|v| !v.is_empty())
    };

    let tags = header
        .get("tags")
        .map(|v| {
            v.split(',')
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .collect()
        })
        .unwrap_or_default();

    let status = header
        .get("status")
        .filter(|v| !v.is_empty())
        .map(|v| ColumnId::from_string(*v))
        .unwrap_or_else(|| folder.clone());

    Ok(Task {
        id,
        title: title.to_string(),
        description: body.join("\n"),
        creator: optional("creator"),
        assigned_to: optional("assigned_to"),
        tags,
        created_at,
        updated_at,
        status,
        folder,
    })
}
