//! Board file format: one column per line, `id: Title` with an optional
//! trailing `wip=N`. Blank lines and `#` comments are ignored.

use crate::types::{is_valid_column_id, split_wip_suffix, BoardConfig, Column, ColumnId};
use std::collections::HashSet;

/// A line of the board file that was ignored while decoding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedLine {
    pub line_number: usize,
    pub reason: String,
}

/// Encode the board, one line per column in board order
pub fn encode_board(board: &BoardConfig) -> String {
    let mut contents = String::new();
    for column in &board.columns {
        if column.has_wip_limit() {
            contents.push_str(&format!(
                "{}: {} wip={}\n",
                column.id, column.title, column.wip_limit
            ));
        } else {
            contents.push_str(&format!("{}: {}\n", column.id, column.title));
        }
    }
    contents
}

/// Decode the board file. Lines with an invalid id, or an id already seen,
/// are skipped and reported.
pub fn decode_board(contents: &str) -> (BoardConfig, Vec<SkippedLine>) {
    let mut columns = Vec::new();
    let mut skipped = Vec::new();
    let mut seen = HashSet::new();

    for (index, line) in contents.lines().enumerate() {
        let line_number = index + 1;
        match parse_line(line) {
            Ok(None) => {}
            Ok(Some(column)) => {
                if seen.insert(column.id.clone()) {
                    columns.push(column);
                } else {
                    skipped.push(SkippedLine {
                        line_number,
                        reason: format!("duplicate column id '{}'", column.id),
                    });
                }
            }
            Err(reason) => skipped.push(SkippedLine {
                line_number,
                reason,
            }),
        }
    }

    (BoardConfig::new(columns), skipped)
}

fn parse_line(line: &str) -> Result<Option<Column>, String> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Ok(None);
    }

    let (id, rest) = match trimmed.split_once(':') {
        Some((left, right)) => (left.trim(), right.trim()),
        None => (trimmed, trimmed),
    };
    if !is_valid_column_id(id) {
        return Err(format!("invalid column id '{}'", id));
    }

    let (title, wip_limit) = split_wip_suffix(rest).unwrap_or((rest, 0));

    let column = Column::new(ColumnId::from_string(id)).with_wip_limit(wip_limit);
    Ok(Some(if title.is_empty() {
        column
    } else {
        column.with_title(title)
    }))
}
