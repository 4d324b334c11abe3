//! Diffing a board change against the folders on disk

use crate::error::{KanbanError, Result};
use crate::types::{BoardConfig, ColumnId, ConflictResolution, FolderConflict};
use serde::Serialize;

/// Folder changes a board save implies
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconciliationPlan {
    /// Columns of the new board without a folder yet
    pub added: Vec<ColumnId>,
    /// Removed columns whose folder holds no task
    pub removed_empty: Vec<ColumnId>,
    /// Removed columns whose folder still holds tasks
    pub blocked: Vec<FolderConflict>,
}

impl ReconciliationPlan {
    pub fn has_conflicts(&self) -> bool {
        !self.blocked.is_empty()
    }

    /// Every folder that disappears once the plan is applied
    pub fn removed(&self) -> impl Iterator<Item = &ColumnId> {
        self.removed_empty
            .iter()
            .chain(self.blocked.iter().map(|c| &c.folder_id))
    }

    /// The plan as a `Conflict` error when a resolution is required
    pub fn into_result(self) -> Result<Self> {
        if self.has_conflicts() {
            Err(KanbanError::Conflict {
                conflicts: self.blocked,
            })
        } else {
            Ok(self)
        }
    }

    /// Check a resolution against the new board before anything is applied
    pub(crate) fn check_resolution(
        &self,
        new: &BoardConfig,
        resolution: Option<&ConflictResolution>,
    ) -> Result<()> {
        if let Some(ConflictResolution::MoveTasksTo { destination }) = resolution {
            if !new.contains(destination) {
                return Err(KanbanError::InvalidDestination {
                    id: destination.to_string(),
                });
            }
        }
        match resolution {
            None if self.has_conflicts() => Err(KanbanError::Conflict {
                conflicts: self.blocked.clone(),
            }),
            _ => Ok(()),
        }
    }
}

/// Build the plan from the folders that currently exist (`existing`, with
/// their task counts) and the target board.
pub(crate) fn plan(existing: &[(ColumnId, usize)], new: &BoardConfig) -> ReconciliationPlan {
    let mut plan = ReconciliationPlan::default();
    let destinations: Vec<ColumnId> = new.column_ids().cloned().collect();

    for column in new.column_ids() {
        if !existing.iter().any(|(id, _)| id == column) {
            plan.added.push(column.clone());
        }
    }

    for (folder, task_count) in existing {
        if new.contains(folder) {
            continue;
        }
        if *task_count == 0 {
            plan.removed_empty.push(folder.clone());
        } else {
            plan.blocked.push(
                FolderConflict::new(folder.clone(), *task_count)
                    .with_destinations(destinations.clone()),
            );
        }
    }

    plan
}
