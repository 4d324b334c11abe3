//! Startup recovery of the task folders

use super::{scan, TaskStore};
use crate::context::remove_file_if_exists;
use crate::error::Result;
use crate::types::BoardConfig;
use serde::Serialize;

/// What [`TaskStore::recover`] repaired
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RecoveryReport {
    pub temp_files_removed: usize,
    pub duplicates_removed: usize,
    pub headers_rewritten: usize,
}

impl RecoveryReport {
    pub fn is_clean(&self) -> bool {
        *self == Self::default()
    }
}

impl TaskStore {
    /// Repair what an interrupted write or move left behind.
    ///
    /// Must run under the mutation lock. Removes temp files, drops the older
    /// copy of a duplicated id and rewrites headers whose `status` does not
    /// name their folder. `updated_at` is left alone.
    pub async fn recover(&self, board: &BoardConfig) -> Result<RecoveryReport> {
        let mut report = RecoveryReport::default();

        for folder in board.column_ids() {
            for path in self.ctx.list_temp_files(folder).await? {
                if remove_file_if_exists(&path).await? {
                    tracing::info!("Removed leftover temp file {}", path.display());
                    report.temp_files_removed += 1;
                }
            }
        }

        let scan = scan::scan(&self.ctx, board).await?;

        for stale in &scan.stale_copies {
            if self.ctx.remove_task_file(&stale.folder, &stale.id).await? {
                tracing::info!("Removed older copy of {} from {}", stale.id, stale.folder);
                report.duplicates_removed += 1;
            }
        }

        for task in &scan.stale_headers {
            self.ctx.write_task(task).await?;
            tracing::info!("Rewrote status of {} to {}", task.id, task.folder);
            report.headers_rewritten += 1;
        }

        Ok(report)
    }
}
