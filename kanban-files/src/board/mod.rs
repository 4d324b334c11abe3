//! BoardConfigManager - the board file and the column folders it implies
//!
//! A board save is applied in a fixed order so that an interruption never
//! loses a task: new folders are created, tasks of removed columns are moved
//! or deleted, the board file is replaced, and only then are the removed
//! folders deleted.

mod reconcile;

pub use reconcile::ReconciliationPlan;

use crate::context::KanbanContext;
use crate::error::{KanbanError, Result};
use crate::task::TaskStore;
use crate::types::{BoardConfig, ColumnId, ConflictResolution, FolderConflict};
use serde::Serialize;

/// Result of [`BoardConfigManager::save`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SaveOutcome {
    /// False when the caller aborted; nothing on disk changed
    pub applied: bool,
    /// The board now in effect
    pub board: BoardConfig,
    pub created: Vec<ColumnId>,
    pub removed: Vec<ColumnId>,
    pub tasks_moved: usize,
    pub tasks_deleted: usize,
}

impl SaveOutcome {
    fn aborted(board: BoardConfig) -> Self {
        Self {
            applied: false,
            board,
            created: Vec::new(),
            removed: Vec::new(),
            tasks_moved: 0,
            tasks_deleted: 0,
        }
    }
}

/// Loads, validates and saves the board configuration
#[derive(Debug, Clone)]
pub struct BoardConfigManager {
    ctx: KanbanContext,
}

impl BoardConfigManager {
    pub fn new(ctx: KanbanContext) -> Self {
        Self { ctx }
    }

    /// Board written when a store is created from scratch
    pub fn default_config() -> BoardConfig {
        BoardConfig::default_board()
    }

    /// Read the board file
    pub async fn load(&self) -> Result<BoardConfig> {
        self.ctx.read_board().await
    }

    /// Validate and write a board without touching any folder
    pub async fn write(&self, board: &BoardConfig) -> Result<BoardConfig> {
        let board = board.normalized();
        board.validate()?;
        self.ctx.write_board(&board).await?;
        Ok(board)
    }

    /// Create the folder of every configured column; returns those created
    pub async fn ensure_folders(&self, board: &BoardConfig) -> Result<Vec<ColumnId>> {
        let mut created = Vec::new();
        for folder in board.column_ids() {
            if self.ctx.create_folder(folder).await? {
                tracing::info!("Created folder {}", folder);
                created.push(folder.clone());
            }
        }
        Ok(created)
    }

    /// Visible directories under the root that are not configured columns
    pub async fn stray_folders(&self, board: &BoardConfig) -> Result<Vec<ColumnId>> {
        Ok(self
            .ctx
            .list_folders()
            .await?
            .into_iter()
            .filter(|folder| !board.contains(folder))
            .collect())
    }

    /// Plan moving from the `old` board to `new`; `Conflict` when a removed
    /// column still holds tasks
    pub async fn reconcile(
        &self,
        tasks: &TaskStore,
        old: &BoardConfig,
        new: &BoardConfig,
    ) -> Result<ReconciliationPlan> {
        self.plan(tasks, old.column_ids(), new).await?.into_result()
    }

    /// Replace the board with `new`.
    ///
    /// Without a resolution, removing a column that still holds tasks fails
    /// with `Conflict` and changes nothing. `Abort` leaves everything as it
    /// was and reports `applied = false`.
    pub async fn save(
        &self,
        tasks: &TaskStore,
        new: &BoardConfig,
        resolution: Option<ConflictResolution>,
    ) -> Result<SaveOutcome> {
        let new = new.normalized();
        new.validate()?;

        let old = self.load().await?;
        let plan = self.plan(tasks, old.column_ids(), &new).await?;
        plan.check_resolution(&new, resolution.as_ref())?;

        if plan.has_conflicts() && resolution == Some(ConflictResolution::Abort) {
            tracing::info!("Board save aborted; {} column(s) still hold tasks", plan.blocked.len());
            return Ok(SaveOutcome::aborted(old));
        }

        let created = self.ensure_folders(&new).await?;
        for folder in &plan.added {
            let renamed = tasks.adopt_folder(&new, folder).await?;
            if renamed > 0 {
                tracing::info!("Renamed {} task(s) in {} to keep ids unique", renamed, folder);
            }
        }
        let (tasks_moved, tasks_deleted) =
            resolve_blocked(tasks, &new, &plan.blocked, resolution.as_ref()).await?;

        self.ctx.write_board(&new).await?;

        let mut removed = Vec::new();
        for folder in plan.removed() {
            self.ctx.remove_folder(folder).await?;
            tracing::info!("Removed folder {}", folder);
            removed.push(folder.clone());
        }

        tracing::info!(
            "Saved board with {} column(s): {} created, {} removed",
            new.columns.len(),
            created.len(),
            removed.len()
        );

        Ok(SaveOutcome {
            applied: true,
            board: new,
            created,
            removed,
            tasks_moved,
            tasks_deleted,
        })
    }

    /// Deal with folders that are on disk but not on the board.
    ///
    /// Empty ones are removed. Ones holding tasks are `Conflict` unless a
    /// resolution is given; `Abort` leaves them in place. Returns the
    /// folders removed.
    pub async fn sweep_stray_folders(
        &self,
        tasks: &TaskStore,
        board: &BoardConfig,
        resolution: Option<&ConflictResolution>,
    ) -> Result<Vec<ColumnId>> {
        let strays = self.stray_folders(board).await?;
        if strays.is_empty() {
            return Ok(Vec::new());
        }

        let plan = self.plan(tasks, strays.iter(), board).await?;
        plan.check_resolution(board, resolution)?;

        let mut removed = Vec::new();
        for folder in &plan.removed_empty {
            self.ctx.remove_folder(folder).await?;
            tracing::info!("Removed stray folder {}", folder);
            removed.push(folder.clone());
        }

        if !plan.has_conflicts() || resolution == Some(&ConflictResolution::Abort) {
            for conflict in &plan.blocked {
                tracing::warn!(
                    "Leaving stray folder {} with {} task(s) in place",
                    conflict.folder_id,
                    conflict.task_count
                );
            }
            return Ok(removed);
        }

        resolve_blocked(tasks, board, &plan.blocked, resolution).await?;
        for conflict in &plan.blocked {
            self.ctx.remove_folder(&conflict.folder_id).await?;
            tracing::info!("Removed stray folder {}", conflict.folder_id);
            removed.push(conflict.folder_id.clone());
        }

        Ok(removed)
    }

    /// Plan against the given existing folders; only those present on disk
    /// are counted
    async fn plan<'a>(
        &self,
        tasks: &TaskStore,
        existing: impl Iterator<Item = &'a ColumnId>,
        new: &BoardConfig,
    ) -> Result<ReconciliationPlan> {
        let mut counted = Vec::new();
        for folder in existing {
            if self.ctx.folder_exists(folder) {
                counted.push((folder.clone(), tasks.count_in_folder(folder).await?));
            }
        }
        Ok(reconcile::plan(&counted, new))
    }
}

/// Apply the resolution to every blocked folder; returns (moved, deleted)
async fn resolve_blocked(
    tasks: &TaskStore,
    board: &BoardConfig,
    blocked: &[FolderConflict],
    resolution: Option<&ConflictResolution>,
) -> Result<(usize, usize)> {
    let mut moved = 0;
    let mut deleted = 0;

    for conflict in blocked {
        match resolution {
            Some(ConflictResolution::MoveTasksTo { destination }) => {
                let n = tasks
                    .relocate_folder(board, &conflict.folder_id, destination)
                    .await?;
                tracing::info!("Moved {} task(s) from {} to {}", n, conflict.folder_id, destination);
                moved += n;
            }
            Some(ConflictResolution::DeleteTasks) => {
                let n = tasks.purge_folder(&conflict.folder_id).await?;
                tracing::info!("Deleted {} task(s) from {}", n, conflict.folder_id);
                deleted += n;
            }
            Some(ConflictResolution::Abort) | None => {
                return Err(KanbanError::Conflict {
                    conflicts: blocked.to_vec(),
                });
            }
        }
    }

    Ok((moved, deleted))
}
