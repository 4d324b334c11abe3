//! KanbanStore - the operations an API layer calls
//!
//! Mutations run one at a time: the in-process write guard first, then the
//! lock file for other processes sharing the root. The board is reloaded
//! under both, so every mutation checks folders against the current
//! configuration. The version is bumped only after a mutation succeeded and
//! its locks were released.

use crate::board::{BoardConfigManager, SaveOutcome};
use crate::context::{KanbanContext, KanbanLock};
use crate::error::{KanbanError, Result};
use crate::feed::{ChangeFeed, WaitOutcome};
use crate::settings::{StoreSettings, UiDefaults};
use crate::task::{RecoveryReport, TaskStore};
use crate::types::{
    BoardConfig, ColumnId, ConflictResolution, NewTask, Task, TaskId, TaskListing, TaskPatch,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{RwLock, RwLockWriteGuard};

/// Both locks held for the length of one mutation
struct MutationGuard<'a> {
    _file: KanbanLock,
    _local: RwLockWriteGuard<'a, ()>,
}

/// File-backed task board with change notification
pub struct KanbanStore {
    settings: StoreSettings,
    ctx: KanbanContext,
    boards: BoardConfigManager,
    tasks: TaskStore,
    feed: Arc<ChangeFeed>,
    lock: RwLock<()>,
}

impl KanbanStore {
    /// Open the store described by `settings`
    pub async fn open(settings: StoreSettings) -> Result<Self> {
        Self::open_with_resolution(settings, None).await
    }

    /// Open the store, resolving stray folders that still hold tasks with
    /// `resolution`
    pub async fn open_with_resolution(
        settings: StoreSettings,
        resolution: Option<ConflictResolution>,
    ) -> Result<Self> {
        let ctx = KanbanContext::new(settings.root.clone());
        let store = Self {
            boards: BoardConfigManager::new(ctx.clone()),
            tasks: TaskStore::new(ctx.clone()),
            ctx,
            settings,
            feed: Arc::new(ChangeFeed::new()),
            lock: RwLock::new(()),
        };
        store.prepare(resolution.as_ref()).await?;
        Ok(store)
    }

    async fn prepare(&self, resolution: Option<&ConflictResolution>) -> Result<()> {
        if !self.ctx.root_exists() {
            if !self.settings.create_missing {
                return Err(KanbanError::ConfigMissing {
                    path: self.ctx.config_path(),
                });
            }
            self.ctx.create_root().await?;
            tracing::info!("Created store root {}", self.ctx.root().display());
        }
        if !self.settings.create_missing && !self.ctx.config_path().is_file() {
            return Err(KanbanError::ConfigMissing {
                path: self.ctx.config_path(),
            });
        }

        let _guard = self.mutation_guard().await?;

        let board = match self.boards.load().await {
            Ok(board) => board,
            Err(KanbanError::ConfigMissing { .. }) if self.settings.create_missing => {
                let board = self
                    .boards
                    .write(&BoardConfigManager::default_config())
                    .await?;
                tracing::info!("Wrote default board to {}", self.ctx.config_path().display());
                board
            }
            Err(e) => return Err(e),
        };

        self.boards.ensure_folders(&board).await?;
        self.boards
            .sweep_stray_folders(&self.tasks, &board, resolution)
            .await?;
        let report: RecoveryReport = self.tasks.recover(&board).await?;
        if !report.is_clean() {
            tracing::info!("Recovered store: {:?}", report);
        }

        tracing::info!(
            "Opened store at {} with {} column(s)",
            self.ctx.root().display(),
            board.columns.len()
        );
        Ok(())
    }

    async fn mutation_guard(&self) -> Result<MutationGuard<'_>> {
        let local = self.lock.write().await;
        let file = self.ctx.lock().await?;
        Ok(MutationGuard {
            _file: file,
            _local: local,
        })
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// The current board configuration
    pub async fn board(&self) -> Result<BoardConfig> {
        let _guard = self.lock.read().await;
        self.boards.load().await
    }

    /// Every task grouped by folder in board order
    pub async fn list_tasks(&self) -> Result<TaskListing> {
        let _guard = self.lock.read().await;
        let board = self.boards.load().await?;
        self.tasks.list(&board).await
    }

    pub async fn get_task(&self, id: &TaskId) -> Result<Task> {
        let _guard = self.lock.read().await;
        let board = self.boards.load().await?;
        self.tasks.get(&board, id).await
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    pub async fn create_task(&self, fields: NewTask) -> Result<Task> {
        let task = {
            let _guard = self.mutation_guard().await?;
            let board = self.boards.load().await?;
            self.tasks.create(&board, fields).await?
        };
        self.feed.bump();
        Ok(task)
    }

    pub async fn update_task(&self, id: &TaskId, patch: TaskPatch) -> Result<Task> {
        let task = {
            let _guard = self.mutation_guard().await?;
            let board = self.boards.load().await?;
            self.tasks.update(&board, id, patch).await?
        };
        self.feed.bump();
        Ok(task)
    }

    pub async fn move_task(&self, id: &TaskId, dest: &ColumnId) -> Result<Task> {
        let task = {
            let _guard = self.mutation_guard().await?;
            let board = self.boards.load().await?;
            self.tasks.move_task(&board, id, dest).await?
        };
        self.feed.bump();
        Ok(task)
    }

    pub async fn delete_task(&self, id: &TaskId) -> Result<()> {
        {
            let _guard = self.mutation_guard().await?;
            let board = self.boards.load().await?;
            self.tasks.delete(&board, id).await?;
        }
        self.feed.bump();
        Ok(())
    }

    /// Replace the board.
    ///
    /// Removing a column that still holds tasks fails with `Conflict` until
    /// the call is repeated with a resolution. An aborted save does not
    /// count as a change.
    pub async fn save_board(
        &self,
        board: BoardConfig,
        resolution: Option<ConflictResolution>,
    ) -> Result<SaveOutcome> {
        let outcome = {
            let _guard = self.mutation_guard().await?;
            self.boards.save(&self.tasks, &board, resolution).await?
        };
        if outcome.applied {
            self.feed.bump();
        }
        Ok(outcome)
    }

    // =========================================================================
    // Change notification
    // =========================================================================

    /// Long-poll for a version other than `since`.
    ///
    /// `timeout` defaults to the configured long-poll timeout and is clamped
    /// to the configured maximum.
    pub async fn wait_for_change(&self, since: u64, timeout: Option<Duration>) -> WaitOutcome {
        let timeout = self.settings.effective_timeout(timeout);
        self.feed.wait(since, timeout).await
    }

    pub fn version(&self) -> u64 {
        self.feed.current()
    }

    pub fn feed(&self) -> Arc<ChangeFeed> {
        Arc::clone(&self.feed)
    }

    /// Release every pending long-poll
    pub fn shutdown(&self) {
        tracing::info!("Shutting down store at {}", self.ctx.root().display());
        self.feed.shutdown();
    }

    // =========================================================================
    // Settings
    // =========================================================================

    pub fn settings(&self) -> &StoreSettings {
        &self.settings
    }

    pub fn ui_defaults(&self) -> UiDefaults {
        self.settings.ui_defaults()
    }
}
