//! TaskStore - task files inside column folders
//!
//! Every operation takes the board it should act on; callers load it under
//! the mutation lock so folder membership is checked against the
//! configuration that is current for the whole operation.

mod recover;
mod scan;

pub use recover::RecoveryReport;

use crate::codec::{slugify, unique_slug};
use crate::context::{remove_file_if_exists, task_id_from_path, KanbanContext};
use crate::error::{KanbanError, Result};
use crate::types::{BoardConfig, ColumnId, NewTask, Task, TaskId, TaskListing, TaskPatch};
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::path::Path;

/// CRUD and moves over task files
#[derive(Debug, Clone)]
pub struct TaskStore {
    ctx: KanbanContext,
}

impl TaskStore {
    pub fn new(ctx: KanbanContext) -> Self {
        Self { ctx }
    }

    /// Create a task; its id is the slug of the title, suffixed on collision
    pub async fn create(&self, board: &BoardConfig, fields: NewTask) -> Result<Task> {
        let folder = match fields.requested_status() {
            Some(status) if board.contains(status) => status.clone(),
            Some(status) => return Err(KanbanError::invalid_folder(status.as_str())),
            None => board
                .first_column()
                .map(|c| c.id.clone())
                .ok_or(KanbanError::EmptyBoard)?,
        };

        let taken = self.existing_ids(board).await?;
        let id = unique_slug(&slugify(&fields.title), |candidate| {
            taken.contains(candidate)
        });

        let task = Task::new(TaskId::from_string(id), fields.title, folder, Utc::now())
            .with_description(fields.description.unwrap_or_default())
            .with_creator(fields.creator)
            .with_assigned_to(fields.assigned_to)
            .with_tags(fields.tags.unwrap_or_default());

        self.ctx.write_task(&task).await?;
        tracing::debug!("Created task {} in {}", task.id, task.folder);
        Ok(task)
    }

    /// Read one task from whichever configured folder holds it
    pub async fn get(&self, board: &BoardConfig, id: &TaskId) -> Result<Task> {
        check_id(id)?;
        self.locate(board, id).await
    }

    /// Rewrite a task's content in place. Never moves the file.
    pub async fn update(&self, board: &BoardConfig, id: &TaskId, patch: TaskPatch) -> Result<Task> {
        check_id(id)?;
        let mut task = self.locate(board, id).await?;

        patch.apply_to(&mut task);
        task.touch(Utc::now());

        self.ctx.write_task(&task).await?;
        tracing::debug!("Updated task {}", task.id);
        Ok(task)
    }

    /// Move a task into `dest`.
    ///
    /// The new copy is written (temp file + rename) before the old file is
    /// removed, so an interruption leaves at most a duplicate, which the
    /// newest-copy rule resolves.
    pub async fn move_task(&self, board: &BoardConfig, id: &TaskId, dest: &ColumnId) -> Result<Task> {
        check_id(id)?;
        if !board.contains(dest) {
            return Err(KanbanError::invalid_folder(dest.as_str()));
        }

        let mut task = self.locate(board, id).await?;
        let source = task.folder.clone();
        task.place_in(dest.clone());
        task.touch(Utc::now());

        self.ctx.write_task(&task).await?;
        if source != *dest {
            self.ctx.remove_task_file(&source, id).await?;
        }

        tracing::debug!("Moved task {} from {} to {}", id, source, dest);
        Ok(task)
    }

    /// Delete a task, including any stale copy in another folder
    pub async fn delete(&self, board: &BoardConfig, id: &TaskId) -> Result<()> {
        check_id(id)?;

        let mut removed = false;
        for folder in board.column_ids() {
            removed |= self.ctx.remove_task_file(folder, id).await?;
        }
        if !removed {
            return Err(KanbanError::task_not_found(id.as_str()));
        }

        tracing::debug!("Deleted task {}", id);
        Ok(())
    }

    /// Every task grouped by folder in board order.
    ///
    /// Undecodable files are skipped and reported in `warnings`.
    pub async fn list(&self, board: &BoardConfig) -> Result<TaskListing> {
        let scan = scan::scan(&self.ctx, board).await?;
        Ok(TaskListing {
            board: board.clone(),
            folders: scan.folders,
            warnings: scan.warnings,
        })
    }

    /// Number of task files in a folder, decodable or not
    pub async fn count_in_folder(&self, folder: &ColumnId) -> Result<usize> {
        Ok(self.ctx.list_task_files(folder).await?.len())
    }

    /// Move every task file of `from` into `to`; returns how many moved.
    ///
    /// A task whose id is already held by one of `board`'s folders gets a
    /// suffixed id. Files that cannot be decoded are carried over unchanged.
    pub async fn relocate_folder(
        &self,
        board: &BoardConfig,
        from: &ColumnId,
        to: &ColumnId,
    ) -> Result<usize> {
        let now = Utc::now();
        let mut taken = self.existing_ids(board).await?;
        let mut moved = 0;

        for path in self.ctx.list_task_files(from).await? {
            let stem = file_stem(&path);
            let id = unique_slug(&stem, |candidate| {
                taken.contains(candidate)
                    || self.ctx.task_path(to, &TaskId::from_string(candidate)).exists()
            });
            taken.insert(id.clone());
            self.transfer(&path, from, to, &id, now).await?;
            moved += 1;
        }

        Ok(moved)
    }

    /// Rename files in `folder` whose ids are already used by another of
    /// `board`'s folders; returns how many were renamed
    pub async fn adopt_folder(&self, board: &BoardConfig, folder: &ColumnId) -> Result<usize> {
        let mut others = HashSet::new();
        for other in board.column_ids().filter(|c| *c != folder) {
            for id in self.ctx.list_task_ids(other).await? {
                others.insert(id.as_str().to_string());
            }
        }
        let files = self.ctx.list_task_files(folder).await?;
        let mut taken: HashSet<String> = files.iter().map(|p| file_stem(p)).collect();
        taken.extend(others.iter().cloned());

        let now = Utc::now();
        let mut renamed = 0;
        for path in files {
            let stem = file_stem(&path);
            if !others.contains(&stem) {
                continue;
            }
            let id = unique_slug(&stem, |candidate| taken.contains(candidate));
            taken.insert(id.clone());
            self.transfer(&path, folder, folder, &id, now).await?;
            renamed += 1;
        }

        Ok(renamed)
    }

    /// Write the file at `path` (found in `from`) into `to` as `id`, then
    /// remove the original
    async fn transfer(
        &self,
        path: &Path,
        from: &ColumnId,
        to: &ColumnId,
        id: &str,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let stem = file_stem(path);
        if stem != id {
            tracing::warn!("Task id {} is taken; storing {} as {}", stem, path.display(), id);
        }

        let decoded = match task_id_from_path(path) {
            Some(old_id) => Some(self.ctx.read_task_file(path, old_id, from.clone()).await),
            None => None,
        };

        match decoded {
            Some(Ok(mut task)) => {
                task.id = TaskId::from_string(id);
                task.place_in(to.clone());
                task.touch(now);
                self.ctx.write_task(&task).await?;
                remove_file_if_exists(path).await?;
            }
            Some(Err(KanbanError::Parse { .. })) | None => {
                tracing::warn!("Moving undecodable file {} to {} as is", path.display(), to);
                self.ctx.move_raw_file(path, to, id).await?;
            }
            Some(Err(e)) => return Err(e),
        }
        Ok(())
    }

    /// Delete every task file of a folder; returns how many were removed
    pub async fn purge_folder(&self, folder: &ColumnId) -> Result<usize> {
        let mut removed = 0;
        for path in self.ctx.list_task_files(folder).await? {
            if remove_file_if_exists(&path).await? {
                removed += 1;
            }
        }
        Ok(removed)
    }

    async fn existing_ids(&self, board: &BoardConfig) -> Result<HashSet<String>> {
        let mut ids = HashSet::new();
        for folder in board.column_ids() {
            for id in self.ctx.list_task_ids(folder).await? {
                ids.insert(id.as_str().to_string());
            }
        }
        Ok(ids)
    }

    /// Find a task in the configured folders; the newest copy wins when an
    /// interrupted move left two
    async fn locate(&self, board: &BoardConfig, id: &TaskId) -> Result<Task> {
        let mut found: Option<Task> = None;
        for folder in board.column_ids() {
            if !self.ctx.task_exists(folder, id) {
                continue;
            }
            let mut task = match self.ctx.read_task(folder, id).await {
                Ok(task) => task,
                Err(KanbanError::TaskNotFound { .. }) => continue,
                Err(e) => return Err(e),
            };
            task.place_in(folder.clone());
            if found
                .as_ref()
                .map_or(true, |current| task.updated_at > current.updated_at)
            {
                found = Some(task);
            }
        }
        found.ok_or_else(|| KanbanError::task_not_found(id.as_str()))
    }
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn check_id(id: &TaskId) -> Result<()> {
    if id.is_valid() {
        Ok(())
    } else {
        Err(KanbanError::InvalidTaskId { id: id.to_string() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Column;
    use tempfile::TempDir;

    async fn setup() -> (TempDir, KanbanContext, TaskStore, BoardConfig) {
        let temp = TempDir::new().unwrap();
        let ctx = KanbanContext::new(temp.path());
        let board = BoardConfig::default_board();
        for column in &board.columns {
            ctx.create_folder(&column.id).await.unwrap();
        }
        let store = TaskStore::new(ctx.clone());
        (temp, ctx, store, board)
    }

    fn id(s: &str) -> TaskId {
        TaskId::from_string(s)
    }

    fn col(s: &str) -> ColumnId {
        ColumnId::from_string(s)
    }

    #[tokio::test]
    async fn test_create_derives_id_and_defaults_to_first_column() {
        let (_temp, ctx, store, board) = setup().await;

        let task = store
            .create(&board, NewTask::new("Draft onboarding flow"))
            .await
            .unwrap();

        assert_eq!(task.id, "draft-onboarding-flow");
        assert_eq!(task.folder, "backlog");
        assert_eq!(task.status, "backlog");
        assert_eq!(task.created_at, task.updated_at);
        assert!(ctx.task_exists(&col("backlog"), &task.id));
    }

    #[tokio::test]
    async fn test_create_suffixes_across_folders() {
        let (_temp, _ctx, store, board) = setup().await;

        store
            .create(&board, NewTask::new("Ship it").with_status("done"))
            .await
            .unwrap();
        let second = store.create(&board, NewTask::new("Ship it")).await.unwrap();
        let third = store.create(&board, NewTask::new("ship IT!")).await.unwrap();

        assert_eq!(second.id, "ship-it-2");
        assert_eq!(third.id, "ship-it-3");
    }

    #[tokio::test]
    async fn test_create_unknown_status() {
        let (_temp, _ctx, store, board) = setup().await;
        let err = store
            .create(&board, NewTask::new("x").with_status("archive"))
            .await
            .unwrap_err();
        assert!(matches!(err, KanbanError::InvalidFolder { .. }));
    }

    #[tokio::test]
    async fn test_create_blank_status_uses_first_column() {
        let (_temp, _ctx, store, board) = setup().await;
        let task = store
            .create(&board, NewTask::new("x").with_status(" "))
            .await
            .unwrap();
        assert_eq!(task.folder, "backlog");
    }

    #[tokio::test]
    async fn test_update_keeps_id_and_folder() {
        let (_temp, _ctx, store, board) = setup().await;
        let task = store
            .create(&board, NewTask::new("Old title").with_status("planned"))
            .await
            .unwrap();

        let updated = store
            .update(
                &board,
                &task.id,
                TaskPatch::new()
                    .with_title("New title")
                    .with_tags(["a", "b"])
                    .with_status("done"),
            )
            .await
            .unwrap();

        assert_eq!(updated.id, "old-title");
        assert_eq!(updated.title, "New title");
        assert_eq!(updated.folder, "planned");
        assert!(updated.updated_at >= task.updated_at);
        assert_eq!(store.get(&board, &task.id).await.unwrap(), updated);
    }

    #[tokio::test]
    async fn test_move_task() {
        let (_temp, ctx, store, board) = setup().await;
        let task = store.create(&board, NewTask::new("Move me")).await.unwrap();

        let moved = store.move_task(&board, &task.id, &col("done")).await.unwrap();

        assert_eq!(moved.folder, "done");
        assert_eq!(moved.status, "done");
        assert!(!ctx.task_exists(&col("backlog"), &task.id));
        assert!(ctx.task_exists(&col("done"), &task.id));
        assert!(ctx.list_temp_files(&col("done")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_move_to_same_folder_only_touches() {
        let (_temp, _ctx, store, board) = setup().await;
        let task = store.create(&board, NewTask::new("Stay")).await.unwrap();

        let first = store.move_task(&board, &task.id, &col("done")).await.unwrap();
        let second = store.move_task(&board, &task.id, &col("done")).await.unwrap();

        assert_eq!(second.folder, "done");
        assert_eq!(second.title, first.title);
        assert!(second.updated_at >= first.updated_at);
    }

    #[tokio::test]
    async fn test_move_errors() {
        let (_temp, _ctx, store, board) = setup().await;
        let task = store.create(&board, NewTask::new("x")).await.unwrap();

        assert!(matches!(
            store.move_task(&board, &task.id, &col("nowhere")).await,
            Err(KanbanError::InvalidFolder { .. })
        ));
        assert!(store
            .move_task(&board, &id("missing"), &col("done"))
            .await
            .unwrap_err()
            .is_not_found());
    }

    #[tokio::test]
    async fn test_invalid_task_id_is_rejected() {
        let (_temp, _ctx, store, board) = setup().await;
        for bad in ["../etc", "Upper", ""] {
            assert!(matches!(
                store.get(&board, &id(bad)).await,
                Err(KanbanError::InvalidTaskId { .. })
            ));
        }
    }

    #[tokio::test]
    async fn test_delete() {
        let (_temp, _ctx, store, board) = setup().await;
        let task = store.create(&board, NewTask::new("Gone soon")).await.unwrap();

        store.delete(&board, &task.id).await.unwrap();
        assert!(store.get(&board, &task.id).await.unwrap_err().is_not_found());
        assert!(store.delete(&board, &task.id).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_list_in_board_order_with_warnings() {
        let (_temp, ctx, store, board) = setup().await;
        store
            .create(&board, NewTask::new("Done thing").with_status("done"))
            .await
            .unwrap();
        store.create(&board, NewTask::new("Todo thing")).await.unwrap();
        std::fs::write(ctx.root().join("planned").join("broken.md"), "no header\n").unwrap();

        let listing = store.list(&board).await.unwrap();

        let folders: Vec<&str> = listing.folders.keys().map(|k| k.as_str()).collect();
        assert_eq!(folders, vec!["backlog", "planned", "in_progress", "done"]);
        assert_eq!(listing.task_count(), 2);
        assert_eq!(listing.tasks_in("done")[0].id, "done-thing");
        assert_eq!(listing.warnings.len(), 1);
        assert_eq!(listing.warnings[0].folder, "planned");
    }

    #[tokio::test]
    async fn test_list_derives_status_from_folder() {
        let (_temp, ctx, store, board) = setup().await;
        let task = store.create(&board, NewTask::new("Dragged")).await.unwrap();
        // Simulate a file moved by hand
        std::fs::rename(
            ctx.task_path(&col("backlog"), &task.id),
            ctx.task_path(&col("done"), &task.id),
        )
        .unwrap();

        let listing = store.list(&board).await.unwrap();
        let found = listing.find(&task.id).unwrap();
        assert_eq!(found.folder, "done");
        assert_eq!(found.status, "done");
    }

    #[tokio::test]
    async fn test_duplicate_copies_newest_wins() {
        let (_temp, ctx, store, board) = setup().await;
        let task = store.create(&board, NewTask::new("Twice")).await.unwrap();

        let mut newer = task.clone();
        newer.place_in(col("done"));
        newer.touch(task.updated_at + chrono::Duration::seconds(5));
        ctx.write_task(&newer).await.unwrap();

        let listing = store.list(&board).await.unwrap();
        assert_eq!(listing.task_count(), 1);
        assert_eq!(listing.find(&task.id).unwrap().folder, "done");
        assert_eq!(store.get(&board, &task.id).await.unwrap().folder, "done");
    }

    #[tokio::test]
    async fn test_relocate_and_purge_folder() {
        let temp = TempDir::new().unwrap();
        let ctx = KanbanContext::new(temp.path());
        let board = BoardConfig::new(vec![Column::new("a"), Column::new("b")]);
        ctx.create_folder(&col("a")).await.unwrap();
        ctx.create_folder(&col("b")).await.unwrap();
        let store = TaskStore::new(ctx.clone());

        store.create(&board, NewTask::new("One")).await.unwrap();
        store.create(&board, NewTask::new("Two")).await.unwrap();
        std::fs::write(ctx.root().join("a").join("junk.md"), "???").unwrap();

        assert_eq!(store.count_in_folder(&col("a")).await.unwrap(), 3);
        assert_eq!(
            store
                .relocate_folder(&board, &col("a"), &col("b"))
                .await
                .unwrap(),
            3
        );
        assert_eq!(store.count_in_folder(&col("a")).await.unwrap(), 0);

        let listing = store.list(&board).await.unwrap();
        assert_eq!(listing.tasks_in("b").len(), 2);
        assert!(listing.tasks_in("b").iter().all(|t| t.status == "b"));

        assert_eq!(store.purge_folder(&col("b")).await.unwrap(), 3);
        assert_eq!(store.list(&board).await.unwrap().task_count(), 0);
    }

    #[tokio::test]
    async fn test_relocate_renames_taken_ids() {
        let temp = TempDir::new().unwrap();
        let ctx = KanbanContext::new(temp.path());
        let board = BoardConfig::new(vec![Column::new("b")]);
        ctx.create_folder(&col("a")).await.unwrap();
        ctx.create_folder(&col("b")).await.unwrap();
        let store = TaskStore::new(ctx.clone());

        ctx.write_task(&Task::new(id("dup"), "Keep me", col("b"), Utc::now()))
            .await
            .unwrap();
        ctx.write_task(&Task::new(id("dup"), "Stray", col("a"), Utc::now()))
            .await
            .unwrap();
        std::fs::write(ctx.root().join("b").join("Junk File.md"), "old").unwrap();
        std::fs::write(ctx.root().join("a").join("Junk File.md"), "new").unwrap();

        let moved = store
            .relocate_folder(&board, &col("a"), &col("b"))
            .await
            .unwrap();

        assert_eq!(moved, 2);
        assert_eq!(store.get(&board, &id("dup")).await.unwrap().title, "Keep me");
        let renamed = store.get(&board, &id("dup-2")).await.unwrap();
        assert_eq!(renamed.title, "Stray");
        assert_eq!(renamed.folder, "b");
        let b = ctx.root().join("b");
        assert_eq!(std::fs::read_to_string(b.join("Junk File.md")).unwrap(), "old");
        assert_eq!(std::fs::read_to_string(b.join("Junk File-2.md")).unwrap(), "new");
    }

    #[tokio::test]
    async fn test_adopt_folder_renames_ids_held_elsewhere() {
        let (_temp, ctx, store, _) = setup().await;
        let board = BoardConfig::new(vec![Column::new("todo"), Column::new("done")]);
        ctx.create_folder(&col("todo")).await.unwrap();
        ctx.create_folder(&col("done")).await.unwrap();

        ctx.write_task(&Task::new(id("dup"), "Keep me", col("todo"), Utc::now()))
            .await
            .unwrap();
        ctx.write_task(&Task::new(id("dup"), "Adopted", col("done"), Utc::now()))
            .await
            .unwrap();
        ctx.write_task(&Task::new(id("dup-2"), "Already here", col("done"), Utc::now()))
            .await
            .unwrap();

        assert_eq!(store.adopt_folder(&board, &col("done")).await.unwrap(), 1);
        assert_eq!(store.adopt_folder(&board, &col("done")).await.unwrap(), 0);

        let listing = store.list(&board).await.unwrap();
        assert_eq!(listing.task_count(), 3);
        assert_eq!(listing.find(&id("dup")).unwrap().title, "Keep me");
        assert_eq!(listing.find(&id("dup-2")).unwrap().title, "Already here");
        assert_eq!(listing.find(&id("dup-3")).unwrap().title, "Adopted");
    }
}
