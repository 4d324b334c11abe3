//! KanbanContext - I/O primitives for the task store
//!
//! Path helpers, file reads and writes, directory scans and the
//! cross-process lock. No business rules live here.

use crate::codec::{decode_board, decode_task, encode_board, encode_task};
use crate::error::{KanbanError, Result};
use crate::types::{BoardConfig, ColumnId, Task, TaskId};
use fs2::FileExt;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Name of the board file in the store root
pub const CONFIG_FILE_NAME: &str = ".workspace-kanban";

/// Name of the lock file in the store root
pub const LOCK_FILE_NAME: &str = ".kanban.lock";

/// Extension of task files
pub const TASK_EXTENSION: &str = "md";

/// Extension of files written by an unfinished atomic write
pub const TEMP_EXTENSION: &str = "tmp";

/// Access to the store root on disk
#[derive(Debug, Clone)]
pub struct KanbanContext {
    root: PathBuf,
}

impl KanbanContext {
    /// Create a context for the given root directory
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    // =========================================================================
    // Path helpers
    // =========================================================================

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path to the board file
    pub fn config_path(&self) -> PathBuf {
        self.root.join(CONFIG_FILE_NAME)
    }

    /// Path to a column's folder
    pub fn folder_path(&self, folder: &ColumnId) -> PathBuf {
        self.root.join(folder.as_str())
    }

    /// Path to a task file
    pub fn task_path(&self, folder: &ColumnId, id: &TaskId) -> PathBuf {
        self.folder_path(folder)
            .join(format!("{}.{}", id, TASK_EXTENSION))
    }

    /// Path to the lock file
    pub fn lock_path(&self) -> PathBuf {
        self.root.join(LOCK_FILE_NAME)
    }

    // =========================================================================
    // Root
    // =========================================================================

    pub fn root_exists(&self) -> bool {
        self.root.is_dir()
    }

    /// Create the root directory (and parents)
    pub async fn create_root(&self) -> Result<()> {
        fs::create_dir_all(&self.root).await?;
        Ok(())
    }

    // =========================================================================
    // Board file
    // =========================================================================

    /// Read and decode the board file.
    ///
    /// Ignored lines are logged; a file without any usable column is
    /// `EmptyBoard`.
    pub async fn read_board(&self) -> Result<BoardConfig> {
        let path = self.config_path();
        let content = match fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(KanbanError::ConfigMissing { path });
            }
            Err(e) => return Err(e.into()),
        };

        let (board, skipped) = decode_board(&content);
        for line in skipped {
            tracing::warn!(
                "Ignoring line {} of {}: {}",
                line.line_number,
                path.display(),
                line.reason
            );
        }
        if board.is_empty() {
            return Err(KanbanError::EmptyBoard);
        }
        Ok(board)
    }

    /// Write the board file (atomic write via temp file)
    pub async fn write_board(&self, board: &BoardConfig) -> Result<()> {
        atomic_write(&self.config_path(), encode_board(board).as_bytes()).await
    }

    // =========================================================================
    // Folders
    // =========================================================================

    pub fn folder_exists(&self, folder: &ColumnId) -> bool {
        self.folder_path(folder).is_dir()
    }

    /// Create a column folder; returns false when it already existed
    pub async fn create_folder(&self, folder: &ColumnId) -> Result<bool> {
        if self.folder_exists(folder) {
            return Ok(false);
        }
        fs::create_dir_all(self.folder_path(folder)).await?;
        Ok(true)
    }

    /// Remove a column folder and whatever is left inside it
    pub async fn remove_folder(&self, folder: &ColumnId) -> Result<()> {
        match fs::remove_dir_all(self.folder_path(folder)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Names of the visible directories directly under the root
    pub async fn list_folders(&self) -> Result<Vec<ColumnId>> {
        let mut folders = Vec::new();
        let mut entries = fs::read_dir(&self.root).await?;

        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_dir() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                if !name.starts_with('.') {
                    folders.push(ColumnId::from_string(name));
                }
            }
        }

        Ok(folders)
    }

    // =========================================================================
    // Task files
    // =========================================================================

    /// Task files in a folder, in directory enumeration order
    pub async fn list_task_files(&self, folder: &ColumnId) -> Result<Vec<PathBuf>> {
        self.list_with_extension(folder, TASK_EXTENSION).await
    }

    /// Leftovers of interrupted atomic writes in a folder
    pub async fn list_temp_files(&self, folder: &ColumnId) -> Result<Vec<PathBuf>> {
        self.list_with_extension(folder, TEMP_EXTENSION).await
    }

    async fn list_with_extension(&self, folder: &ColumnId, ext: &str) -> Result<Vec<PathBuf>> {
        let dir = self.folder_path(folder);
        if !dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut files = Vec::new();
        let mut entries = fs::read_dir(&dir).await?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|s| s.to_str()) == Some(ext)
                && entry.file_type().await?.is_file()
            {
                files.push(path);
            }
        }

        Ok(files)
    }

    /// Ids of the task files in a folder, skipping names that are not ids
    pub async fn list_task_ids(&self, folder: &ColumnId) -> Result<Vec<TaskId>> {
        Ok(self
            .list_task_files(folder)
            .await?
            .iter()
            .filter_map(|path| task_id_from_path(path))
            .collect())
    }

    pub fn task_exists(&self, folder: &ColumnId, id: &TaskId) -> bool {
        self.task_path(folder, id).is_file()
    }

    /// Read a task from `<folder>/<id>.md`
    pub async fn read_task(&self, folder: &ColumnId, id: &TaskId) -> Result<Task> {
        let path = self.task_path(folder, id);
        match self.read_task_file(&path, id.clone(), folder.clone()).await {
            Err(KanbanError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(KanbanError::task_not_found(id.as_str()))
            }
            other => other,
        }
    }

    /// Read and decode the task file at `path`, found in `folder`
    pub async fn read_task_file(&self, path: &Path, id: TaskId, folder: ColumnId) -> Result<Task> {
        let bytes = fs::read(path).await?;
        let content = String::from_utf8(bytes)
            .map_err(|_| KanbanError::parse(path, "file is not valid UTF-8"))?;
        decode_task(id, folder, &content).map_err(|e| KanbanError::parse(path, e.to_string()))
    }

    /// Write a task into its folder (atomic write via temp file)
    pub async fn write_task(&self, task: &Task) -> Result<()> {
        let path = self.task_path(&task.folder, &task.id);
        atomic_write(&path, encode_task(task).as_bytes()).await
    }

    /// Remove a task file; returns false when there was nothing to remove
    pub async fn remove_task_file(&self, folder: &ColumnId, id: &TaskId) -> Result<bool> {
        remove_file_if_exists(&self.task_path(folder, id)).await
    }

    /// Move a file into `folder` as `<stem>.md` without decoding it
    pub async fn move_raw_file(&self, path: &Path, folder: &ColumnId, stem: &str) -> Result<()> {
        let dir = self.folder_path(folder);
        fs::create_dir_all(&dir).await?;
        fs::rename(path, dir.join(format!("{}.{}", stem, TASK_EXTENSION))).await?;
        Ok(())
    }

    // =========================================================================
    // Locking
    // =========================================================================

    /// Try to acquire the exclusive store lock (non-blocking)
    pub async fn lock(&self) -> Result<KanbanLock> {
        let lock_path = self.lock_path();

        if let Some(parent) = lock_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let file = std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&lock_path)?;

        match file.try_lock_exclusive() {
            Ok(()) => Ok(KanbanLock { file }),
            Err(_) => Err(KanbanError::LockBusy),
        }
    }
}

/// RAII lock guard - releases on drop
pub struct KanbanLock {
    file: std::fs::File,
}

impl Drop for KanbanLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}

/// Task id from a `<id>.md` path, if the stem is a valid id
pub fn task_id_from_path(path: &Path) -> Option<TaskId> {
    path.file_stem()
        .and_then(|s| s.to_str())
        .map(TaskId::from_string)
        .filter(TaskId::is_valid)
}

/// Remove a file, treating a missing file as already removed
pub async fn remove_file_if_exists(path: &Path) -> Result<bool> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}

/// Atomic write via temp file and rename
async fn atomic_write(path: &Path, content: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }

    // Same directory, so the rename never crosses filesystems
    let temp_path = path.with_extension(TEMP_EXTENSION);
    fs::write(&temp_path, content).await?;
    fs::rename(&temp_path, path).await?;

    Ok(())
}
