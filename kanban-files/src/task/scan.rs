//! Full scan of the configured folders

use crate::context::{task_id_from_path, KanbanContext};
use crate::error::{KanbanError, Result};
use crate::types::{BoardConfig, ColumnId, ParseWarning, Task, TaskId};
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

/// What a scan found, before anything is returned to callers
#[derive(Debug, Default)]
pub(crate) struct Scan {
    /// Surviving tasks per configured folder, status taken from the folder
    pub folders: IndexMap<ColumnId, Vec<Task>>,
    pub warnings: Vec<ParseWarning>,
    /// Older copies of an id that also lives in another folder
    pub stale_copies: Vec<Task>,
    /// Surviving tasks whose header status disagreed with their folder
    pub stale_headers: Vec<Task>,
}

pub(crate) async fn scan(ctx: &KanbanContext, board: &BoardConfig) -> Result<Scan> {
    let mut scan = Scan::default();
    let mut mismatched: HashSet<(ColumnId, TaskId)> = HashSet::new();

    for folder in board.column_ids() {
        let mut tasks = Vec::new();
        for path in ctx.list_task_files(folder).await? {
            let Some(id) = task_id_from_path(&path) else {
                scan.warnings
                    .push(warning(path, folder, "file name is not a valid task id"));
                continue;
            };

            match ctx.read_task_file(&path, id, folder.clone()).await {
                Ok(mut task) => {
                    if !task.is_consistent() {
                        mismatched.insert((folder.clone(), task.id.clone()));
                        task.place_in(folder.clone());
                    }
                    tasks.push(task);
                }
                Err(KanbanError::Parse { path, message }) => {
                    scan.warnings.push(warning(path, folder, message));
                }
                // Removed by another process since the directory was read
                Err(KanbanError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e),
            }
        }
        scan.folders.insert(folder.clone(), tasks);
    }

    for warning in &scan.warnings {
        tracing::warn!("Skipping task file {}", warning);
    }

    // A move interrupted between write and remove leaves two copies; the
    // newest wins, ties go to the earlier folder in board order
    let mut newest: HashMap<TaskId, (ColumnId, DateTime<Utc>)> = HashMap::new();
    for (folder, tasks) in &scan.folders {
        for task in tasks {
            match newest.get(&task.id) {
                Some((_, updated_at)) if *updated_at >= task.updated_at => {}
                _ => {
                    newest.insert(task.id.clone(), (folder.clone(), task.updated_at));
                }
            }
        }
    }

    for (folder, tasks) in scan.folders.iter_mut() {
        let (keep, stale): (Vec<Task>, Vec<Task>) = std::mem::take(tasks)
            .into_iter()
            .partition(|t| newest.get(&t.id).map(|(f, _)| f) == Some(&*folder));
        for task in &stale {
            tracing::warn!(
                "Task {} also exists in a newer copy; ignoring the one in {}",
                task.id,
                folder
            );
        }
        scan.stale_copies.extend(stale);
        *tasks = keep;
    }

    scan.stale_headers = scan
        .folders
        .values()
        .flatten()
        .filter(|t| mismatched.contains(&(t.folder.clone(), t.id.clone())))
        .cloned()
        .collect();

    Ok(scan)
}

fn warning(path: PathBuf, folder: &ColumnId, message: impl Into<String>) -> ParseWarning {
    ParseWarning {
        path,
        folder: folder.clone(),
        message: message.into(),
    }
}
