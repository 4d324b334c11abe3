//! Integration tests for board saves and conflict resolution

use kanban_files::{
    BoardConfig, Column, ColumnId, ConflictResolution, KanbanError, KanbanStore, NewTask,
    StoreSettings, TaskId,
};
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

fn board(ids: &[&str]) -> BoardConfig {
    BoardConfig::new(ids.iter().map(|id| Column::new(*id)).collect())
}

async fn open_with_board(columns: &[&str]) -> (TempDir, PathBuf, KanbanStore) {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("kanban_data");
    fs::create_dir_all(&root).unwrap();
    let config: String = columns.iter().map(|c| format!("{c}: {c}\n")).collect();
    fs::write(root.join(".workspace-kanban"), config).unwrap();

    let store = KanbanStore::open(StoreSettings::new(&root)).await.unwrap();
    (temp, root, store)
}

#[test_log::test(tokio::test)]
async fn test_save_then_load_round_trips() {
    let (_temp, root, store) = open_with_board(&["a"]).await;
    let new = BoardConfig::new(vec![
        Column::new("todo").with_title("To Do"),
        Column::new("doing").with_title("Doing").with_wip_limit(3),
        Column::new("a").with_title("Archive"),
    ]);

    let outcome = store.save_board(new.clone(), None).await.unwrap();

    assert!(outcome.applied);
    assert_eq!(store.board().await.unwrap(), new);
    assert_eq!(store.version(), 1);
    assert_eq!(
        fs::read_to_string(root.join(".workspace-kanban")).unwrap(),
        "todo: To Do\ndoing: Doing wip=3\na: Archive\n"
    );
    assert!(root.join("todo").is_dir());
    assert!(root.join("doing").is_dir());
}

#[test_log::test(tokio::test)]
async fn test_conflict_then_move_tasks() {
    let (_temp, root, store) = open_with_board(&["a", "b"]).await;
    let task = store
        .create_task(NewTask::new("Only task").with_status("a"))
        .await
        .unwrap();
    let version = store.version();

    let err = store.save_board(board(&["b"]), None).await.unwrap_err();
    assert_eq!(err.http_status(), 409);
    let KanbanError::Conflict { conflicts } = err else {
        panic!("expected a conflict");
    };
    assert_eq!(conflicts.len(), 1);
    assert_eq!(conflicts[0].folder_id, "a");
    assert_eq!(conflicts[0].task_count, 1);
    assert_eq!(store.board().await.unwrap(), board(&["a", "b"]));
    assert_eq!(store.version(), version);

    let outcome = store
        .save_board(board(&["b"]), Some(ConflictResolution::move_to("b")))
        .await
        .unwrap();

    assert!(outcome.applied);
    assert_eq!(store.board().await.unwrap(), board(&["b"]));
    assert!(!root.join("a").exists());
    let moved = store.get_task(&task.id).await.unwrap();
    assert_eq!(moved.folder, "b");
    assert_eq!(moved.status, "b");
    assert_eq!(store.version(), version + 1);
}

#[test_log::test(tokio::test)]
async fn test_invalid_destination_applies_nothing() {
    let (_temp, root, store) = open_with_board(&["a", "b"]).await;
    store
        .create_task(NewTask::new("Stuck").with_status("a"))
        .await
        .unwrap();

    let err = store
        .save_board(board(&["b", "c"]), Some(ConflictResolution::move_to("a")))
        .await
        .unwrap_err();

    assert!(matches!(err, KanbanError::InvalidDestination { .. }));
    assert_eq!(err.http_status(), 400);
    assert_eq!(store.board().await.unwrap(), board(&["a", "b"]));
    assert!(!root.join("c").exists());
    assert_eq!(store.list_tasks().await.unwrap().tasks_in("a").len(), 1);
}

#[test_log::test(tokio::test)]
async fn test_delete_tasks_resolution() {
    let (_temp, root, store) = open_with_board(&["a", "b", "c"]).await;
    store
        .create_task(NewTask::new("One").with_status("a"))
        .await
        .unwrap();
    store
        .create_task(NewTask::new("Two").with_status("b"))
        .await
        .unwrap();

    let err = store.save_board(board(&["c"]), None).await.unwrap_err();
    let KanbanError::Conflict { conflicts } = err else {
        panic!("expected a conflict");
    };
    assert_eq!(conflicts.len(), 2);

    let outcome = store
        .save_board(board(&["c"]), Some(ConflictResolution::DeleteTasks))
        .await
        .unwrap();

    assert_eq!(outcome.tasks_deleted, 2);
    assert!(!root.join("a").exists());
    assert!(!root.join("b").exists());
    assert_eq!(store.list_tasks().await.unwrap().task_count(), 0);
}

#[test_log::test(tokio::test)]
async fn test_invalid_boards_are_rejected() {
    let (_temp, _root, store) = open_with_board(&["a"]).await;

    let cases = [
        board(&["Not Valid"]),
        board(&["a", "a"]),
        BoardConfig::new(Vec::new()),
    ];
    for bad in cases {
        let err = store.save_board(bad, None).await.unwrap_err();
        assert_eq!(err.http_status(), 400);
    }
    assert_eq!(store.board().await.unwrap(), board(&["a"]));
    assert_eq!(store.version(), 0);
}

#[test_log::test(tokio::test)]
async fn test_open_sweeps_stray_folders() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("kanban_data");
    fs::create_dir_all(root.join("leftover")).unwrap();
    fs::create_dir_all(root.join("old")).unwrap();
    fs::create_dir_all(root.join(".git")).unwrap();
    fs::write(root.join(".workspace-kanban"), "new: New\n").unwrap();
    fs::write(
        root.join("old/kept.md"),
        "title: Kept\ncreated_at: 2024-01-01T00:00:00Z\nupdated_at: 2024-01-01T00:00:00Z\nstatus: old\n\n",
    )
    .unwrap();

    let err = KanbanStore::open(StoreSettings::new(&root))
        .await
        .err()
        .unwrap();
    assert!(matches!(err, KanbanError::Conflict { .. }));

    let store = KanbanStore::open_with_resolution(
        StoreSettings::new(&root),
        Some(ConflictResolution::move_to("new")),
    )
    .await
    .unwrap();

    assert!(!root.join("leftover").exists());
    assert!(!root.join("old").exists());
    assert!(root.join(".git").is_dir());
    let listing = store.list_tasks().await.unwrap();
    assert_eq!(listing.tasks_in("new")[0].title, "Kept");
    assert_eq!(listing.tasks_in("new")[0].status, ColumnId::from_string("new"));
}

#[test_log::test(tokio::test)]
async fn test_moved_tasks_never_overwrite_existing_ids() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("kanban_data");
    fs::create_dir_all(root.join("new")).unwrap();
    fs::create_dir_all(root.join("old")).unwrap();
    fs::write(root.join(".workspace-kanban"), "new: New\n").unwrap();
    let task = |title: &str, status: &str| {
        format!(
            "title: {title}\ncreated_at: 2024-01-01T00:00:00Z\nupdated_at: 2024-01-01T00:00:00Z\nstatus: {status}\n\n"
        )
    };
    fs::write(root.join("new/dup.md"), task("Keep me", "new")).unwrap();
    fs::write(root.join("old/dup.md"), task("Stray", "old")).unwrap();

    let store = KanbanStore::open_with_resolution(
        StoreSettings::new(&root),
        Some(ConflictResolution::move_to("new")),
    )
    .await
    .unwrap();

    let listing = store.list_tasks().await.unwrap();
    assert_eq!(listing.task_count(), 2);
    let kept = store.get_task(&TaskId::from_string("dup")).await.unwrap();
    assert_eq!(kept.title, "Keep me");
    let moved = store.get_task(&TaskId::from_string("dup-2")).await.unwrap();
    assert_eq!(moved.title, "Stray");
    assert_eq!(moved.folder, "new");
    assert!(!root.join("old").exists());
}

#[test_log::test(tokio::test)]
async fn test_column_titles_with_wip_words_round_trip() {
    let (_temp, _root, store) = open_with_board(&["a"]).await;
    let titled = BoardConfig::new(vec![Column::new("a").with_title("Limit wip=5 later")]);

    store.save_board(titled.clone(), None).await.unwrap();
    assert_eq!(store.board().await.unwrap(), titled);

    let err = store
        .save_board(
            BoardConfig::new(vec![Column::new("a").with_title("Limit wip=5")]),
            None,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, KanbanError::InvalidColumnTitle { .. }));
    assert_eq!(err.http_status(), 400);
    assert_eq!(store.board().await.unwrap(), titled);
}
