use std::time::Duration;

use notebox::actions::{self, ActionError};
use notebox::model::{NoteOrder, Task, TaskFilter};
use notebox::store::{Database, TaskStore};
use notebox::validate::{NoteInput, TaskInput};

async fn load(tasks: &TaskStore, id: i64) -> Task {
    tasks.get_by_id(id).await.unwrap().unwrap()
}

fn subtask_id(task: &Task, title: &str) -> i64 {
    task.subtasks
        .iter()
        .find(|s| s.title == title)
        .map(|s| s.id)
        .unwrap()
}

async fn trip(tasks: &TaskStore) -> i64 {
    actions::create_task(tasks, &TaskInput::new("Trip"), &["Pack", "Book flight"])
        .await
        .unwrap()
}

#[tokio::test]
async fn trip_completes_when_every_subtask_is_done() {
    let db = Database::open_in_memory().unwrap();
    let tasks = db.tasks();
    let id = trip(&tasks).await;
    let task = load(&tasks, id).await;
    assert!(!task.is_completed);

    actions::set_subtask_done(&tasks, subtask_id(&task, "Pack"), true)
        .await
        .unwrap();
    assert!(!load(&tasks, id).await.is_completed);

    actions::set_subtask_done(&tasks, subtask_id(&task, "Book flight"), true)
        .await
        .unwrap();
    assert!(load(&tasks, id).await.is_completed);
}

#[tokio::test]
async fn deleting_a_done_subtask_keeps_task_completed() {
    let db = Database::open_in_memory().unwrap();
    let tasks = db.tasks();
    let id = trip(&tasks).await;
    let task = load(&tasks, id).await;
    for sub in &task.subtasks {
        actions::set_subtask_done(&tasks, sub.id, true).await.unwrap();
    }

    actions::remove_subtask(&tasks, subtask_id(&task, "Pack"))
        .await
        .unwrap();
    let task = load(&tasks, id).await;
    assert_eq!(task.subtasks.len(), 1);
    assert_eq!(task.subtasks[0].title, "Book flight");
    assert!(task.is_completed);
}

#[tokio::test]
async fn blank_note_is_rejected_and_content_is_trimmed() {
    let db = Database::open_in_memory().unwrap();
    let notes = db.notes();

    let err = actions::create_note(&notes, &NoteInput::new("", ""))
        .await
        .unwrap_err();
    assert!(matches!(err, ActionError::Invalid(_)));
    assert!(notes.get_all(NoteOrder::Created).await.unwrap().is_empty());

    let id = actions::create_note(&notes, &NoteInput::new("Groceries", "  milk, eggs  "))
        .await
        .unwrap();
    let note = notes.get_by_id(id).await.unwrap().unwrap();
    assert_eq!(note.content, "milk, eggs");
}

#[tokio::test]
async fn today_filter_returns_only_today_tasks() {
    let db = Database::open_in_memory().unwrap();
    let tasks = db.tasks();
    let mut ids = Vec::new();
    for (i, today) in [true, false, true].into_iter().enumerate() {
        let mut input = TaskInput::new(format!("task {i}"));
        input.is_today = today;
        ids.push(
            actions::create_task(&tasks, &input, &[] as &[&str])
                .await
                .unwrap(),
        );
    }
    let mut today: Vec<i64> = tasks
        .get_all(TaskFilter::Today)
        .await
        .unwrap()
        .iter()
        .map(|t| t.id)
        .collect();
    today.sort();
    assert_eq!(today, vec![ids[0], ids[2]]);
}

#[tokio::test]
async fn repeating_a_toggle_changes_nothing() {
    let db = Database::open_in_memory().unwrap();
    let tasks = db.tasks();
    let id = trip(&tasks).await;
    let pack = subtask_id(&load(&tasks, id).await, "Pack");
    for done in [true, false] {
        tasks.toggle_subtask_status(pack, done).await.unwrap();
        let first = load(&tasks, id).await.is_completed;
        tasks.toggle_subtask_status(pack, done).await.unwrap();
        assert_eq!(load(&tasks, id).await.is_completed, first);
    }
}

#[tokio::test]
async fn completion_follows_subtasks_in_any_order() {
    let db = Database::open_in_memory().unwrap();
    let tasks = db.tasks();
    let titles = ["a", "b", "c", "d"];
    for order in [[0, 1, 2, 3], [3, 1, 0, 2], [2, 3, 1, 0]] {
        let id = actions::create_task(&tasks, &TaskInput::new("t"), &titles)
            .await
            .unwrap();
        let task = load(&tasks, id).await;
        for (n, &i) in order.iter().enumerate() {
            assert!(!load(&tasks, id).await.is_completed);
            tasks
                .toggle_subtask_status(subtask_id(&task, titles[i]), true)
                .await
                .unwrap();
            assert_eq!(load(&tasks, id).await.is_completed, n == titles.len() - 1);
        }
    }
}

#[tokio::test]
async fn one_undone_subtask_reopens_completed_task() {
    let db = Database::open_in_memory().unwrap();
    let tasks = db.tasks();
    let id = actions::create_task(&tasks, &TaskInput::new("t"), &["a", "b", "c"])
        .await
        .unwrap();
    let task = load(&tasks, id).await;
    for sub in &task.subtasks {
        tasks.toggle_subtask_status(sub.id, true).await.unwrap();
    }
    assert!(load(&tasks, id).await.is_completed);
    tasks
        .toggle_subtask_status(subtask_id(&task, "b"), false)
        .await
        .unwrap();
    assert!(!load(&tasks, id).await.is_completed);
}

#[tokio::test]
async fn task_without_subtasks_is_only_completed_explicitly() {
    let db = Database::open_in_memory().unwrap();
    let tasks = db.tasks();
    let id = actions::create_task(&tasks, &TaskInput::new("t"), &["temp"])
        .await
        .unwrap();
    let temp = subtask_id(&load(&tasks, id).await, "temp");
    actions::remove_subtask(&tasks, temp).await.unwrap();
    assert!(!load(&tasks, id).await.is_completed);

    actions::set_task_completed(&tasks, id, true).await.unwrap();
    let extra = actions::add_subtask(&tasks, id, "extra").await.unwrap();
    assert!(!load(&tasks, id).await.is_completed);
    actions::remove_subtask(&tasks, extra).await.unwrap();
    // Back to zero subtasks: the rule no longer applies in either direction.
    assert!(!load(&tasks, id).await.is_completed);
    actions::set_task_completed(&tasks, id, true).await.unwrap();
    assert!(load(&tasks, id).await.is_completed);
}

#[tokio::test]
async fn deleting_task_removes_all_subtasks() {
    let db = Database::open_in_memory().unwrap();
    let tasks = db.tasks();
    let id = actions::create_task(&tasks, &TaskInput::new("t"), &["a", "b", "c"])
        .await
        .unwrap();
    let sub_ids: Vec<i64> = load(&tasks, id).await.subtasks.iter().map(|s| s.id).collect();
    assert_eq!(sub_ids.len(), 3);

    actions::remove_task(&tasks, id).await.unwrap();
    assert!(tasks.get_by_id(id).await.unwrap().is_none());
    for sid in sub_ids {
        assert!(tasks.get_subtask(sid).await.unwrap().is_none());
    }
}

#[tokio::test]
async fn subtask_mutations_never_move_updated_at_back() {
    let db = Database::open_in_memory().unwrap();
    let tasks = db.tasks();
    let id = trip(&tasks).await;
    let mut last = load(&tasks, id).await.updated_at;
    let pack = subtask_id(&load(&tasks, id).await, "Pack");

    let extra = tasks.insert_subtask(id, "Passport").await.unwrap().unwrap();
    let now = load(&tasks, id).await.updated_at;
    assert!(now >= last);
    last = now;

    tasks.toggle_subtask_status(pack, true).await.unwrap();
    let now = load(&tasks, id).await.updated_at;
    assert!(now >= last);
    last = now;

    tasks.delete_subtask(extra).await.unwrap();
    assert!(load(&tasks, id).await.updated_at >= last);
}

#[tokio::test]
async fn search_ignores_case_for_notes_and_tasks() {
    let db = Database::open_in_memory().unwrap();
    let notes = db.notes();
    let tasks = db.tasks();
    for (title, content) in [("Kotlin", ""), ("misc", "KOTLIN flows"), ("kotlin", ""), ("Rust", "")] {
        actions::create_note(&notes, &NoteInput::new(title, content))
            .await
            .unwrap();
    }
    let mut learn = TaskInput::new("Learn");
    learn.description = "Kotlin coroutines".into();
    actions::create_task(&tasks, &learn, &[] as &[&str]).await.unwrap();
    actions::create_task(&tasks, &TaskInput::new("Walk"), &[] as &[&str])
        .await
        .unwrap();

    assert_eq!(notes.search("kotlin").await.unwrap().len(), 3);
    let found = tasks.search("kotlin").await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].title, "Learn");
}

#[tokio::test]
async fn live_query_sees_writes_from_another_connection() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("shared.db");
    let path = path.to_str().unwrap();

    let watcher_side = Database::open(path).unwrap();
    let _watcher = watcher_side.watch_file(path).unwrap();
    let mut live = watcher_side.notes().live_all(NoteOrder::Created);
    assert!(live.next().await.unwrap().is_empty());

    let writer_side = Database::open(path).unwrap();
    actions::create_note(&writer_side.notes(), &NoteInput::new("from elsewhere", ""))
        .await
        .unwrap();

    let list = tokio::time::timeout(Duration::from_secs(10), live.next())
        .await
        .expect("live query was not refreshed")
        .unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0].title, "from elsewhere");
}
