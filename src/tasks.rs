use std::collections::HashMap;

use anyhow::Result;
use rusqlite::{Connection, OptionalExtension};

use crate::db::with_savepoint;
use crate::model::{Subtask, Task, TaskFilter};
use crate::notes::contains_folded;

const TASK_COLUMNS: &str =
    "id, title, description, importance, is_today, is_completed, created_at, updated_at";

const SUBTASK_COLUMNS: &str = "id, task_id, title, is_done";

const INSERT_TASK: &str = "
INSERT INTO tasks (title, description, importance, is_today, is_completed, created_at, updated_at)
VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
";

const UPDATE_TASK: &str = "
UPDATE tasks
SET title = ?1, description = ?2, importance = ?3, is_today = ?4, updated_at = ?5
WHERE id = ?6
";

const SET_COMPLETION: &str = "
UPDATE tasks
SET is_completed = ?1, updated_at = ?2
WHERE id = ?3
";

const TOUCH_TASK: &str = "
UPDATE tasks
SET updated_at = MAX(updated_at, ?1)
WHERE id = ?2
";

const SUBTASK_COUNTS: &str = "
SELECT COUNT(*), COALESCE(SUM(is_done), 0)
FROM subtasks
WHERE task_id = ?1
";

fn read_task_row(row: &rusqlite::Row) -> rusqlite::Result<Task> {
    Ok(Task {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        importance: row.get(3)?,
        is_today: row.get(4)?,
        is_completed: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
        subtasks: Vec::new(),
    })
}

fn read_subtask_row(row: &rusqlite::Row) -> rusqlite::Result<Subtask> {
    Ok(Subtask {
        id: row.get(0)?,
        task_id: row.get(1)?,
        title: row.get(2)?,
        is_done: row.get(3)?,
    })
}

fn task_exists(conn: &Connection, id: i64) -> Result<bool> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM tasks WHERE id = ?1", [id], |row| {
        row.get(0)
    })?;
    Ok(count > 0)
}

/// Bound parameters per `IN (...)` lookup.
const ID_CHUNK: usize = 500;

/// Attach subtasks to already-loaded tasks, fetching only their rows.
fn populate_subtasks(conn: &Connection, tasks: &mut [Task]) -> Result<()> {
    if tasks.is_empty() {
        return Ok(());
    }
    let ids: Vec<i64> = tasks.iter().map(|t| t.id).collect();
    let mut by_task: HashMap<i64, Vec<Subtask>> = HashMap::new();
    for chunk in ids.chunks(ID_CHUNK) {
        let placeholders = vec!["?"; chunk.len()].join(", ");
        let mut stmt = conn.prepare(&format!(
            "SELECT {SUBTASK_COLUMNS} FROM subtasks WHERE task_id IN ({placeholders}) ORDER BY task_id, id"
        ))?;
        let rows = stmt.query_map(rusqlite::params_from_iter(chunk), read_subtask_row)?;
        for row in rows {
            let subtask = row?;
            by_task.entry(subtask.task_id).or_default().push(subtask);
        }
    }
    for task in tasks.iter_mut() {
        task.subtasks = by_task.remove(&task.id).unwrap_or_default();
    }
    Ok(())
}

/// Task rows matching `filter`, newest first, without their subtasks.
fn query_tasks(conn: &Connection, filter: TaskFilter) -> Result<Vec<Task>> {
    let condition = match filter {
        TaskFilter::All => "1",
        TaskFilter::Today => "is_today = 1",
        TaskFilter::Active => "is_completed = 0",
        TaskFilter::Completed => "is_completed = 1",
    };
    let mut stmt = conn.prepare_cached(&format!(
        "SELECT {TASK_COLUMNS} FROM tasks WHERE {condition} ORDER BY created_at DESC, id DESC"
    ))?;
    let tasks = stmt
        .query_map([], read_task_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(tasks)
}

pub fn list_tasks(conn: &Connection, filter: TaskFilter) -> Result<Vec<Task>> {
    let mut tasks = query_tasks(conn, filter)?;
    populate_subtasks(conn, &mut tasks)?;
    Ok(tasks)
}

pub fn get_task(conn: &Connection, id: i64) -> Result<Option<Task>> {
    let task = conn
        .query_row(
            &format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?1"),
            [id],
            read_task_row,
        )
        .optional()?;
    let Some(mut task) = task else {
        return Ok(None);
    };
    task.subtasks = list_subtasks(conn, id)?;
    Ok(Some(task))
}

/// Tasks whose title or description contains `query`, ignoring case.
pub fn search_tasks(conn: &Connection, query: &str) -> Result<Vec<Task>> {
    let needle = query.to_lowercase();
    let mut tasks = query_tasks(conn, TaskFilter::All)?;
    tasks.retain(|t| {
        contains_folded(&t.title, &needle) || contains_folded(&t.description, &needle)
    });
    populate_subtasks(conn, &mut tasks)?;
    log::debug!("task search {query:?} matched {}", tasks.len());
    Ok(tasks)
}

/// Insert a task together with its initial subtasks and return the task id.
///
/// Blank subtask titles are skipped. `task.id` and `task.subtasks` are ignored.
pub fn insert_task<S: AsRef<str>>(
    conn: &Connection,
    task: &Task,
    initial_subtasks: &[S],
) -> Result<i64> {
    with_savepoint(conn, "insert_task", |conn| {
        conn.execute(
            INSERT_TASK,
            rusqlite::params![
                task.title,
                task.description,
                task.importance,
                task.is_today,
                task.is_completed,
                task.created_at,
                task.updated_at
            ],
        )?;
        let task_id = conn.last_insert_rowid();
        for title in initial_subtasks.iter().map(AsRef::as_ref) {
            if title.trim().is_empty() {
                continue;
            }
            conn.execute(
                "INSERT INTO subtasks (task_id, title, is_done) VALUES (?1, ?2, 0)",
                rusqlite::params![task_id, title],
            )?;
        }
        Ok(task_id)
    })
}

/// Overwrite title, description, importance, today flag and `updated_at`.
/// Completion and subtasks are left alone. Returns false if no such task.
pub fn update_task(conn: &Connection, task: &Task) -> Result<bool> {
    let changed = conn.execute(
        UPDATE_TASK,
        rusqlite::params![
            task.title,
            task.description,
            task.importance,
            task.is_today,
            task.updated_at,
            task.id
        ],
    )?;
    Ok(changed > 0)
}

/// Explicit completion change, independent of subtask state.
pub fn update_completion_status(
    conn: &Connection,
    task_id: i64,
    is_completed: bool,
    timestamp: i64,
) -> Result<bool> {
    let changed = conn.execute(
        SET_COMPLETION,
        rusqlite::params![is_completed, timestamp, task_id],
    )?;
    Ok(changed > 0)
}

/// Delete a task and all of its subtasks.
pub fn delete_task(conn: &Connection, id: i64) -> Result<bool> {
    with_savepoint(conn, "delete_task", |conn| {
        let subtasks = conn.execute("DELETE FROM subtasks WHERE task_id = ?1", [id])?;
        let changed = conn.execute("DELETE FROM tasks WHERE id = ?1", [id])?;
        if changed > 0 {
            log::debug!("deleted task {id} with {subtasks} subtasks");
        }
        Ok(changed > 0)
    })
}

pub fn list_subtasks(conn: &Connection, task_id: i64) -> Result<Vec<Subtask>> {
    let mut stmt = conn.prepare_cached(&format!(
        "SELECT {SUBTASK_COLUMNS} FROM subtasks WHERE task_id = ?1 ORDER BY id"
    ))?;
    let rows = stmt.query_map([task_id], read_subtask_row)?;
    rows.collect::<rusqlite::Result<Vec<_>>>()
        .map_err(Into::into)
}

pub fn get_subtask(conn: &Connection, id: i64) -> Result<Option<Subtask>> {
    let subtask = conn
        .query_row(
            &format!("SELECT {SUBTASK_COLUMNS} FROM subtasks WHERE id = ?1"),
            [id],
            read_subtask_row,
        )
        .optional()?;
    Ok(subtask)
}

/// Add a subtask to `task_id`. Returns `None` if the task does not exist.
pub fn insert_subtask(
    conn: &Connection,
    task_id: i64,
    title: &str,
    now: i64,
) -> Result<Option<i64>> {
    with_savepoint(conn, "insert_subtask", |conn| {
        if !task_exists(conn, task_id)? {
            return Ok(None);
        }
        conn.execute(
            "INSERT INTO subtasks (task_id, title, is_done) VALUES (?1, ?2, 0)",
            rusqlite::params![task_id, title],
        )?;
        let id = conn.last_insert_rowid();
        propagate_completion(conn, task_id, now)?;
        Ok(Some(id))
    })
}

/// Overwrite title and done flag of `subtask.id`. The stored parent is kept;
/// `subtask.task_id` is not used. Returns false if no such subtask.
pub fn update_subtask(conn: &Connection, subtask: &Subtask, now: i64) -> Result<bool> {
    with_savepoint(conn, "update_subtask", |conn| {
        let task_id: Option<i64> = conn
            .query_row(
                "SELECT task_id FROM subtasks WHERE id = ?1",
                [subtask.id],
                |row| row.get(0),
            )
            .optional()?;
        let Some(task_id) = task_id else {
            return Ok(false);
        };
        conn.execute(
            "UPDATE subtasks SET title = ?1, is_done = ?2 WHERE id = ?3",
            rusqlite::params![subtask.title, subtask.is_done, subtask.id],
        )?;
        propagate_completion(conn, task_id, now)?;
        Ok(true)
    })
}

/// Set only the done flag, leaving the title as stored.
pub fn toggle_subtask_status(conn: &Connection, id: i64, is_done: bool, now: i64) -> Result<bool> {
    with_savepoint(conn, "toggle_subtask", |conn| {
        let Some(subtask) = get_subtask(conn, id)? else {
            return Ok(false);
        };
        conn.execute(
            "UPDATE subtasks SET is_done = ?1 WHERE id = ?2",
            rusqlite::params![is_done, id],
        )?;
        propagate_completion(conn, subtask.task_id, now)?;
        Ok(true)
    })
}

pub fn delete_subtask(conn: &Connection, id: i64, now: i64) -> Result<bool> {
    with_savepoint(conn, "delete_subtask", |conn| {
        let Some(subtask) = get_subtask(conn, id)? else {
            return Ok(false);
        };
        conn.execute("DELETE FROM subtasks WHERE id = ?1", [id])?;
        propagate_completion(conn, subtask.task_id, now)?;
        Ok(true)
    })
}

fn subtask_counts(conn: &Connection, task_id: i64) -> Result<(i64, i64)> {
    let counts = conn.query_row(SUBTASK_COUNTS, [task_id], |row| {
        Ok((row.get(0)?, row.get(1)?))
    })?;
    Ok(counts)
}

/// True if the task has no subtasks, or all of them are done.
pub fn are_all_subtasks_completed(conn: &Connection, task_id: i64) -> Result<bool> {
    let (total, done) = subtask_counts(conn, task_id)?;
    Ok(done == total)
}

/// Bring a task in line with its subtasks after a subtask mutation.
///
/// `updated_at` always advances to `now` (never backwards). With at least one
/// subtask, `is_completed` becomes "every subtask is done". A task without
/// subtasks keeps whatever completion it has.
fn propagate_completion(conn: &Connection, task_id: i64, now: i64) -> Result<()> {
    conn.execute(TOUCH_TASK, rusqlite::params![now, task_id])?;

    let (total, _) = subtask_counts(conn, task_id)?;
    if total == 0 {
        return Ok(());
    }
    let all_done = are_all_subtasks_completed(conn, task_id)?;
    let was_completed: bool = conn.query_row(
        "SELECT is_completed FROM tasks WHERE id = ?1",
        [task_id],
        |row| row.get(0),
    )?;
    if all_done != was_completed {
        conn.execute(
            "UPDATE tasks SET is_completed = ?1 WHERE id = ?2",
            rusqlite::params![all_done, task_id],
        )?;
        log::debug!("task {task_id} completion -> {all_done} ({total} subtasks)");
    }
    Ok(())
}
