//! Validated operations on top of the stores.
//!
//! Text is trimmed and titles checked here, before anything reaches storage.
//! Storage faults pass through untouched inside [`ActionError::Storage`].

use thiserror::Error;

use crate::model::{now_millis, Note, Task};
use crate::store::{NoteStore, TaskStore};
use crate::validate::{normalize_title, subtask_titles, NoteInput, TaskInput, ValidationError};

#[derive(Debug, Error)]
pub enum ActionError {
    #[error(transparent)]
    Invalid(#[from] ValidationError),
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl ActionError {
    /// True for problems with the user's input rather than with storage.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Invalid(_) | Self::NotFound { .. })
    }
}

pub type ActionResult<T> = Result<T, ActionError>;

fn found(entity: &'static str, id: i64, exists: bool) -> ActionResult<()> {
    if exists {
        Ok(())
    } else {
        Err(ActionError::NotFound { entity, id })
    }
}

pub async fn create_note(notes: &NoteStore, input: &NoteInput) -> ActionResult<i64> {
    let input = input.normalized()?;
    let now = now_millis();
    let id = notes
        .insert(Note {
            id: 0,
            title: input.title,
            content: input.content,
            created_at: now,
            updated_at: now,
        })
        .await?;
    Ok(id)
}

pub async fn edit_note(notes: &NoteStore, id: i64, input: &NoteInput) -> ActionResult<()> {
    let input = input.normalized()?;
    let Some(mut note) = notes.get_by_id(id).await? else {
        return Err(ActionError::NotFound { entity: "note", id });
    };
    note.title = input.title;
    note.content = input.content;
    note.updated_at = now_millis().max(note.updated_at);
    let updated = notes.update(note).await?;
    found("note", id, updated)
}

pub async fn remove_note(notes: &NoteStore, id: i64) -> ActionResult<()> {
    let deleted = notes.delete(id).await?;
    found("note", id, deleted)
}

/// Create a task with its initial subtasks. Blank subtask titles are dropped.
pub async fn create_task<S: AsRef<str>>(
    tasks: &TaskStore,
    input: &TaskInput,
    subtasks: &[S],
) -> ActionResult<i64> {
    let input = input.normalized()?;
    let now = now_millis();
    let task = Task {
        id: 0,
        title: input.title,
        description: input.description,
        importance: input.importance,
        is_today: input.is_today,
        is_completed: false,
        created_at: now,
        updated_at: now,
        subtasks: Vec::new(),
    };
    let id = tasks.insert(task, subtask_titles(subtasks)).await?;
    Ok(id)
}

pub async fn edit_task(tasks: &TaskStore, id: i64, input: &TaskInput) -> ActionResult<()> {
    let input = input.normalized()?;
    let Some(mut task) = tasks.get_by_id(id).await? else {
        return Err(ActionError::NotFound { entity: "task", id });
    };
    task.title = input.title;
    task.description = input.description;
    task.importance = input.importance;
    task.is_today = input.is_today;
    task.updated_at = now_millis().max(task.updated_at);
    let updated = tasks.update(task).await?;
    found("task", id, updated)
}

/// The explicit "complete"/"reopen" action, regardless of subtasks.
pub async fn set_task_completed(tasks: &TaskStore, id: i64, completed: bool) -> ActionResult<()> {
    let updated = tasks
        .update_completion_status(id, completed, now_millis())
        .await?;
    found("task", id, updated)
}

pub async fn remove_task(tasks: &TaskStore, id: i64) -> ActionResult<()> {
    let deleted = tasks.delete(id).await?;
    found("task", id, deleted)
}

pub async fn add_subtask(tasks: &TaskStore, task_id: i64, title: &str) -> ActionResult<i64> {
    let title = normalize_title("subtask", title)?;
    tasks
        .insert_subtask(task_id, &title)
        .await?
        .ok_or(ActionError::NotFound {
            entity: "task",
            id: task_id,
        })
}

pub async fn rename_subtask(tasks: &TaskStore, id: i64, title: &str) -> ActionResult<()> {
    let title = normalize_title("subtask", title)?;
    let Some(mut subtask) = tasks.get_subtask(id).await? else {
        return Err(ActionError::NotFound { entity: "subtask", id });
    };
    subtask.title = title;
    let updated = tasks.update_subtask(subtask).await?;
    found("subtask", id, updated)
}

pub async fn set_subtask_done(tasks: &TaskStore, id: i64, done: bool) -> ActionResult<()> {
    let updated = tasks.toggle_subtask_status(id, done).await?;
    found("subtask", id, updated)
}

pub async fn remove_subtask(tasks: &TaskStore, id: i64) -> ActionResult<()> {
    let deleted = tasks.delete_subtask(id).await?;
    found("subtask", id, deleted)
}
