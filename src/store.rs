//! Async note and task stores over a shared SQLite connection.
//!
//! Every call runs the synchronous query functions from [`crate::notes`] and
//! [`crate::tasks`] on tokio's blocking pool. Mutations report the table they
//! touched on a [`ChangeBus`], which is what keeps [`LiveQuery`] results fresh.

use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Context, Result};
use notify::RecommendedWatcher;
use rusqlite::Connection;
use tokio::sync::broadcast::{self, error::RecvError};

use crate::model::{now_millis, Note, NoteOrder, Subtask, Task, TaskFilter};
use crate::watch::{self, ChangeBus, Table};
use crate::{db, notes, tasks};

struct Inner {
    conn: Mutex<Connection>,
    bus: ChangeBus,
}

/// Handle to an open database. Cloning shares the same connection.
#[derive(Clone)]
pub struct Database {
    inner: Arc<Inner>,
}

impl Database {
    /// Open (or create) a database file and apply the schema.
    pub fn open(path: &str) -> Result<Self> {
        let conn = db::open(path)?;
        db::init(&conn)?;
        Ok(Self::from_connection(conn))
    }

    pub fn open_in_memory() -> Result<Self> {
        Ok(Self::from_connection(db::open_memory()?))
    }

    /// Wrap a connection whose schema is already initialised.
    pub fn from_connection(conn: Connection) -> Self {
        Self {
            inner: Arc::new(Inner {
                conn: Mutex::new(conn),
                bus: ChangeBus::new(),
            }),
        }
    }

    pub fn notes(&self) -> NoteStore {
        NoteStore { db: self.clone() }
    }

    pub fn tasks(&self) -> TaskStore {
        TaskStore { db: self.clone() }
    }

    pub fn changes(&self) -> &ChangeBus {
        &self.inner.bus
    }

    /// Refresh live queries when another process writes `path`.
    /// Keep the returned watcher alive for as long as that is wanted.
    pub fn watch_file(&self, path: &str) -> Result<RecommendedWatcher> {
        watch::watch_db(path, self.inner.bus.clone())
    }

    async fn call<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || {
            let conn = inner
                .conn
                .lock()
                .map_err(|_| anyhow!("database connection lock poisoned"))?;
            f(&conn)
        })
        .await
        .context("database task failed")?
    }

    async fn write<T, F>(&self, table: Table, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let value = self.call(f).await?;
        self.inner.bus.publish(table);
        Ok(value)
    }

    fn live<T, F>(&self, table: Table, fetch: F) -> LiveQuery<T>
    where
        F: Fn(&Connection) -> Result<T> + Send + Sync + 'static,
        T: 'static,
    {
        LiveQuery {
            db: self.clone(),
            table,
            rx: self.inner.bus.subscribe(),
            fetch: Arc::new(fetch),
            last: None,
        }
    }
}

type Fetch<T> = Arc<dyn Fn(&Connection) -> Result<T> + Send + Sync>;

/// A query that re-emits its result whenever the underlying table changes.
///
/// The first [`next`](LiveQuery::next) returns the current result immediately.
/// Later calls wait for a change to the table and return only when the result
/// differs from the previous one. Drop the query to stop observing.
pub struct LiveQuery<T> {
    db: Database,
    table: Table,
    rx: broadcast::Receiver<Table>,
    fetch: Fetch<T>,
    last: Option<T>,
}

impl<T> LiveQuery<T>
where
    T: Clone + PartialEq + Send + 'static,
{
    pub async fn next(&mut self) -> Result<T> {
        loop {
            if self.last.is_some() {
                self.wait_for_change().await;
            }
            let fetch = Arc::clone(&self.fetch);
            let value = self.db.call(move |conn| fetch(conn)).await?;
            if self.last.as_ref() != Some(&value) {
                self.last = Some(value.clone());
                return Ok(value);
            }
        }
    }

    async fn wait_for_change(&mut self) {
        loop {
            match self.rx.recv().await {
                Ok(table) if table == self.table => return,
                Ok(_) => continue,
                Err(RecvError::Lagged(skipped)) => {
                    log::warn!("live query missed {skipped} change events, re-querying");
                    return;
                }
                // The sender lives in the database this query holds a handle to.
                Err(RecvError::Closed) => return,
            }
        }
    }
}

#[derive(Clone)]
pub struct NoteStore {
    db: Database,
}

impl NoteStore {
    pub async fn get_all(&self, order: NoteOrder) -> Result<Vec<Note>> {
        self.db.call(move |conn| notes::list_notes(conn, order)).await
    }

    pub fn live_all(&self, order: NoteOrder) -> LiveQuery<Vec<Note>> {
        self.db
            .live(Table::Notes, move |conn| notes::list_notes(conn, order))
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Option<Note>> {
        self.db.call(move |conn| notes::get_note(conn, id)).await
    }

    pub async fn insert(&self, note: Note) -> Result<i64> {
        self.db
            .write(Table::Notes, move |conn| notes::insert_note(conn, &note))
            .await
    }

    pub async fn update(&self, note: Note) -> Result<bool> {
        self.db
            .write(Table::Notes, move |conn| notes::update_note(conn, &note))
            .await
    }

    pub async fn delete(&self, id: i64) -> Result<bool> {
        self.db
            .write(Table::Notes, move |conn| notes::delete_note(conn, id))
            .await
    }

    pub async fn search(&self, query: &str) -> Result<Vec<Note>> {
        let query = query.to_string();
        self.db
            .call(move |conn| notes::search_notes(conn, &query))
            .await
    }

    pub fn live_search(&self, query: &str) -> LiveQuery<Vec<Note>> {
        let query = query.to_string();
        self.db
            .live(Table::Notes, move |conn| notes::search_notes(conn, &query))
    }
}

#[derive(Clone)]
pub struct TaskStore {
    db: Database,
}

impl TaskStore {
    pub async fn get_all(&self, filter: TaskFilter) -> Result<Vec<Task>> {
        self.db.call(move |conn| tasks::list_tasks(conn, filter)).await
    }

    pub fn live_all(&self, filter: TaskFilter) -> LiveQuery<Vec<Task>> {
        self.db
            .live(Table::Tasks, move |conn| tasks::list_tasks(conn, filter))
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Option<Task>> {
        self.db.call(move |conn| tasks::get_task(conn, id)).await
    }

    pub async fn search(&self, query: &str) -> Result<Vec<Task>> {
        let query = query.to_string();
        self.db
            .call(move |conn| tasks::search_tasks(conn, &query))
            .await
    }

    pub fn live_search(&self, query: &str) -> LiveQuery<Vec<Task>> {
        let query = query.to_string();
        self.db
            .live(Table::Tasks, move |conn| tasks::search_tasks(conn, &query))
    }

    pub async fn insert(&self, task: Task, initial_subtasks: Vec<String>) -> Result<i64> {
        self.db
            .write(Table::Tasks, move |conn| {
                tasks::insert_task(conn, &task, &initial_subtasks)
            })
            .await
    }

    pub async fn update(&self, task: Task) -> Result<bool> {
        self.db
            .write(Table::Tasks, move |conn| tasks::update_task(conn, &task))
            .await
    }

    pub async fn update_completion_status(
        &self,
        task_id: i64,
        is_completed: bool,
        timestamp: i64,
    ) -> Result<bool> {
        self.db
            .write(Table::Tasks, move |conn| {
                tasks::update_completion_status(conn, task_id, is_completed, timestamp)
            })
            .await
    }

    pub async fn delete(&self, id: i64) -> Result<bool> {
        self.db
            .write(Table::Tasks, move |conn| tasks::delete_task(conn, id))
            .await
    }

    pub async fn get_subtask(&self, id: i64) -> Result<Option<Subtask>> {
        self.db.call(move |conn| tasks::get_subtask(conn, id)).await
    }

    pub async fn insert_subtask(&self, task_id: i64, title: &str) -> Result<Option<i64>> {
        let title = title.to_string();
        let now = now_millis();
        self.db
            .write(Table::Tasks, move |conn| {
                tasks::insert_subtask(conn, task_id, &title, now)
            })
            .await
    }

    pub async fn update_subtask(&self, subtask: Subtask) -> Result<bool> {
        let now = now_millis();
        self.db
            .write(Table::Tasks, move |conn| {
                tasks::update_subtask(conn, &subtask, now)
            })
            .await
    }

    pub async fn toggle_subtask_status(&self, id: i64, is_done: bool) -> Result<bool> {
        let now = now_millis();
        self.db
            .write(Table::Tasks, move |conn| {
                tasks::toggle_subtask_status(conn, id, is_done, now)
            })
            .await
    }

    pub async fn delete_subtask(&self, id: i64) -> Result<bool> {
        let now = now_millis();
        self.db
            .write(Table::Tasks, move |conn| tasks::delete_subtask(conn, id, now))
            .await
    }

    pub async fn are_all_subtasks_completed(&self, task_id: i64) -> Result<bool> {
        self.db
            .call(move |conn| tasks::are_all_subtasks_completed(conn, task_id))
            .await
    }
}
