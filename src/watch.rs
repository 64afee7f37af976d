use std::path::Path;

use anyhow::{Context, Result};
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::broadcast;

/// Table a change event refers to. Subtask changes are reported as `Tasks`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Table {
    Notes,
    Tasks,
}

const BUS_CAPACITY: usize = 64;

/// Fan-out of change events to every live query.
#[derive(Debug, Clone)]
pub struct ChangeBus {
    tx: broadcast::Sender<Table>,
}

impl Default for ChangeBus {
    fn default() -> Self {
        Self::new()
    }
}

impl ChangeBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(BUS_CAPACITY);
        Self { tx }
    }

    pub fn publish(&self, table: Table) {
        // No receivers just means nobody is watching.
        let _ = self.tx.send(table);
    }

    pub fn publish_all(&self) {
        self.publish(Table::Notes);
        self.publish(Table::Tasks);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Table> {
        self.tx.subscribe()
    }
}

/// Watch the database file for writes made by other processes and report them
/// on `bus`. The watcher must be kept alive for events to be delivered.
///
/// SQLite writes through `-wal`/`-shm`/`-journal` siblings, so the parent
/// directory is watched and events are kept only for files whose name starts
/// with the database filename.
pub fn watch_db(db_path: &str, bus: ChangeBus) -> Result<RecommendedWatcher> {
    let db_filename = Path::new(db_path)
        .file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
        let event = match res {
            Ok(event) => event,
            Err(e) => {
                log::warn!("database watcher error: {e}");
                return;
            }
        };
        // Reads from any process fire access events; only writes matter here.
        if matches!(event.kind, EventKind::Access(_)) {
            return;
        }
        let touches_db = event.paths.iter().any(|p| {
            p.file_name()
                .map(|f| f.to_string_lossy().starts_with(&*db_filename))
                .unwrap_or(false)
        });
        if touches_db {
            bus.publish_all();
        }
    })
    .context("failed to create file watcher")?;

    let path = Path::new(db_path);
    let watch_path = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    watcher
        .watch(watch_path, RecursiveMode::NonRecursive)
        .with_context(|| format!("failed to watch {}", watch_path.display()))?;
    log::debug!("watching {} for changes to {db_path}", watch_path.display());

    Ok(watcher)
}
