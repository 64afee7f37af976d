use anyhow::Result;
use rusqlite::{Connection, OptionalExtension};

use crate::model::{Note, NoteOrder};

const NOTE_COLUMNS: &str = "id, title, content, created_at, updated_at";

fn read_note_row(row: &rusqlite::Row) -> rusqlite::Result<Note> {
    Ok(Note {
        id: row.get(0)?,
        title: row.get(1)?,
        content: row.get(2)?,
        created_at: row.get(3)?,
        updated_at: row.get(4)?,
    })
}

/// Case-insensitive substring match using Unicode lowercasing.
pub(crate) fn contains_folded(haystack: &str, folded_needle: &str) -> bool {
    haystack.to_lowercase().contains(folded_needle)
}

pub fn list_notes(conn: &Connection, order: NoteOrder) -> Result<Vec<Note>> {
    let sql = format!(
        "SELECT {NOTE_COLUMNS} FROM notes ORDER BY {col} DESC, id DESC",
        col = order.column()
    );
    let mut stmt = conn.prepare_cached(&sql)?;
    let rows = stmt.query_map([], read_note_row)?;
    rows.collect::<rusqlite::Result<Vec<_>>>()
        .map_err(Into::into)
}

pub fn get_note(conn: &Connection, id: i64) -> Result<Option<Note>> {
    let note = conn
        .query_row(
            &format!("SELECT {NOTE_COLUMNS} FROM notes WHERE id = ?1"),
            [id],
            read_note_row,
        )
        .optional()?;
    Ok(note)
}

/// Insert a note and return its new id. `note.id` is ignored.
pub fn insert_note(conn: &Connection, note: &Note) -> Result<i64> {
    conn.execute(
        "INSERT INTO notes (title, content, created_at, updated_at) VALUES (?1, ?2, ?3, ?4)",
        rusqlite::params![note.title, note.content, note.created_at, note.updated_at],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Overwrite every field of the note with `note.id`. Returns false if no such note.
pub fn update_note(conn: &Connection, note: &Note) -> Result<bool> {
    let changed = conn.execute(
        "UPDATE notes SET title = ?1, content = ?2, created_at = ?3, updated_at = ?4 WHERE id = ?5",
        rusqlite::params![
            note.title,
            note.content,
            note.created_at,
            note.updated_at,
            note.id
        ],
    )?;
    Ok(changed > 0)
}

pub fn delete_note(conn: &Connection, id: i64) -> Result<bool> {
    let changed = conn.execute("DELETE FROM notes WHERE id = ?1", [id])?;
    Ok(changed > 0)
}

/// Notes whose title or content contains `query`, ignoring case.
/// Most recently updated first. An empty query matches everything.
pub fn search_notes(conn: &Connection, query: &str) -> Result<Vec<Note>> {
    let needle = query.to_lowercase();
    let mut notes = list_notes(conn, NoteOrder::Updated)?;
    notes.retain(|n| contains_folded(&n.title, &needle) || contains_folded(&n.content, &needle));
    log::debug!("note search {query:?} matched {}", notes.len());
    Ok(notes)
}
