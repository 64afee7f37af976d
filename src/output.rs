use chrono::{DateTime, Utc};

use crate::model::{Note, Task};

fn format_time(millis: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(millis)
        .map(|t| t.format("%Y-%m-%dT%H:%M:%SZ").to_string())
        .unwrap_or_else(|| millis.to_string())
}

fn first_line(text: &str) -> &str {
    text.lines().next().unwrap_or("")
}

pub fn format_note_detail(note: &Note) -> String {
    let mut out = String::new();
    out.push_str(&format!("Id:      {}\n", note.id));
    out.push_str(&format!("Title:   {}\n", note.title));
    out.push_str(&format!("Created: {}\n", format_time(note.created_at)));
    out.push_str(&format!("Updated: {}\n", format_time(note.updated_at)));
    if !note.content.is_empty() {
        out.push('\n');
        out.push_str(&note.content);
        out.push('\n');
    }
    out
}

pub fn format_note_list(notes: &[Note]) -> String {
    let mut out = String::new();
    for note in notes {
        let preview = first_line(&note.content);
        if preview.is_empty() {
            out.push_str(&format!("{:>4}  {}\n", note.id, note.title));
        } else {
            out.push_str(&format!("{:>4}  {}  {}\n", note.id, note.title, preview));
        }
    }
    out
}

fn progress(task: &Task) -> String {
    if task.subtasks.is_empty() {
        String::new()
    } else {
        format!(" [{}/{}]", task.completed_count(), task.subtasks.len())
    }
}

pub fn format_task_detail(task: &Task) -> String {
    let mut out = String::new();
    out.push_str(&format!("Id:          {}\n", task.id));
    out.push_str(&format!("Title:       {}\n", task.title));
    out.push_str(&format!(
        "Status:      {}\n",
        if task.is_completed { "completed" } else { "active" }
    ));
    out.push_str(&format!("Importance:  {}\n", task.importance));
    if task.is_today {
        out.push_str("Today:       yes\n");
    }
    if !task.description.is_empty() {
        out.push_str(&format!("Description: {}\n", task.description));
    }
    out.push_str(&format!("Created:     {}\n", format_time(task.created_at)));
    out.push_str(&format!("Updated:     {}\n", format_time(task.updated_at)));

    if !task.subtasks.is_empty() {
        out.push('\n');
        out.push_str(&format!(
            "Subtasks ({}/{}, {:.0}%):\n",
            task.completed_count(),
            task.subtasks.len(),
            task.progress() * 100.0
        ));
        for sub in &task.subtasks {
            let mark = if sub.is_done { "x" } else { " " };
            out.push_str(&format!("  [{mark}] {:>4}  {}\n", sub.id, sub.title));
        }
    }
    out
}

pub fn format_task_list(tasks: &[Task]) -> String {
    let mut out = String::new();
    for task in tasks {
        let marker = task.importance.marker();
        let marker = if marker.is_empty() {
            String::new()
        } else {
            format!(" {marker}")
        };
        let today = if task.is_today { " (today)" } else { "" };
        out.push_str(&format!(
            "{} {:>4}  {}{}{}{}\n",
            task.icon(),
            task.id,
            task.title,
            marker,
            progress(task),
            today
        ));
    }
    out
}
