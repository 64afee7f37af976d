use std::fmt;

use rusqlite::types::{FromSql, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};

/// Milliseconds since the Unix epoch.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Importance {
    #[default]
    Low,
    Medium,
    High,
}

impl Importance {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
        }
    }

    /// Decode a stored value. Anything unrecognized reads as `Low`.
    pub fn from_stored(s: &str) -> Self {
        match s {
            "MEDIUM" => Self::Medium,
            "HIGH" => Self::High,
            _ => Self::Low,
        }
    }

    /// Parse user input, case-insensitively.
    pub fn parse(s: &str) -> anyhow::Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            _ => anyhow::bail!("invalid importance '{s}': must be low, medium, or high"),
        }
    }

    pub fn marker(self) -> &'static str {
        match self {
            Self::Low => "",
            Self::Medium => "!",
            Self::High => "!!",
        }
    }
}

impl fmt::Display for Importance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ToSql for Importance {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for Importance {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value {
            ValueRef::Text(bytes) => Ok(std::str::from_utf8(bytes)
                .map(Self::from_stored)
                .unwrap_or_default()),
            _ => Ok(Self::Low),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subtask {
    pub id: i64,
    pub task_id: i64,
    pub title: String,
    pub is_done: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub importance: Importance,
    pub is_today: bool,
    pub is_completed: bool,
    pub created_at: i64,
    pub updated_at: i64,
    pub subtasks: Vec<Subtask>,
}

impl Task {
    /// True when the task has subtasks and every one of them is done.
    pub fn all_subtasks_done(&self) -> bool {
        !self.subtasks.is_empty() && self.subtasks.iter().all(|s| s.is_done)
    }

    pub fn completed_count(&self) -> usize {
        self.subtasks.iter().filter(|s| s.is_done).count()
    }

    /// Fraction of subtasks done, 0.0 when there are none.
    pub fn progress(&self) -> f32 {
        if self.subtasks.is_empty() {
            return 0.0;
        }
        self.completed_count() as f32 / self.subtasks.len() as f32
    }

    /// Returns display icon: x=completed, .=active
    pub fn icon(&self) -> &'static str {
        if self.is_completed {
            "x"
        } else {
            "."
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TaskFilter {
    #[default]
    All,
    Today,
    Active,
    Completed,
}

impl TaskFilter {
    pub fn parse(s: &str) -> anyhow::Result<Self> {
        match s {
            "all" => Ok(Self::All),
            "today" => Ok(Self::Today),
            "active" => Ok(Self::Active),
            "completed" => Ok(Self::Completed),
            _ => anyhow::bail!("invalid filter '{s}': must be all, today, active, or completed"),
        }
    }

    pub fn matches(self, task: &Task) -> bool {
        match self {
            Self::All => true,
            Self::Today => task.is_today,
            Self::Active => !task.is_completed,
            Self::Completed => task.is_completed,
        }
    }
}

/// Which timestamp note listings sort on (newest first).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum NoteOrder {
    Created,
    #[default]
    Updated,
}

impl NoteOrder {
    pub fn parse(s: &str) -> anyhow::Result<Self> {
        match s {
            "created" => Ok(Self::Created),
            "updated" => Ok(Self::Updated),
            _ => anyhow::bail!("invalid order '{s}': must be created or updated"),
        }
    }

    pub fn column(self) -> &'static str {
        match self {
            Self::Created => "created_at",
            Self::Updated => "updated_at",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task_with(done: &[bool]) -> Task {
        Task {
            id: 1,
            title: "t".into(),
            description: String::new(),
            importance: Importance::Low,
            is_today: false,
            is_completed: false,
            created_at: 0,
            updated_at: 0,
            subtasks: done
                .iter()
                .enumerate()
                .map(|(i, &is_done)| Subtask {
                    id: i as i64 + 1,
                    task_id: 1,
                    title: format!("s{i}"),
                    is_done,
                })
                .collect(),
        }
    }

    #[test]
    fn unknown_importance_reads_as_low() {
        assert_eq!(Importance::from_stored("HIGH"), Importance::High);
        assert_eq!(Importance::from_stored("urgent"), Importance::Low);
        assert_eq!(Importance::from_stored(""), Importance::Low);
    }

    #[test]
    fn importance_parse_is_case_insensitive() {
        assert_eq!(Importance::parse("High").unwrap(), Importance::High);
        assert_eq!(Importance::parse("medium").unwrap(), Importance::Medium);
        assert!(Importance::parse("urgent").is_err());
    }

    #[test]
    fn progress_without_subtasks_is_zero() {
        let task = task_with(&[]);
        assert_eq!(task.progress(), 0.0);
        assert!(!task.all_subtasks_done());
    }

    #[test]
    fn progress_counts_done_subtasks() {
        let task = task_with(&[true, false, true, false]);
        assert_eq!(task.completed_count(), 2);
        assert_eq!(task.progress(), 0.5);
        assert!(!task.all_subtasks_done());
        assert!(task_with(&[true, true]).all_subtasks_done());
    }

    #[test]
    fn filter_parse() {
        assert_eq!(TaskFilter::parse("today").unwrap(), TaskFilter::Today);
        assert!(TaskFilter::parse("someday").is_err());
    }
}
