use thiserror::Error;

use crate::model::Importance;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{entity} title must not be blank")]
    BlankTitle { entity: &'static str },
    #[error("{0}")]
    BadChoice(String),
}

/// Turn a failed parse of a user-supplied option (importance, filter, sort
/// order) into a validation error.
pub fn choice<T>(parsed: anyhow::Result<T>) -> Result<T, ValidationError> {
    parsed.map_err(|e| ValidationError::BadChoice(e.to_string()))
}

/// Trim a title, rejecting it if nothing is left.
pub fn normalize_title(entity: &'static str, raw: &str) -> Result<String, ValidationError> {
    let title = raw.trim();
    if title.is_empty() {
        return Err(ValidationError::BlankTitle { entity });
    }
    Ok(title.to_string())
}

/// Trim subtask titles for batch creation, dropping the blank ones.
pub fn subtask_titles<S: AsRef<str>>(raw: &[S]) -> Vec<String> {
    raw.iter()
        .map(|s| s.as_ref().trim())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NoteInput {
    pub title: String,
    pub content: String,
}

impl NoteInput {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
        }
    }

    pub fn normalized(&self) -> Result<Self, ValidationError> {
        Ok(Self {
            title: normalize_title("note", &self.title)?,
            content: self.content.trim().to_string(),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskInput {
    pub title: String,
    pub description: String,
    pub importance: Importance,
    pub is_today: bool,
}

impl TaskInput {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn normalized(&self) -> Result<Self, ValidationError> {
        Ok(Self {
            title: normalize_title("task", &self.title)?,
            description: self.description.trim().to_string(),
            importance: self.importance,
            is_today: self.is_today,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn titles_are_trimmed() {
        assert_eq!(normalize_title("note", "  Groceries ").unwrap(), "Groceries");
    }

    #[test]
    fn blank_titles_rejected() {
        assert_eq!(
            normalize_title("note", ""),
            Err(ValidationError::BlankTitle { entity: "note" })
        );
        assert!(normalize_title("task", " \t\n").is_err());
    }

    #[test]
    fn bad_option_values_are_validation_errors() {
        let err = choice(Importance::parse("urgent")).unwrap_err();
        assert!(matches!(err, ValidationError::BadChoice(_)));
        assert!(err.to_string().contains("urgent"));
        assert_eq!(choice(Importance::parse("high")), Ok(Importance::High));
    }

    #[test]
    fn note_input_trims_content() {
        let input = NoteInput::new("Groceries", "  milk, eggs  ").normalized().unwrap();
        assert_eq!(input.title, "Groceries");
        assert_eq!(input.content, "milk, eggs");
    }

    #[test]
    fn task_input_trims_description() {
        let mut input = TaskInput::new(" Trip ");
        input.description = "  pack light ".into();
        input.importance = Importance::High;
        let input = input.normalized().unwrap();
        assert_eq!(input.title, "Trip");
        assert_eq!(input.description, "pack light");
        assert_eq!(input.importance, Importance::High);
    }

    #[test]
    fn blank_subtask_titles_dropped() {
        assert_eq!(subtask_titles(&["a", " ", "", " b "]), vec!["a", "b"]);
    }

    #[test]
    fn error_message() {
        let err = normalize_title("subtask", " ").unwrap_err();
        assert_eq!(err.to_string(), "subtask title must not be blank");
    }
}
