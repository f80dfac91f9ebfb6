// Store error types

use thiserror::Error;

/// Field of a task that failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskField {
    Title,
    Description,
    SequenceNumber,
}

impl std::fmt::Display for TaskField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskField::Title => write!(f, "title"),
            TaskField::Description => write!(f, "description"),
            TaskField::SequenceNumber => write!(f, "sequence number"),
        }
    }
}

/// Rejection of a `create` call.
///
/// Raised for a blank title or description, or when no sequence number is
/// left to issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("{}", describe(.field))]
pub struct ValidationError {
    pub field: TaskField,
}

impl ValidationError {
    pub fn empty(field: TaskField) -> Self {
        Self { field }
    }

    pub fn exhausted() -> Self {
        Self {
            field: TaskField::SequenceNumber,
        }
    }
}

fn describe(field: &TaskField) -> String {
    match field {
        TaskField::SequenceNumber => "sequence numbers exhausted".to_string(),
        other => format!("{} must not be empty", other),
    }
}
