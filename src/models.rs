// Data models for the task list

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Largest sequence number the store issues or loads
///
/// Matches the largest integer a browser-written payload can hold exactly.
pub const MAX_SEQUENCE_NUMBER: u64 = (1 << 53) - 1;

/// A single to-do item
///
/// Serialized with the keys `sno`, `title`, `desc`, `completed` and
/// `createdAt` so payloads written by earlier versions of the list keep loading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    #[serde(rename = "sno")]
    pub sequence_number: u64,
    pub title: String,
    #[serde(rename = "desc")]
    pub description: String,
    #[serde(default)]
    pub completed: bool,
    pub created_at: DateTime<Utc>,
}

impl Task {
    /// True when both text fields carry something besides whitespace
    pub(crate) fn has_content(&self) -> bool {
        !self.title.trim().is_empty() && !self.description.trim().is_empty()
    }
}

/// Totals over the whole list, independent of the active filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct TaskCounts {
    pub total: usize,
    pub completed: usize,
    pub pending: usize,
}

impl TaskCounts {
    pub fn from_tasks(tasks: &[Task]) -> Self {
        let total = tasks.len();
        let completed = tasks.iter().filter(|t| t.completed).count();
        Self {
            total,
            completed,
            pending: total - completed,
        }
    }

    /// Share of completed tasks as a rounded percentage, `None` for an empty list
    pub fn completion_percent(&self) -> Option<u32> {
        if self.total == 0 {
            return None;
        }
        Some((self.completed as f64 / self.total as f64 * 100.0).round() as u32)
    }
}
