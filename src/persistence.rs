// Persistence port: a single key-value slot holding the serialized task list

use crate::models::{MAX_SEQUENCE_NUMBER, Task};
use eyre::{Context, Result, eyre};
use std::collections::HashSet;
use tracing::warn;

/// Load/save boundary between the store and durable storage
///
/// The payload is opaque to implementations. `save` followed by `load`
/// must hand back the same payload.
pub trait Persistence {
    /// Read the slot, `None` when nothing has been saved yet
    fn load(&self) -> Result<Option<String>>;

    /// Overwrite the slot with `payload`
    fn save(&mut self, payload: &str) -> Result<()>;
}

impl<P: Persistence + ?Sized> Persistence for Box<P> {
    fn load(&self) -> Result<Option<String>> {
        (**self).load()
    }

    fn save(&mut self, payload: &str) -> Result<()> {
        (**self).save(payload)
    }
}

/// In-process slot, nothing survives the process
#[derive(Debug, Clone, Default)]
pub struct MemorySlot {
    payload: Option<String>,
}

impl MemorySlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Slot pre-filled with a payload, as if saved by an earlier session
    pub fn with_payload(payload: impl Into<String>) -> Self {
        Self {
            payload: Some(payload.into()),
        }
    }

    pub fn contents(&self) -> Option<&str> {
        self.payload.as_deref()
    }
}

impl Persistence for MemorySlot {
    fn load(&self) -> Result<Option<String>> {
        Ok(self.payload.clone())
    }

    fn save(&mut self, payload: &str) -> Result<()> {
        self.payload = Some(payload.to_string());
        Ok(())
    }
}

/// Serialize the full task sequence as a JSON array
pub fn encode_tasks(tasks: &[Task]) -> Result<String> {
    serde_json::to_string(tasks).context("Failed to serialize tasks")
}

/// Parse a JSON array of tasks, preserving stored order
///
/// Fails only when the payload is not a JSON array. Entries that do not
/// deserialize, have a blank title or description, carry a sequence number
/// outside `1..=MAX_SEQUENCE_NUMBER`, or repeat an earlier sequence number
/// are skipped with a warning.
pub fn decode_tasks(payload: &str) -> Result<Vec<Task>> {
    let entries: Vec<serde_json::Value> = serde_json::from_str(payload).context("Failed to parse stored tasks")?;

    let mut seen = HashSet::new();
    let mut tasks = Vec::with_capacity(entries.len());

    for (index, entry) in entries.into_iter().enumerate() {
        let task: Task = match serde_json::from_value(entry) {
            Ok(t) => t,
            Err(e) => {
                warn!(index, error = ?e, "Failed to parse stored task, skipping");
                continue;
            }
        };

        if !task.has_content() {
            warn!(index, sno = task.sequence_number, "Stored task has blank text, skipping");
            continue;
        }

        if !(1..=MAX_SEQUENCE_NUMBER).contains(&task.sequence_number) {
            warn!(index, sno = task.sequence_number, "Sequence number out of range, skipping");
            continue;
        }

        if !seen.insert(task.sequence_number) {
            warn!(index, sno = task.sequence_number, "Duplicate sequence number, skipping");
            continue;
        }

        tasks.push(task);
    }

    Ok(tasks)
}

/// Validate a slot key before it becomes a file name or row key
pub(crate) fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(eyre!("Slot key cannot be empty"));
    }
    if key.len() > 64 {
        return Err(eyre!("Slot key too long: {} (max 64 chars)", key));
    }
    if !key.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '-') {
        return Err(eyre!("Invalid slot key: {} (must be alphanumeric with _/-)", key));
    }
    Ok(())
}
