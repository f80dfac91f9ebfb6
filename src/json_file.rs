// JSON file slot

use crate::persistence::{Persistence, validate_key};
use eyre::{Context, Result};
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Slot stored as `<dir>/<key>.json`
#[derive(Debug, Clone)]
pub struct JsonFileSlot {
    path: PathBuf,
}

impl JsonFileSlot {
    /// Open the slot `key` inside `dir`, creating the directory if needed
    pub fn open<P: AsRef<Path>>(dir: P, key: &str) -> Result<Self> {
        validate_key(key)?;

        let dir = dir.as_ref();
        fs::create_dir_all(dir).context("Failed to create data directory")?;

        Ok(Self {
            path: dir.join(format!("{}.json", key)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Persistence for JsonFileSlot {
    fn load(&self) -> Result<Option<String>> {
        if !self.path.exists() {
            // Nothing saved yet
            return Ok(None);
        }

        let mut file = File::open(&self.path).context("Failed to open task file")?;
        file.lock_shared().context("Failed to acquire file lock")?;

        let mut payload = String::new();
        file.read_to_string(&mut payload)
            .context("Failed to read task file")?;

        debug!(file = ?self.path, bytes = payload.len(), "Loaded slot");
        Ok(Some(payload))
    }

    fn save(&mut self, payload: &str) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(&self.path)
            .context("Failed to open task file for writing")?;

        // Truncate only once we hold the lock
        file.lock_exclusive().context("Failed to acquire file lock")?;
        file.set_len(0).context("Failed to truncate task file")?;

        file.write_all(payload.as_bytes())
            .context("Failed to write task file")?;
        file.sync_all().context("Failed to sync task file")?; // Ensure data is flushed to disk

        debug!(file = ?self.path, bytes = payload.len(), "Saved slot");
        // Lock is released when file is dropped
        Ok(())
    }
}
