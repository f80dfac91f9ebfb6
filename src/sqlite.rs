// SQLite slot

use crate::persistence::{Persistence, validate_key};
use chrono::Utc;
use eyre::{Context, Result};
use rusqlite::{Connection, OptionalExtension};
use std::fs;
use std::path::Path;
use tracing::debug;

/// Slot stored as one row of the `slots` table
pub struct SqliteSlot {
    db: Connection,
    key: String,
}

impl SqliteSlot {
    /// Open or create the database at `path` and bind to slot `key`
    pub fn open<P: AsRef<Path>>(path: P, key: &str) -> Result<Self> {
        validate_key(key)?;

        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).context("Failed to create data directory")?;
        }

        let db = Connection::open(path).context("Failed to open SQLite database")?;
        let slot = Self {
            db,
            key: key.to_string(),
        };
        slot.create_schema()?;

        Ok(slot)
    }

    /// Slot backed by a private in-memory database
    pub fn open_in_memory(key: &str) -> Result<Self> {
        validate_key(key)?;

        let db = Connection::open_in_memory().context("Failed to open SQLite database")?;
        let slot = Self {
            db,
            key: key.to_string(),
        };
        slot.create_schema()?;

        Ok(slot)
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    fn create_schema(&self) -> Result<()> {
        debug!("Creating slot schema");

        self.db.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS slots (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at INTEGER NOT NULL
            );
            "#,
        )?;

        Ok(())
    }
}

impl Persistence for SqliteSlot {
    fn load(&self) -> Result<Option<String>> {
        let value = self
            .db
            .query_row("SELECT value FROM slots WHERE key = ?1", [&self.key], |row| {
                row.get::<_, String>(0)
            })
            .optional()
            .context("Failed to read slot")?;

        Ok(value)
    }

    fn save(&mut self, payload: &str) -> Result<()> {
        self.db
            .execute(
                "INSERT OR REPLACE INTO slots (key, value, updated_at) VALUES (?1, ?2, ?3)",
                rusqlite::params![&self.key, payload, Utc::now().timestamp_millis()],
            )
            .context("Failed to write slot")?;

        debug!(key = %self.key, bytes = payload.len(), "Saved slot");
        Ok(())
    }
}
