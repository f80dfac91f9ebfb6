// tasklist - Local task list with pluggable single-slot persistence

pub mod clock;
pub mod config;
pub mod error;
pub mod filter;
pub mod json_file;
pub mod models;
pub mod persistence;
pub mod sqlite;
pub mod store;

// Re-export main types for convenience
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{Backend, Config};
pub use error::{TaskField, ValidationError};
pub use filter::Filter;
pub use json_file::JsonFileSlot;
pub use models::{MAX_SEQUENCE_NUMBER, Task, TaskCounts};
pub use persistence::{MemorySlot, Persistence};
pub use sqlite::SqliteSlot;
pub use store::{StoreEvent, TaskStore};
