//! Record store implementations.
//!
//! - `MemoryStore` - in-memory storage (tests, dry runs)
//! - `SqliteStore` - SQLite file-based storage

pub mod memory;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::{SqliteStore, DEFAULT_DB_PATH};
