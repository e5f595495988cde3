//! Repository Module
//!
//! Persistence layer for the server.
//! Typed stores sit on top of a string-keyed backend.

pub mod job;
pub mod kv;
pub mod profile;

// Re-export for convenience
pub use job::JobStore;
pub use kv::{KeyValueStore, MemoryKeyValueStore, SqliteKeyValueStore, StoreError};
pub use profile::ProfileStore;
