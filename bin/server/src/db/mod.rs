//! Database access for the relay server.
//!
//! - `SqliteStore`: the SQLite-backed conversation store

pub mod conversation;

pub use conversation::SqliteStore;
