//! Error types for the store module.
//!
//! These only surface through the fallible `try_*` methods and
//! [`SqliteStorage::open`](crate::SqliteStorage::open). The
//! [`StorageProvider`](crate::StorageProvider) surface never returns them.

use thiserror::Error;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error from SQLite.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// The connection mutex was poisoned by a panicking writer.
    #[error("storage lock poisoned")]
    Poisoned,

    /// Migration error.
    #[error("migration error: {0}")]
    Migration(String),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
