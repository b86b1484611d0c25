//! SQLite implementation of the StorageProvider trait.
//!
//! This is the durable backend: entries survive process restarts. The
//! connection is guarded by a mutex; operations are short single-row
//! statements, so they run inline rather than on a blocking pool.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::{params, Connection, OptionalExtension};

use crate::error::{Result, StoreError};
use crate::migration::{self, now_millis};
use crate::traits::StorageProvider;

/// SQLite-based durable key/value store.
pub struct SqliteStorage {
    conn: Mutex<Connection>,
}

impl SqliteStorage {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file and runs migrations if needed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut conn = Connection::open(path)?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory SQLite database.
    ///
    /// Useful for testing.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }

    /// Read a value, reporting backend failures.
    pub fn try_get(&self, key: &str) -> Result<Option<String>> {
        let conn = self.lock()?;
        let value = conn
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(value)
    }

    /// Write a value, reporting backend failures.
    pub fn try_set(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO kv (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, value, now_millis()],
        )?;
        Ok(())
    }

    /// Delete a value, reporting backend failures.
    pub fn try_remove(&self, key: &str) -> Result<()> {
        let conn = self.lock()?;
        conn.execute("DELETE FROM kv WHERE key = ?1", params![key])?;
        Ok(())
    }
}

// Best-effort surface: every failure degrades to a miss or a dropped write.
impl StorageProvider for SqliteStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.try_get(key).ok().flatten()
    }

    fn set(&self, key: &str, value: &str) {
        let _ = self.try_set(key, value);
    }

    fn remove(&self, key: &str) {
        let _ = self.try_remove(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_set_get_remove() {
        let store = SqliteStorage::open_memory().unwrap();

        assert_eq!(store.get("k"), None);
        store.set("k", "v1");
        assert_eq!(store.get("k").as_deref(), Some("v1"));

        store.set("k", "v2");
        assert_eq!(store.try_get("k").unwrap().as_deref(), Some("v2"));

        store.remove("k");
        assert_eq!(store.get("k"), None);
    }

    #[test]
    fn test_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("storage.db");

        {
            let store = SqliteStorage::open(&path).unwrap();
            store.set("grant", "{\"a\":1}");
        }

        let reopened = SqliteStorage::open(&path).unwrap();
        assert_eq!(reopened.get("grant").as_deref(), Some("{\"a\":1}"));
    }

    #[test]
    fn test_open_fails_for_directory() {
        let dir = TempDir::new().unwrap();
        assert!(SqliteStorage::open(dir.path()).is_err());
    }
}
