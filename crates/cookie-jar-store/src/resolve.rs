//! Storage resolution: durable when possible, in-memory otherwise.

use std::path::Path;
use std::sync::Arc;

use crate::memory::MemoryStorage;
use crate::sqlite::SqliteStorage;
use crate::traits::StorageProvider;

/// Which backend [`resolve_storage`] settled on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    /// SQLite file; survives restarts.
    Durable,
    /// Process memory; lost on restart.
    Memory,
}

/// A resolved storage provider.
#[derive(Clone)]
pub struct ResolvedStorage {
    pub provider: Arc<dyn StorageProvider>,
    pub backend: StorageBackend,
}

/// Pick a storage provider.
///
/// Prefers a SQLite database at `path`. Falls back to [`MemoryStorage`] when
/// no path is configured or the database cannot be opened or migrated.
pub fn resolve_storage(path: Option<&Path>) -> ResolvedStorage {
    if let Some(path) = path {
        match SqliteStorage::open(path) {
            Ok(store) => {
                return ResolvedStorage {
                    provider: Arc::new(store),
                    backend: StorageBackend::Durable,
                }
            }
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "durable storage unavailable, using memory");
            }
        }
    }

    ResolvedStorage {
        provider: Arc::new(MemoryStorage::new()),
        backend: StorageBackend::Memory,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_prefers_durable() {
        let dir = TempDir::new().unwrap();
        let resolved = resolve_storage(Some(&dir.path().join("kv.db")));
        assert_eq!(resolved.backend, StorageBackend::Durable);
    }

    #[test]
    fn test_falls_back_without_path() {
        let resolved = resolve_storage(None);
        assert_eq!(resolved.backend, StorageBackend::Memory);

        resolved.provider.set("k", "v");
        assert_eq!(resolved.provider.get("k").as_deref(), Some("v"));
    }

    #[test]
    fn test_falls_back_when_unopenable() {
        let dir = TempDir::new().unwrap();
        // a directory cannot be opened as a database file
        let resolved = resolve_storage(Some(dir.path()));
        assert_eq!(resolved.backend, StorageBackend::Memory);
    }
}
