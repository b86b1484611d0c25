//! The StorageProvider trait: a minimal key/value contract.

use std::sync::Arc;

/// Best-effort string key/value storage.
///
/// Persistence is deliberately best-effort: `set` and `remove` never report
/// failure, and a `get` that cannot reach the backend behaves like a miss.
/// Callers must treat everything they read back as untrusted and validate
/// it; they must never rely on a write having landed.
pub trait StorageProvider: Send + Sync {
    /// Read a value. `None` on a miss or on any backend failure.
    fn get(&self, key: &str) -> Option<String>;

    /// Write a value. Failures (quota, I/O, locking) are swallowed.
    fn set(&self, key: &str, value: &str);

    /// Delete a value. Failures are swallowed.
    fn remove(&self, key: &str);
}

impl<S: StorageProvider + ?Sized> StorageProvider for Arc<S> {
    fn get(&self, key: &str) -> Option<String> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) {
        (**self).remove(key)
    }
}

impl<S: StorageProvider + ?Sized> StorageProvider for Box<S> {
    fn get(&self, key: &str) -> Option<String> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) {
        (**self).remove(key)
    }
}
