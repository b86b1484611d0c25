//! # Cookie Jar Store
//!
//! Best-effort key/value persistence.
//!
//! ## Overview
//!
//! Decryption grants are cached so that users are not asked to sign again on
//! every reload. The cache sits behind the [`StorageProvider`] trait: three
//! string operations that never fail observably.
//!
//! ## Key Types
//!
//! - [`StorageProvider`] - the get/set/remove contract
//! - [`SqliteStorage`] - durable backend (rusqlite, versioned schema)
//! - [`MemoryStorage`] - in-process fallback
//! - [`resolve_storage`] - durable when possible, memory otherwise
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::path::Path;
//! use cookie_jar_store::{resolve_storage, StorageProvider};
//!
//! let storage = resolve_storage(Some(Path::new("cookie-jar.db")));
//! storage.provider.set("key", "value");
//! assert_eq!(storage.provider.get("key").as_deref(), Some("value"));
//! ```
//!
//! ## Design Notes
//!
//! - **Silent writes**: a quota, I/O or locking failure drops the write.
//!   Readers validate whatever they get back, so a lost or corrupt entry only
//!   costs a regeneration.
//! - **Fallible escape hatch**: [`SqliteStorage`] also exposes `try_*`
//!   methods for callers that do want to see backend errors.

pub mod error;
pub mod memory;
pub mod migration;
pub mod resolve;
pub mod sqlite;
pub mod traits;

pub use error::{Result, StoreError};
pub use memory::MemoryStorage;
pub use resolve::{resolve_storage, ResolvedStorage, StorageBackend};
pub use sqlite::SqliteStorage;
pub use traits::StorageProvider;
