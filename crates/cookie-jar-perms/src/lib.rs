//! # Cookie Jar Permissions
//!
//! Decryption authorization: who may read which encrypted values.
//!
//! ## Overview
//!
//! Reading an encrypted total requires a grant: the user signs an EIP-712
//! message that binds a client-generated keypair to a set of contracts and a
//! validity window. The decryption service checks the signature and seals
//! results to that keypair.
//!
//! ## Key Types
//!
//! - [`AuthorizationGrant`] - the signed grant and its persisted JSON form
//! - [`AuthorizationCache`] - load-or-create over a [`StorageProvider`]
//! - [`TypedDataSigner`] - the wallet capability that signs grants
//!
//! ## Caching
//!
//! Grants are keyed by `(user, contract)` in lowercase and reused until they
//! expire. Corrupt, mismatched or expired records are removed and replaced
//! without surfacing an error. A failed signature persists nothing.
//!
//! [`StorageProvider`]: cookie_jar_store::StorageProvider

pub mod cache;
pub mod error;
pub mod grant;
pub mod signer;

pub use cache::{cache_key, AuthorizationCache, CACHE_KEY_PREFIX, GRANT_DURATION_DAYS};
pub use error::{PermsError, Result};
pub use grant::{AuthorizationGrant, SECONDS_PER_DAY};
pub use signer::TypedDataSigner;
