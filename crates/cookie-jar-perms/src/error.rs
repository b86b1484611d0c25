//! Error types for decryption authorization.

use thiserror::Error;

/// Errors that can occur while obtaining a decryption grant.
#[derive(Debug, Error)]
pub enum PermsError {
    /// The signer could not report its address.
    #[error("signer unavailable: {0}")]
    SignerUnavailable(String),

    /// The user declined, or the signer failed to produce a signature.
    #[error("signing rejected: {0}")]
    SigningRejected(String),

    /// A grant record is malformed.
    #[error("invalid grant: {0}")]
    InvalidGrant(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// SDK error while building the grant.
    #[error("fhevm error: {0}")]
    Fhevm(#[from] cookie_jar_fhevm::FhevmError),

    /// Core error.
    #[error("core error: {0}")]
    CoreError(#[from] cookie_jar_core::CoreError),
}

/// Result type for authorization operations.
pub type Result<T> = std::result::Result<T, PermsError>;
