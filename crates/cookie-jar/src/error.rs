//! Error types for the Cookie Jar client.

use cookie_jar_core::CoreError;
use cookie_jar_fhevm::FhevmError;
use cookie_jar_perms::PermsError;
use thiserror::Error;

/// Errors surfaced to callers of the Cookie Jar client.
///
/// Messages of the underlying failure are preserved verbatim.
#[derive(Debug, Error)]
pub enum CookieJarError {
    /// A required setting is missing or malformed. Raised before any
    /// network call.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Something the operation needs (a wallet, a connected account) is
    /// missing.
    #[error("{0}")]
    Precondition(String),

    /// The amount is outside what the operation accepts.
    #[error("amount {amount} outside {min}..={max}")]
    AmountOutOfRange { amount: u64, min: u64, max: u64 },

    /// The user declined to sign, or the signer failed.
    #[error("signing rejected: {0}")]
    SigningRejected(String),

    /// The handle was absent from the decrypt result. The value may not be
    /// revealed yet; retrying later can succeed.
    #[error("unable to decrypt cookie jar: handle {0} not available")]
    DecryptionUnavailable(String),

    /// Chain RPC or transaction failure.
    #[error("gateway error: {0}")]
    Gateway(String),

    /// FHE SDK error.
    #[error("fhevm error: {0}")]
    Fhevm(#[from] FhevmError),

    /// Grant error other than a rejected signature.
    #[error("permission error: {0}")]
    Permission(PermsError),

    /// Core error.
    #[error("core error: {0}")]
    Core(#[from] CoreError),
}

impl From<PermsError> for CookieJarError {
    fn from(err: PermsError) -> Self {
        match err {
            PermsError::SigningRejected(msg) => CookieJarError::SigningRejected(msg),
            other => CookieJarError::Permission(other),
        }
    }
}

impl CookieJarError {
    /// Whether retrying the same operation later may succeed without the
    /// caller changing anything.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            CookieJarError::DecryptionUnavailable(_) | CookieJarError::Gateway(_)
        )
    }
}

/// Result type for Cookie Jar operations.
pub type Result<T> = std::result::Result<T, CookieJarError>;
