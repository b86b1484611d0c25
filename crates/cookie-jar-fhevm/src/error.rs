//! Error types for the FHE SDK seam.

use thiserror::Error;

/// Errors raised by an FHE SDK implementation.
#[derive(Debug, Error)]
pub enum FhevmError {
    /// SDK bootstrap failed.
    #[error("sdk bootstrap failed: {0}")]
    Bootstrap(String),

    /// The instance configuration does not match the deployment it targets.
    #[error("invalid instance configuration: {0}")]
    InvalidConfig(String),

    /// An encrypted input was built with no values.
    #[error("encrypted input is empty")]
    EmptyInput,

    /// An encrypted input exceeds the per-proof bit budget.
    #[error("encrypted input too large: {bits} bits exceeds {max}")]
    InputTooLarge { bits: u32, max: u32 },

    /// An input proof failed verification.
    #[error("invalid input proof: {0}")]
    InvalidProof(String),

    /// The handle is not known to the coprocessor.
    #[error("unknown ciphertext handle: {0}")]
    UnknownHandle(String),

    /// Operand types of a homomorphic operation differ.
    #[error("type mismatch: {0}")]
    TypeMismatch(String),

    /// An account lacks ACL permission on a handle, or a signature does not
    /// belong to the requesting user.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The decryption authorization is outside its validity window.
    #[error("authorization not valid at {now}: window [{start}, {end})")]
    AuthorizationExpired { now: u64, start: u64, end: u64 },

    /// A user-decrypt request is malformed.
    #[error("invalid decrypt request: {0}")]
    InvalidRequest(String),

    /// The decryption service returned a response that failed verification.
    #[error("invalid decryption response: {0}")]
    InvalidResponse(String),

    /// Core error.
    #[error("core error: {0}")]
    Core(#[from] cookie_jar_core::CoreError),
}

/// Result type for SDK operations.
pub type Result<T> = std::result::Result<T, FhevmError>;
