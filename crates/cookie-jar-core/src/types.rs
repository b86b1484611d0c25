//! Strong type definitions for the Cookie Jar.
//!
//! Everything that crosses the contract or relayer boundary is hex-encoded
//! with a `0x` prefix; the newtypes here own the raw bytes.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{CoreError, Result};

/// Length of a ciphertext handle in bytes.
pub const HANDLE_LEN: usize = 32;

/// Encode bytes as a `0x`-prefixed lowercase hex string.
pub fn to_prefixed_hex(bytes: impl AsRef<[u8]>) -> String {
    format!("0x{}", hex::encode(bytes))
}

/// Decode a hex string, with or without the `0x` prefix.
pub fn decode_hex(s: &str) -> Result<Vec<u8>> {
    let stripped = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);
    Ok(hex::decode(stripped)?)
}

/// Current Unix time in seconds.
pub fn unix_seconds() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

/// A 32-byte reference to an encrypted value.
///
/// Handles are recognized both by the contract (as `bytes32`) and by the
/// decryption infrastructure. The handle itself carries no plaintext.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CiphertextHandle(pub [u8; HANDLE_LEN]);

impl CiphertextHandle {
    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; HANDLE_LEN]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; HANDLE_LEN] {
        &self.0
    }

    /// `0x`-prefixed hex, the form used as the decrypt result key.
    pub fn to_hex(&self) -> String {
        to_prefixed_hex(self.0)
    }

    /// Parse from hex (prefix optional).
    pub fn from_hex(s: &str) -> Result<Self> {
        let bytes = decode_hex(s)?;
        Self::try_from(bytes.as_slice())
    }

    /// The all-zero handle, used by contracts for uninitialized values.
    pub const ZERO: Self = Self([0u8; HANDLE_LEN]);

    /// Whether this is the uninitialized handle.
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; HANDLE_LEN]
    }
}

impl fmt::Debug for CiphertextHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CiphertextHandle({})", &hex::encode(self.0)[..16])
    }
}

impl fmt::Display for CiphertextHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl AsRef<[u8]> for CiphertextHandle {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; HANDLE_LEN]> for CiphertextHandle {
    fn from(bytes: [u8; HANDLE_LEN]) -> Self {
        Self(bytes)
    }
}

impl TryFrom<&[u8]> for CiphertextHandle {
    type Error = CoreError;

    fn try_from(slice: &[u8]) -> Result<Self> {
        let arr: [u8; HANDLE_LEN] = slice.try_into().map_err(|_| CoreError::InvalidLength {
            expected: HANDLE_LEN,
            actual: slice.len(),
        })?;
        Ok(Self(arr))
    }
}

/// Zero-knowledge input proof accompanying one or more ciphertext handles.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputProof(pub Vec<u8>);

impl InputProof {
    /// Get the raw bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// `0x`-prefixed hex.
    pub fn to_hex(&self) -> String {
        to_prefixed_hex(&self.0)
    }

    /// Parse from hex (prefix optional).
    pub fn from_hex(s: &str) -> Result<Self> {
        Ok(Self(decode_hex(s)?))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for InputProof {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "InputProof({} bytes)", self.0.len())
    }
}

/// An encrypted amount ready for on-chain submission.
///
/// Both fields are `0x`-prefixed hex. Payloads are single-use: the
/// ciphertext is randomized per encryption and must never be resubmitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CiphertextPayload {
    /// The `bytes32` ciphertext handle.
    pub handle: String,
    /// The `bytes` input proof.
    pub input_proof: String,
}

impl CiphertextPayload {
    /// Build the transport form from raw parts.
    pub fn new(handle: &CiphertextHandle, proof: &InputProof) -> Self {
        Self {
            handle: handle.to_hex(),
            input_proof: proof.to_hex(),
        }
    }

    /// Decode back into raw parts.
    pub fn decode(&self) -> Result<(CiphertextHandle, InputProof)> {
        Ok((
            CiphertextHandle::from_hex(&self.handle)?,
            InputProof::from_hex(&self.input_proof)?,
        ))
    }
}
