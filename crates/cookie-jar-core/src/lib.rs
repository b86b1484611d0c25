//! # Cookie Jar Core
//!
//! Pure primitives for the Cookie Jar encrypted value pipeline.
//!
//! This crate contains no I/O, no storage, no networking. It defines the
//! strong types that cross the contract and relayer boundaries and the
//! cryptography shared by the client and the decryption service.
//!
//! ## Key Types
//!
//! - [`CiphertextHandle`] - 32-byte reference to an encrypted value
//! - [`InputProof`] - proof accompanying freshly encrypted inputs
//! - [`CiphertextPayload`] - hex transport form of handle + proof
//! - [`Eip712Payload`] - the typed data a user signs to authorize decryption
//! - [`DecryptionKeypair`] / [`SealedValue`] - how decrypted values travel back
//!
//! ## Addresses
//!
//! Addresses are [`alloy_primitives::Address`]. Parsing follows wallet rules
//! (see [`parse_address`]); cache keys and comparisons use the lowercase form.

pub mod address;
pub mod crypto;
pub mod eip712;
pub mod error;
pub mod types;

pub use address::{checksum_address, is_address, lowercase_address, parse_address, same_address};
pub use alloy_primitives::Address;
pub use crypto::{DecryptionKeypair, EncryptionKey, EncryptionNonce, SealedValue, X25519PublicKey};
pub use eip712::{DecryptionDomain, Eip712Payload, UserDecryptRequest};
pub use error::{CoreError, Result};
pub use types::{
    decode_hex, to_prefixed_hex, unix_seconds, CiphertextHandle, CiphertextPayload, InputProof,
    HANDLE_LEN,
};
