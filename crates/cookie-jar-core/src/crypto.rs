//! Sealing primitives for user decryption.
//!
//! The user-decrypt exchange never returns a plaintext in the clear: the
//! decryption service seals each value to the requester's X25519 public key
//! (ephemeral ECDH, Blake3 key derivation, ChaCha20-Poly1305), and only the
//! holder of the matching private key can open it.

use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Nonce,
};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt;
use x25519_dalek::{EphemeralSecret, PublicKey, StaticSecret};

use crate::error::{CoreError, Result};
use crate::types::{decode_hex, to_prefixed_hex};

const SEAL_DOMAIN: &str = "cookie-jar-v0-user-decrypt";

/// An X25519 public key (32 bytes).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct X25519PublicKey(pub [u8; 32]);

impl X25519PublicKey {
    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// `0x`-prefixed hex.
    pub fn to_hex(&self) -> String {
        to_prefixed_hex(self.0)
    }

    /// Parse from hex (prefix optional).
    pub fn from_hex(s: &str) -> Result<Self> {
        Ok(Self(to_array(&decode_hex(s)?)?))
    }

    fn to_dalek(self) -> PublicKey {
        PublicKey::from(self.0)
    }
}

impl fmt::Debug for X25519PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "X25519Pub({})", &hex::encode(self.0)[..16])
    }
}

impl From<PublicKey> for X25519PublicKey {
    fn from(pk: PublicKey) -> Self {
        Self(*pk.as_bytes())
    }
}

/// The client-side keypair a decryption grant is scoped to.
///
/// Generated fresh for every grant. The private half is persisted alongside
/// the grant so that later sessions can open sealed results without asking
/// the user to sign again.
#[derive(Clone)]
pub struct DecryptionKeypair {
    secret: StaticSecret,
    public: X25519PublicKey,
}

impl DecryptionKeypair {
    /// Generate a new random keypair.
    pub fn generate() -> Self {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self::from_secret_bytes(bytes)
    }

    /// Rebuild from the raw private key.
    pub fn from_secret_bytes(bytes: [u8; 32]) -> Self {
        let secret = StaticSecret::from(bytes);
        let public = X25519PublicKey::from(PublicKey::from(&secret));
        Self { secret, public }
    }

    /// Rebuild from the hex form stored in a grant.
    pub fn from_private_hex(s: &str) -> Result<Self> {
        Ok(Self::from_secret_bytes(to_array(&decode_hex(s)?)?))
    }

    pub fn public_key(&self) -> X25519PublicKey {
        self.public
    }

    pub fn public_key_hex(&self) -> String {
        self.public.to_hex()
    }

    pub fn private_key_hex(&self) -> String {
        to_prefixed_hex(self.secret.to_bytes())
    }

    /// Open a value sealed to this keypair.
    ///
    /// `context` must match the one used when sealing (the ciphertext handle).
    pub fn open(&self, sealed: &SealedValue, context: &[u8]) -> Result<Vec<u8>> {
        let shared = self.secret.diffie_hellman(&sealed.ephemeral_public.to_dalek());
        let key = derive_key(shared.as_bytes(), context);
        key.decrypt(&sealed.ciphertext, &sealed.nonce)
    }
}

impl fmt::Debug for DecryptionKeypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DecryptionKeypair({:?})", self.public)
    }
}

/// A 256-bit symmetric key for ChaCha20-Poly1305.
#[derive(Clone)]
pub struct EncryptionKey([u8; 32]);

impl EncryptionKey {
    /// Generate a new random key.
    pub fn generate() -> Self {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Encrypt data with this key.
    pub fn encrypt(&self, plaintext: &[u8], nonce: &EncryptionNonce) -> Result<Vec<u8>> {
        let cipher = ChaCha20Poly1305::new_from_slice(&self.0)
            .map_err(|e| CoreError::EncryptionError(e.to_string()))?;

        cipher
            .encrypt(Nonce::from_slice(&nonce.0), plaintext)
            .map_err(|e| CoreError::EncryptionError(e.to_string()))
    }

    /// Decrypt data with this key.
    pub fn decrypt(&self, ciphertext: &[u8], nonce: &EncryptionNonce) -> Result<Vec<u8>> {
        let cipher = ChaCha20Poly1305::new_from_slice(&self.0)
            .map_err(|e| CoreError::DecryptionError(e.to_string()))?;

        cipher
            .decrypt(Nonce::from_slice(&nonce.0), ciphertext)
            .map_err(|e| CoreError::DecryptionError(e.to_string()))
    }
}

/// A 96-bit nonce for ChaCha20-Poly1305.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptionNonce(pub [u8; 12]);

impl EncryptionNonce {
    /// Generate a new random nonce.
    pub fn generate() -> Self {
        let mut bytes = [0u8; 12];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(bytes)
    }

    pub const fn as_bytes(&self) -> &[u8; 12] {
        &self.0
    }
}

/// A value sealed to a [`DecryptionKeypair`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealedValue {
    /// Sender's one-time public key.
    pub ephemeral_public: X25519PublicKey,
    pub nonce: EncryptionNonce,
    /// Ciphertext including the authentication tag.
    pub ciphertext: Vec<u8>,
}

impl SealedValue {
    /// Seal `plaintext` to `recipient`, bound to `context`.
    pub fn seal(plaintext: &[u8], recipient: &X25519PublicKey, context: &[u8]) -> Result<Self> {
        let ephemeral = EphemeralSecret::random_from_rng(rand::thread_rng());
        let ephemeral_public = X25519PublicKey::from(PublicKey::from(&ephemeral));
        let shared = ephemeral.diffie_hellman(&recipient.to_dalek());

        let key = derive_key(shared.as_bytes(), context);
        let nonce = EncryptionNonce::generate();
        let ciphertext = key.encrypt(plaintext, &nonce)?;

        Ok(Self {
            ephemeral_public,
            nonce,
            ciphertext,
        })
    }

    /// Bytes covered by the decryption service's response signature.
    pub fn signed_bytes(&self, context: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(context.len() + 32 + 12 + self.ciphertext.len());
        out.extend_from_slice(context);
        out.extend_from_slice(self.ephemeral_public.as_bytes());
        out.extend_from_slice(self.nonce.as_bytes());
        out.extend_from_slice(&self.ciphertext);
        out
    }
}

fn derive_key(shared: &[u8; 32], context: &[u8]) -> EncryptionKey {
    let mut hasher = blake3::Hasher::new_derive_key(SEAL_DOMAIN);
    hasher.update(shared);
    hasher.update(context);
    EncryptionKey(*hasher.finalize().as_bytes())
}

fn to_array(bytes: &[u8]) -> Result<[u8; 32]> {
    bytes.try_into().map_err(|_| CoreError::InvalidLength {
        expected: 32,
        actual: bytes.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seal_open() {
        let recipient = DecryptionKeypair::generate();
        let sealed = SealedValue::seal(b"8", &recipient.public_key(), b"handle").unwrap();

        assert_eq!(recipient.open(&sealed, b"handle").unwrap(), b"8");
    }

    #[test]
    fn test_open_with_wrong_key_fails() {
        let recipient = DecryptionKeypair::generate();
        let other = DecryptionKeypair::generate();
        let sealed = SealedValue::seal(b"secret", &recipient.public_key(), b"ctx").unwrap();

        assert!(other.open(&sealed, b"ctx").is_err());
    }

    #[test]
    fn test_open_with_wrong_context_fails() {
        let recipient = DecryptionKeypair::generate();
        let sealed = SealedValue::seal(b"secret", &recipient.public_key(), b"ctx-a").unwrap();

        assert!(recipient.open(&sealed, b"ctx-b").is_err());
    }

    #[test]
    fn test_keypair_hex_roundtrip() {
        let keypair = DecryptionKeypair::generate();
        let restored = DecryptionKeypair::from_private_hex(&keypair.private_key_hex()).unwrap();

        assert_eq!(restored.public_key(), keypair.public_key());
        assert_eq!(
            X25519PublicKey::from_hex(&keypair.public_key_hex()).unwrap(),
            keypair.public_key()
        );
    }

    #[test]
    fn test_sealing_is_randomized() {
        let recipient = DecryptionKeypair::generate();
        let a = SealedValue::seal(b"5", &recipient.public_key(), b"h").unwrap();
        let b = SealedValue::seal(b"5", &recipient.public_key(), b"h").unwrap();
        assert_ne!(a.ciphertext, b.ciphertext);
    }
}
