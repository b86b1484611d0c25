//! Ciphertext handle layout.
//!
//! A handle is 32 bytes:
//!
//! ```text
//! [0..21)  digest prefix
//! [21]     index of the value within its input (0xff for computed values)
//! [22..30) chain id, big-endian
//! [30]     FHE type id
//! [31]     handle format version
//! ```

use cookie_jar_core::{CiphertextHandle, HANDLE_LEN};

/// Current handle format version.
pub const HANDLE_VERSION: u8 = 0;

/// Index byte used for values produced by on-chain computation.
pub const COMPUTED_INDEX: u8 = 0xff;

const DIGEST_LEN: usize = 21;

/// Encrypted integer types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FheType {
    Bool,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
}

impl FheType {
    /// Type id stored in the handle.
    pub const fn id(self) -> u8 {
        match self {
            FheType::Bool => 0,
            FheType::Uint8 => 2,
            FheType::Uint16 => 3,
            FheType::Uint32 => 4,
            FheType::Uint64 => 5,
        }
    }

    pub const fn from_id(id: u8) -> Option<Self> {
        match id {
            0 => Some(FheType::Bool),
            2 => Some(FheType::Uint8),
            3 => Some(FheType::Uint16),
            4 => Some(FheType::Uint32),
            5 => Some(FheType::Uint64),
            _ => None,
        }
    }

    /// Bits this type contributes to an encrypted input.
    pub const fn bits(self) -> u32 {
        match self {
            FheType::Bool => 2,
            FheType::Uint8 => 8,
            FheType::Uint16 => 16,
            FheType::Uint32 => 32,
            FheType::Uint64 => 64,
        }
    }

    /// Reduce `value` into this type's range (wrapping arithmetic).
    pub const fn wrap(self, value: u64) -> u64 {
        match self {
            FheType::Bool => value & 1,
            FheType::Uint8 => value & 0xff,
            FheType::Uint16 => value & 0xffff,
            FheType::Uint32 => value & 0xffff_ffff,
            FheType::Uint64 => value,
        }
    }
}

/// Fields decoded from a handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandleInfo {
    pub index: u8,
    pub chain_id: u64,
    pub fhe_type: Option<FheType>,
    pub version: u8,
}

impl HandleInfo {
    pub fn parse(handle: &CiphertextHandle) -> Self {
        let bytes = handle.as_bytes();
        let mut chain = [0u8; 8];
        chain.copy_from_slice(&bytes[22..30]);
        Self {
            index: bytes[21],
            chain_id: u64::from_be_bytes(chain),
            fhe_type: FheType::from_id(bytes[30]),
            version: bytes[31],
        }
    }
}

/// Lay out a handle from a digest and its metadata.
pub fn compose_handle(
    digest: &[u8; 32],
    index: u8,
    chain_id: u64,
    fhe_type: FheType,
) -> CiphertextHandle {
    let mut out = [0u8; HANDLE_LEN];
    out[..DIGEST_LEN].copy_from_slice(&digest[..DIGEST_LEN]);
    out[21] = index;
    out[22..30].copy_from_slice(&chain_id.to_be_bytes());
    out[30] = fhe_type.id();
    out[31] = HANDLE_VERSION;
    CiphertextHandle::from_bytes(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn handle_fields_survive_any_digest(
            digest in any::<[u8; 32]>(),
            index in any::<u8>(),
            chain_id in any::<u64>(),
        ) {
            let info = HandleInfo::parse(&compose_handle(&digest, index, chain_id, FheType::Uint64));
            prop_assert_eq!(info.index, index);
            prop_assert_eq!(info.chain_id, chain_id);
            prop_assert_eq!(info.fhe_type, Some(FheType::Uint64));
        }
    }

    #[test]
    fn test_compose_and_parse() {
        let handle = compose_handle(&[0x5a; 32], 3, 11155111, FheType::Uint32);
        let info = HandleInfo::parse(&handle);

        assert_eq!(info.index, 3);
        assert_eq!(info.chain_id, 11155111);
        assert_eq!(info.fhe_type, Some(FheType::Uint32));
        assert_eq!(info.version, HANDLE_VERSION);
        assert_eq!(&handle.as_bytes()[..21], &[0x5a; 21]);
    }

    #[test]
    fn test_type_ids_roundtrip() {
        for t in [
            FheType::Bool,
            FheType::Uint8,
            FheType::Uint16,
            FheType::Uint32,
            FheType::Uint64,
        ] {
            assert_eq!(FheType::from_id(t.id()), Some(t));
        }
        assert_eq!(FheType::from_id(1), None);
    }

    #[test]
    fn test_wrap() {
        assert_eq!(FheType::Uint32.wrap(u64::from(u32::MAX) + 3), 2);
        assert_eq!(FheType::Uint8.wrap(256), 0);
        assert_eq!(FheType::Bool.wrap(3), 1);
    }
}
