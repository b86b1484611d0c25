//! Ethereum address parsing and formatting.
//!
//! Acceptance follows the usual wallet rule: `0x` followed by 40 hex digits,
//! and if the digits use mixed case they must carry a valid EIP-55 checksum.

use alloy_primitives::Address;

use crate::error::{CoreError, Result};
use crate::types::to_prefixed_hex;

/// Parse a `0x`-prefixed address string.
pub fn parse_address(s: &str) -> Result<Address> {
    let body = s
        .strip_prefix("0x")
        .ok_or_else(|| CoreError::InvalidAddress(format!("missing 0x prefix: {s:?}")))?;

    if body.len() != 40 || !body.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(CoreError::InvalidAddress(format!(
            "expected 40 hex digits: {s:?}"
        )));
    }

    let has_lower = body.bytes().any(|b| b.is_ascii_lowercase());
    let has_upper = body.bytes().any(|b| b.is_ascii_uppercase());
    if has_lower && has_upper {
        return Address::parse_checksummed(s, None)
            .map_err(|_| CoreError::InvalidAddress(format!("bad checksum: {s:?}")));
    }

    let bytes = hex::decode(body)?;
    Ok(Address::from_slice(&bytes))
}

/// Whether `s` is a well-formed address.
pub fn is_address(s: &str) -> bool {
    parse_address(s).is_ok()
}

/// Lowercase `0x` form, used for cache keys and comparisons.
pub fn lowercase_address(address: &Address) -> String {
    to_prefixed_hex(address.as_slice())
}

/// EIP-55 checksummed form, used when presenting or persisting an address.
pub fn checksum_address(address: &Address) -> String {
    address.to_checksum(None)
}

/// Case-insensitive comparison of an address string against an address.
pub fn same_address(s: &str, address: &Address) -> bool {
    s.eq_ignore_ascii_case(&lowercase_address(address))
}
