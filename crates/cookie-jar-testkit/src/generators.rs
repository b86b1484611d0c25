//! Proptest generators for property-based testing.

use proptest::prelude::*;

use cookie_jar::{MAX_COOKIES, MIN_COOKIES};
use cookie_jar_core::{checksum_address, lowercase_address, Address};

/// A random address.
pub fn address() -> impl Strategy<Value = Address> {
    any::<[u8; 20]>().prop_map(Address::from)
}

/// An address rendered the way a wallet or a user might type it.
pub fn address_spelling(address: Address) -> impl Strategy<Value = String> {
    let lower = lowercase_address(&address);
    prop_oneof![
        Just(lower.clone()),
        Just(format!("0x{}", lower[2..].to_uppercase())),
        Just(checksum_address(&address)),
    ]
}

/// A contribution the jar accepts.
pub fn valid_amount() -> impl Strategy<Value = u64> {
    MIN_COOKIES..=MAX_COOKIES
}

/// A contribution the jar refuses.
pub fn invalid_amount() -> impl Strategy<Value = u64> {
    prop_oneof![Just(0u64), (MAX_COOKIES + 1)..=u64::MAX]
}

/// Any amount that fits the 32-bit encoding.
pub fn encodable_amount() -> impl Strategy<Value = u64> {
    0u64..=u64::from(u32::MAX)
}

/// A grant validity window: `(start_timestamp, duration_days)`.
pub fn grant_window() -> impl Strategy<Value = (u64, u64)> {
    (1_600_000_000u64..2_000_000_000, 1u64..=365)
}

/// Several contributions from distinct users.
pub fn contributions(max_users: usize) -> impl Strategy<Value = Vec<u64>> {
    prop::collection::vec(valid_amount(), 1..=max_users)
}
