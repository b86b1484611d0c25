//! The persisted decryption grant.
//!
//! A grant is what a user's signature buys: a client-generated keypair plus
//! a signed statement that the holder of that keypair may decrypt values of
//! the listed contracts for a bounded number of days. The JSON form is the
//! cache record and uses camelCase field names.

use std::fmt;

use serde::{Deserialize, Serialize};

use cookie_jar_core::{checksum_address, parse_address, same_address, Address, DecryptionKeypair};
use cookie_jar_fhevm::{HandleContractPair, UserDecryptParams};

use crate::error::{PermsError, Result};

/// Seconds in one day of grant validity.
pub const SECONDS_PER_DAY: u64 = 86_400;

/// A signed, time-boxed permission for one user to decrypt values of
/// specific contracts.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizationGrant {
    /// Hex public key the decryption service seals results to.
    pub public_key: String,
    /// Hex private key that opens sealed results.
    pub private_key: String,
    /// Hex EIP-712 signature by `user_address`.
    pub signature: String,
    /// `0x`-prefixed address of the granting user.
    pub user_address: String,
    /// `0x`-prefixed addresses of the covered contracts.
    pub contract_addresses: Vec<String>,
    /// Issuance time, Unix seconds.
    pub start_timestamp: u64,
    pub duration_days: u64,
}

impl AuthorizationGrant {
    /// Assemble a grant from a freshly signed authorization.
    pub fn new(
        keypair: &DecryptionKeypair,
        signature: String,
        user: &Address,
        contracts: &[Address],
        start_timestamp: u64,
        duration_days: u64,
    ) -> Self {
        Self {
            public_key: keypair.public_key_hex(),
            private_key: keypair.private_key_hex(),
            signature,
            user_address: checksum_address(user),
            contract_addresses: contracts.iter().map(checksum_address).collect(),
            start_timestamp,
            duration_days,
        }
    }

    /// First second at which the grant is no longer valid.
    pub fn expires_at(&self) -> u64 {
        self.start_timestamp
            .saturating_add(self.duration_days.saturating_mul(SECONDS_PER_DAY))
    }

    /// Whether the grant is still valid at `now` (Unix seconds).
    pub fn is_valid_at(&self, now: u64) -> bool {
        now < self.expires_at()
    }

    /// Whether this grant was issued by `user` for `contract`.
    ///
    /// Only the first covered contract is compared; grants issued here cover
    /// exactly one.
    pub fn matches(&self, user: &Address, contract: &Address) -> bool {
        same_address(&self.user_address, user)
            && self
                .contract_addresses
                .first()
                .is_some_and(|first| same_address(first, contract))
    }

    /// Parsed user address.
    pub fn user(&self) -> Result<Address> {
        parse_address(&self.user_address).map_err(|e| PermsError::InvalidGrant(e.to_string()))
    }

    /// Parsed covered contracts.
    pub fn contracts(&self) -> Result<Vec<Address>> {
        self.contract_addresses
            .iter()
            .map(|s| parse_address(s).map_err(|e| PermsError::InvalidGrant(e.to_string())))
            .collect()
    }

    /// Arguments for a user-decrypt exchange over `pairs`.
    pub fn decrypt_params(&self, pairs: Vec<HandleContractPair>) -> Result<UserDecryptParams> {
        Ok(UserDecryptParams {
            pairs,
            private_key: self.private_key.clone(),
            public_key: self.public_key.clone(),
            signature: self.signature.clone(),
            contract_addresses: self.contracts()?,
            user_address: self.user()?,
            start_timestamp: self.start_timestamp,
            duration_days: self.duration_days,
        })
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(s: &str) -> Result<Self> {
        Ok(serde_json::from_str(s)?)
    }
}

impl fmt::Debug for AuthorizationGrant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthorizationGrant")
            .field("public_key", &self.public_key)
            .field("user_address", &self.user_address)
            .field("contract_addresses", &self.contract_addresses)
            .field("start_timestamp", &self.start_timestamp)
            .field("duration_days", &self.duration_days)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const USER: Address = Address::repeat_byte(0xab);
    const CONTRACT: Address = Address::repeat_byte(0xcd);

    fn grant(start: u64, days: u64) -> AuthorizationGrant {
        AuthorizationGrant::new(
            &DecryptionKeypair::generate(),
            "0x00".into(),
            &USER,
            &[CONTRACT],
            start,
            days,
        )
    }

    proptest! {
        #[test]
        fn validity_window_is_half_open(start in 0u64..4_000_000_000, days in 1u64..=365, offset in 0u64..(366 * SECONDS_PER_DAY)) {
            let g = grant(start, days);
            let now = start + offset;
            prop_assert_eq!(g.is_valid_at(now), offset < days * SECONDS_PER_DAY);
        }
    }

    #[test]
    fn test_expiry_boundary() {
        let g = grant(1_000, 1);
        assert!(g.is_valid_at(1_000));
        assert!(g.is_valid_at(1_000 + SECONDS_PER_DAY - 1));
        assert!(!g.is_valid_at(1_000 + SECONDS_PER_DAY));
    }

    #[test]
    fn test_matches_is_case_insensitive() {
        let mut g = grant(0, 365);
        g.user_address = g.user_address.to_lowercase();
        g.contract_addresses[0] = g.contract_addresses[0].to_uppercase().replace("0X", "0x");
        assert!(g.matches(&USER, &CONTRACT));
    }

    #[test]
    fn test_matches_rejects_other_user_or_contract() {
        let g = grant(0, 365);
        assert!(!g.matches(&CONTRACT, &CONTRACT));
        assert!(!g.matches(&USER, &USER));

        let mut empty = g.clone();
        empty.contract_addresses.clear();
        assert!(!empty.matches(&USER, &CONTRACT));
    }

    #[test]
    fn test_json_uses_record_field_names() {
        let g = grant(42, 365);
        let json = g.to_json().unwrap();
        for field in [
            "\"publicKey\"",
            "\"privateKey\"",
            "\"signature\"",
            "\"userAddress\"",
            "\"contractAddresses\"",
            "\"startTimestamp\":42",
            "\"durationDays\":365",
        ] {
            assert!(json.contains(field), "missing {field} in {json}");
        }
        assert_eq!(AuthorizationGrant::from_json(&json).unwrap(), g);
    }

    #[test]
    fn test_debug_hides_secrets() {
        let g = grant(0, 365);
        let debug = format!("{g:?}");
        assert!(!debug.contains(&g.private_key));
    }

    #[test]
    fn test_decrypt_params_carry_grant_fields() {
        let g = grant(7, 365);
        let params = g
            .decrypt_params(vec![HandleContractPair {
                handle: "0x01".into(),
                contract_address: CONTRACT,
            }])
            .unwrap();
        assert_eq!(params.user_address, USER);
        assert_eq!(params.contract_addresses, vec![CONTRACT]);
        assert_eq!(params.start_timestamp, 7);
        assert_eq!(params.private_key, g.private_key);
    }
}
