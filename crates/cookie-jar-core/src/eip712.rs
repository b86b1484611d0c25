//! EIP-712 typed data for user-decryption authorization.
//!
//! A decryption grant is a signature over a `UserDecryptRequestVerification`
//! message: the grant's public key, the contracts it covers, and its validity
//! window. The domain binds the signature to the decryption verifying
//! contract on the gateway chain.

use std::borrow::Cow;

use alloy_primitives::{Address, Bytes, Signature, B256, U256};
use alloy_sol_types::{sol, Eip712Domain, SolStruct};

use crate::error::{CoreError, Result};

sol! {
    struct UserDecryptRequestVerification {
        bytes publicKey;
        address[] contractAddresses;
        uint256 startTimestamp;
        uint256 durationDays;
        bytes extraData;
    }
}

/// Domain name used by the decryption verifying contract.
pub const DOMAIN_NAME: &str = "Decryption";

/// Domain version used by the decryption verifying contract.
pub const DOMAIN_VERSION: &str = "1";

/// Primary type of the signed message.
pub const PRIMARY_TYPE: &str = "UserDecryptRequestVerification";

/// The EIP-712 domain of a decryption grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecryptionDomain {
    /// Gateway chain id.
    pub chain_id: u64,
    /// Decryption verifying contract.
    pub verifying_contract: Address,
}

impl DecryptionDomain {
    pub fn to_eip712(&self) -> Eip712Domain {
        Eip712Domain::new(
            Some(Cow::Borrowed(DOMAIN_NAME)),
            Some(Cow::Borrowed(DOMAIN_VERSION)),
            Some(U256::from(self.chain_id)),
            Some(self.verifying_contract),
            None,
        )
    }
}

/// The message fields of a decryption grant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserDecryptRequest {
    pub public_key: Vec<u8>,
    pub contract_addresses: Vec<Address>,
    /// Unix seconds.
    pub start_timestamp: u64,
    pub duration_days: u64,
}

/// A complete typed-data payload: domain plus message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Eip712Payload {
    pub domain: DecryptionDomain,
    pub message: UserDecryptRequest,
}

impl Eip712Payload {
    pub fn new(domain: DecryptionDomain, message: UserDecryptRequest) -> Self {
        Self { domain, message }
    }

    pub fn primary_type(&self) -> &'static str {
        PRIMARY_TYPE
    }

    /// The 32-byte digest a wallet signs.
    pub fn signing_hash(&self) -> B256 {
        let message = UserDecryptRequestVerification {
            publicKey: Bytes::copy_from_slice(&self.message.public_key),
            contractAddresses: self.message.contract_addresses.clone(),
            startTimestamp: U256::from(self.message.start_timestamp),
            durationDays: U256::from(self.message.duration_days),
            extraData: Bytes::new(),
        };
        message.eip712_signing_hash(&self.domain.to_eip712())
    }

    /// Recover the address that produced `signature` over this payload.
    pub fn recover_signer(&self, signature: &[u8]) -> Result<Address> {
        let signature = Signature::try_from(signature)
            .map_err(|e| CoreError::InvalidSignature(e.to_string()))?;
        signature
            .recover_address_from_prehash(&self.signing_hash())
            .map_err(|e| CoreError::InvalidSignature(e.to_string()))
    }
}
