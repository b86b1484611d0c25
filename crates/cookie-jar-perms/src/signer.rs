//! The typed-data signing capability a decryption grant needs.
//!
//! In a browser this is the user's wallet and signing is an interactive
//! prompt; here it is a trait so that any key holder can stand in.

use std::sync::Arc;

use alloy_signer::{Signer, SignerSync};
use alloy_signer_local::PrivateKeySigner;
use async_trait::async_trait;

use cookie_jar_core::{to_prefixed_hex, Address, Eip712Payload};

use crate::error::{PermsError, Result};

/// Something that can sign EIP-712 typed data on behalf of an account.
#[async_trait]
pub trait TypedDataSigner: Send + Sync {
    /// The account the signer acts for.
    async fn address(&self) -> Result<Address>;

    /// Sign `payload`, returning the 65-byte signature as `0x`-prefixed hex.
    ///
    /// A user declining the prompt surfaces as [`PermsError::SigningRejected`].
    async fn sign_typed_data(&self, payload: &Eip712Payload) -> Result<String>;
}

#[async_trait]
impl TypedDataSigner for PrivateKeySigner {
    async fn address(&self) -> Result<Address> {
        Ok(Signer::address(self))
    }

    async fn sign_typed_data(&self, payload: &Eip712Payload) -> Result<String> {
        let signature = self
            .sign_hash_sync(&payload.signing_hash())
            .map_err(|e| PermsError::SigningRejected(e.to_string()))?;
        Ok(to_prefixed_hex(signature.as_bytes()))
    }
}

#[async_trait]
impl<S: TypedDataSigner + ?Sized> TypedDataSigner for Arc<S> {
    async fn address(&self) -> Result<Address> {
        (**self).address().await
    }

    async fn sign_typed_data(&self, payload: &Eip712Payload) -> Result<String> {
        (**self).sign_typed_data(payload).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cookie_jar_core::{decode_hex, DecryptionDomain, UserDecryptRequest};

    #[tokio::test]
    async fn test_signature_recovers_to_signer() {
        let signer = PrivateKeySigner::random();
        let payload = Eip712Payload::new(
            DecryptionDomain {
                chain_id: 55815,
                verifying_contract: Address::repeat_byte(0x11),
            },
            UserDecryptRequest {
                public_key: vec![7; 32],
                contract_addresses: vec![Address::repeat_byte(0x22)],
                start_timestamp: 1_700_000_000,
                duration_days: 365,
            },
        );

        let hex = TypedDataSigner::sign_typed_data(&signer, &payload)
            .await
            .unwrap();
        let bytes = decode_hex(&hex).unwrap();
        assert_eq!(bytes.len(), 65);

        let expected = TypedDataSigner::address(&signer).await.unwrap();
        assert_eq!(payload.recover_signer(&bytes).unwrap(), expected);
    }
}
