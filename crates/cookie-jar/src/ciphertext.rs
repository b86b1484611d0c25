//! Encrypting contributions.

use std::sync::Arc;

use cookie_jar_core::{Address, CiphertextPayload};

use crate::client::EncryptionClient;
use crate::error::{CookieJarError, Result};

/// Turns plaintext amounts into payloads the cookie jar contract accepts.
#[derive(Clone)]
pub struct CiphertextBuilder {
    client: Arc<EncryptionClient>,
}

impl CiphertextBuilder {
    pub fn new(client: Arc<EncryptionClient>) -> Self {
        Self { client }
    }

    /// Encrypt `amount` as a 32-bit value for submission by `user`.
    ///
    /// Only the encoding width is checked; business ranges are the caller's
    /// concern. Every call produces fresh ciphertext, so a payload must be
    /// submitted at most once.
    pub async fn encrypt_amount(&self, amount: u64, user: &Address) -> Result<CiphertextPayload> {
        let value = u32::try_from(amount).map_err(|_| CookieJarError::AmountOutOfRange {
            amount,
            min: 0,
            max: u64::from(u32::MAX),
        })?;

        let contract = self.client.config().cookie_jar()?;
        let instance = self.client.ensure_instance().await?;

        let inputs = instance
            .create_encrypted_input(contract, *user)
            .add32(value)
            .encrypt()
            .await?;
        let handle = inputs
            .handles
            .first()
            .ok_or_else(|| CookieJarError::Fhevm(cookie_jar_fhevm::FhevmError::EmptyInput))?;

        tracing::debug!(%contract, %user, handle = %handle, "encrypted contribution");
        Ok(CiphertextPayload::new(handle, &inputs.input_proof))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cookie_jar_core::HANDLE_LEN;
    use cookie_jar_fhevm::{FheType, HandleInfo, LocalCoprocessor, LocalDeployment, LocalFhevm};
    use proptest::prelude::*;

    const JAR: Address = Address::repeat_byte(0x77);
    const USER: Address = Address::repeat_byte(0x01);

    fn builder() -> (CiphertextBuilder, Arc<LocalCoprocessor>) {
        let deployment = LocalDeployment::default();
        let config = crate::config::FhevmConfig::local(&deployment, JAR);
        let coprocessor = Arc::new(LocalCoprocessor::new(deployment));
        let sdk = Arc::new(LocalFhevm::new(Arc::clone(&coprocessor)));
        let client = Arc::new(EncryptionClient::new(config, sdk));
        (CiphertextBuilder::new(client), coprocessor)
    }

    fn runtime() -> tokio::runtime::Runtime {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap()
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn any_u32_amount_encrypts(amount in any::<u32>()) {
            let (builder, _) = builder();
            let payload = runtime().block_on(builder.encrypt_amount(u64::from(amount), &USER)).unwrap();
            let (handle, proof) = payload.decode().unwrap();

            prop_assert_eq!(handle.as_bytes().len(), HANDLE_LEN);
            prop_assert!(!proof.is_empty());
            prop_assert_eq!(HandleInfo::parse(&handle).fhe_type, Some(FheType::Uint32));
        }
    }

    #[tokio::test]
    async fn test_same_amount_encrypts_differently() {
        let (builder, _) = builder();
        let a = builder.encrypt_amount(3, &USER).await.unwrap();
        let b = builder.encrypt_amount(3, &USER).await.unwrap();

        assert_ne!(a.handle, b.handle);
        assert_ne!(a.input_proof, b.input_proof);
        assert_eq!(a.handle.len(), b.handle.len());
    }

    #[tokio::test]
    async fn test_payload_verifies_for_jar_and_user() {
        let (builder, coprocessor) = builder();
        let payload = builder.encrypt_amount(5, &USER).await.unwrap();
        let (handle, proof) = payload.decode().unwrap();

        assert!(coprocessor.verify_input(&handle, &proof, JAR, USER).is_ok());
        assert!(coprocessor
            .verify_input(&handle, &proof, JAR, Address::repeat_byte(0x02))
            .is_err());
    }

    #[tokio::test]
    async fn test_rejects_amount_wider_than_32_bits() {
        let (builder, _) = builder();
        let err = builder
            .encrypt_amount(u64::from(u32::MAX) + 1, &USER)
            .await
            .unwrap_err();
        assert!(matches!(err, CookieJarError::AmountOutOfRange { .. }));
    }

    #[tokio::test]
    async fn test_missing_jar_address_is_configuration_error() {
        let deployment = LocalDeployment::default();
        let mut config = crate::config::FhevmConfig::local(&deployment, JAR);
        config.cookie_jar_address = "0xYourContractAddress".into();
        let sdk = Arc::new(LocalFhevm::new(Arc::new(LocalCoprocessor::new(deployment))));
        let builder = CiphertextBuilder::new(Arc::new(EncryptionClient::new(config, sdk)));

        let err = builder.encrypt_amount(1, &USER).await.unwrap_err();
        assert!(err.to_string().contains("COOKIE_JAR_ADDRESS"));
    }
}
