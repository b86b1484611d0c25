//! Recovering the plaintext total.
//!
//! `decrypt_total` reads the current total handle, obtains a grant for the
//! gateway's signer and exchanges handle plus grant for the plaintext.
//! `reveal_and_decrypt` first submits `revealTotal` and waits for it; that
//! transaction is what makes the handle decryptable for the caller.

use std::sync::Arc;

use cookie_jar_fhevm::HandleContractPair;
use cookie_jar_perms::AuthorizationCache;
use cookie_jar_store::StorageProvider;

use crate::client::EncryptionClient;
use crate::error::{CookieJarError, Result};
use crate::gateway::ContractGateway;

/// Orchestrates instance, grant and decrypt exchange.
pub struct DecryptionProtocol {
    client: Arc<EncryptionClient>,
    grants: AuthorizationCache<Arc<dyn StorageProvider>>,
}

impl DecryptionProtocol {
    pub fn new(client: Arc<EncryptionClient>, storage: Arc<dyn StorageProvider>) -> Self {
        Self {
            client,
            grants: AuthorizationCache::new(storage),
        }
    }

    pub fn grants(&self) -> &AuthorizationCache<Arc<dyn StorageProvider>> {
        &self.grants
    }

    /// Decrypt the gateway contract's current total.
    ///
    /// Fails with [`CookieJarError::DecryptionUnavailable`] when the
    /// decryption service does not return the handle, typically because the
    /// total has not been revealed to the signer.
    pub async fn decrypt_total(&self, gateway: &dyn ContractGateway) -> Result<u64> {
        let instance = self.client.ensure_instance().await?;
        let contract = gateway.address();

        let handle = gateway.encrypted_total().await?;
        let handle_hex = handle.to_hex();

        let signer = gateway.signer();
        let grant = self
            .grants
            .load_or_create(instance.as_ref(), &contract, signer.as_ref())
            .await?;

        let params = grant.decrypt_params(vec![HandleContractPair {
            handle: handle_hex.clone(),
            contract_address: contract,
        }])?;

        tracing::debug!(%contract, handle = %handle_hex, "requesting user decrypt");
        let values = instance.user_decrypt(params).await?;

        values
            .get(&handle_hex)
            .copied()
            .ok_or(CookieJarError::DecryptionUnavailable(handle_hex))
    }

    /// Submit `revealTotal`, wait for confirmation, then decrypt.
    pub async fn reveal_and_decrypt(&self, gateway: &dyn ContractGateway) -> Result<u64> {
        let tx = gateway.reveal_total().await?;
        let receipt = gateway.wait_for_transaction(tx).await?;
        tracing::debug!(tx = %tx, block = receipt.block_number, "reveal confirmed");

        self.decrypt_total(gateway).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_signer_local::PrivateKeySigner;
    use cookie_jar_core::Address;
    use cookie_jar_fhevm::{LocalCoprocessor, LocalDeployment, LocalFhevm};
    use cookie_jar_perms::cache_key;
    use cookie_jar_store::MemoryStorage;

    use crate::ciphertext::CiphertextBuilder;
    use crate::config::FhevmConfig;
    use crate::gateway::local::{LocalChain, LocalCookieJar};

    struct Fixture {
        protocol: DecryptionProtocol,
        builder: CiphertextBuilder,
        chain: Arc<LocalChain>,
        jar: Address,
        storage: Arc<MemoryStorage>,
    }

    fn fixture() -> Fixture {
        let deployment = LocalDeployment::default();
        let coprocessor = Arc::new(LocalCoprocessor::new(deployment.clone()));
        let chain = LocalChain::new(Arc::clone(&coprocessor));
        let jar = chain.deploy_cookie_jar().unwrap();

        let config = FhevmConfig::local(&deployment, jar);
        let client = Arc::new(EncryptionClient::new(
            config,
            Arc::new(LocalFhevm::new(coprocessor)),
        ));
        let storage = Arc::new(MemoryStorage::new());

        Fixture {
            protocol: DecryptionProtocol::new(Arc::clone(&client), storage.clone()),
            builder: CiphertextBuilder::new(client),
            chain,
            jar,
            storage,
        }
    }

    async fn contribute(f: &Fixture, gateway: &LocalCookieJar, amount: u64, user: Address) {
        let payload = f.builder.encrypt_amount(amount, &user).await.unwrap();
        let (handle, proof) = payload.decode().unwrap();
        let tx = gateway.add_cookies(&handle, &proof).await.unwrap();
        gateway.wait_for_transaction(tx).await.unwrap();
    }

    #[tokio::test]
    async fn test_decrypt_before_reveal_is_unavailable() {
        let f = fixture();
        let signer = PrivateKeySigner::random();
        let user = alloy_signer::Signer::address(&signer);
        let gateway = f.chain.connect(f.jar, signer);

        contribute(&f, &gateway, 3, user).await;

        let err = f.protocol.decrypt_total(&gateway).await.unwrap_err();
        assert!(matches!(err, CookieJarError::DecryptionUnavailable(_)));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_reveal_then_decrypt_sums_contributions() {
        let f = fixture();
        let alice = PrivateKeySigner::random();
        let bob = PrivateKeySigner::random();
        let alice_address = alloy_signer::Signer::address(&alice);
        let bob_address = alloy_signer::Signer::address(&bob);
        let alice_jar = f.chain.connect(f.jar, alice);
        let bob_jar = f.chain.connect(f.jar, bob);

        contribute(&f, &alice_jar, 3, alice_address).await;
        contribute(&f, &bob_jar, 5, bob_address).await;

        assert_eq!(f.protocol.reveal_and_decrypt(&bob_jar).await.unwrap(), 8);
    }

    #[tokio::test]
    async fn test_grant_is_cached_across_decrypts() {
        let f = fixture();
        let signer = PrivateKeySigner::random();
        let user = alloy_signer::Signer::address(&signer);
        let gateway = f.chain.connect(f.jar, signer);

        contribute(&f, &gateway, 2, user).await;
        f.protocol.reveal_and_decrypt(&gateway).await.unwrap();
        let first = f.storage.get(&cache_key(&user, &f.jar)).unwrap();

        assert_eq!(f.protocol.decrypt_total(&gateway).await.unwrap(), 2);
        let second = f.storage.get(&cache_key(&user, &f.jar)).unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_empty_jar_reveals_zero() {
        let f = fixture();
        let gateway = f.chain.connect(f.jar, PrivateKeySigner::random());
        assert_eq!(f.protocol.reveal_and_decrypt(&gateway).await.unwrap(), 0);
    }
}
