//! Test fixtures and helpers.
//!
//! A [`Devnet`] is a complete local deployment: coprocessor, automining
//! chain, one deployed cookie jar, and an SDK pointed at all of it.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use alloy_primitives::B256;
use alloy_signer::Signer;
use alloy_signer_local::PrivateKeySigner;
use async_trait::async_trait;

use cookie_jar::{
    CookieJarSession, EncryptionClient, FhevmConfig, LocalChain, LocalCookieJar, LocalWallet,
};
use cookie_jar_core::{Address, Eip712Payload};
use cookie_jar_fhevm::{LocalCoprocessor, LocalDeployment, LocalFhevm};
use cookie_jar_perms::{PermsError, TypedDataSigner};
use cookie_jar_store::{MemoryStorage, StorageProvider};

/// A local deployment hosting one cookie jar.
pub struct Devnet {
    pub deployment: LocalDeployment,
    pub coprocessor: Arc<LocalCoprocessor>,
    pub chain: Arc<LocalChain>,
    pub sdk: Arc<LocalFhevm>,
    pub jar: Address,
    pub config: FhevmConfig,
}

impl Devnet {
    /// Spin up a devnet on the default chain ids.
    pub fn new() -> anyhow::Result<Self> {
        Self::build(LocalDeployment::default(), None)
    }

    /// Spin up a devnet whose SDK is slow to construct instances.
    pub fn with_construction_delay(delay: Duration) -> anyhow::Result<Self> {
        Self::build(LocalDeployment::default(), Some(delay))
    }

    fn build(deployment: LocalDeployment, delay: Option<Duration>) -> anyhow::Result<Self> {
        let coprocessor = Arc::new(LocalCoprocessor::new(deployment.clone()));
        let chain = LocalChain::new(Arc::clone(&coprocessor));
        let jar = chain.deploy_cookie_jar()?;

        let mut sdk = LocalFhevm::new(Arc::clone(&coprocessor));
        if let Some(delay) = delay {
            sdk = sdk.with_construction_delay(delay);
        }

        Ok(Self {
            config: FhevmConfig::local(&deployment, jar),
            deployment,
            coprocessor,
            chain,
            sdk: Arc::new(sdk),
            jar,
        })
    }

    /// A fresh client (its own instance cell) for this devnet.
    pub fn client(&self) -> Arc<EncryptionClient> {
        Arc::new(EncryptionClient::new(self.config.clone(), self.sdk.clone()))
    }

    /// The jar bound to `signer`.
    pub fn gateway(&self, signer: PrivateKeySigner) -> LocalCookieJar {
        self.chain.connect(self.jar, signer)
    }

    /// A session for `signer` with in-memory grant storage.
    pub fn session(&self, signer: PrivateKeySigner) -> CookieJarSession {
        self.session_with_storage(signer, Arc::new(MemoryStorage::new()))
    }

    /// A session for `signer` over the given grant storage.
    pub fn session_with_storage(
        &self,
        signer: PrivateKeySigner,
        storage: Arc<dyn StorageProvider>,
    ) -> CookieJarSession {
        let wallet = LocalWallet::connected(Arc::clone(&self.chain), signer);
        CookieJarSession::new(self.client(), storage, Some(Arc::new(wallet)))
    }

    /// A session whose wallet has no account connected.
    pub fn disconnected_session(&self) -> CookieJarSession {
        let wallet = LocalWallet::disconnected(Arc::clone(&self.chain));
        CookieJarSession::new(
            self.client(),
            Arc::new(MemoryStorage::new()),
            Some(Arc::new(wallet)),
        )
    }
}

/// Deterministic wallet derived from `seed`.
pub fn wallet_from_seed(seed: &[u8]) -> anyhow::Result<PrivateKeySigner> {
    let key = blake3::derive_key("cookie-jar-testkit-wallet-v0", seed);
    PrivateKeySigner::from_bytes(&B256::from(key)).map_err(|e| anyhow::anyhow!("wallet seed: {e}"))
}

/// Deterministic wallets for a multi-party scenario.
pub fn participants(count: u8) -> anyhow::Result<Vec<PrivateKeySigner>> {
    (0..count).map(|i| wallet_from_seed(&[i])).collect()
}

/// Address of a local wallet.
pub fn address_of(signer: &PrivateKeySigner) -> Address {
    Signer::address(signer)
}

/// A signer that counts signature requests.
pub struct CountingSigner {
    inner: PrivateKeySigner,
    signatures: AtomicUsize,
}

impl CountingSigner {
    pub fn new(inner: PrivateKeySigner) -> Self {
        Self {
            inner,
            signatures: AtomicUsize::new(0),
        }
    }

    /// Number of signatures produced so far.
    pub fn signatures(&self) -> usize {
        self.signatures.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TypedDataSigner for CountingSigner {
    async fn address(&self) -> cookie_jar_perms::Result<Address> {
        Ok(Signer::address(&self.inner))
    }

    async fn sign_typed_data(&self, payload: &Eip712Payload) -> cookie_jar_perms::Result<String> {
        self.signatures.fetch_add(1, Ordering::SeqCst);
        TypedDataSigner::sign_typed_data(&self.inner, payload).await
    }
}

/// A signer whose user always declines the prompt.
pub struct DecliningSigner {
    pub address: Address,
}

#[async_trait]
impl TypedDataSigner for DecliningSigner {
    async fn address(&self) -> cookie_jar_perms::Result<Address> {
        Ok(self.address)
    }

    async fn sign_typed_data(&self, _payload: &Eip712Payload) -> cookie_jar_perms::Result<String> {
        Err(PermsError::SigningRejected("User rejected the request.".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wallets_are_deterministic() {
        let a = wallet_from_seed(b"alice").unwrap();
        let b = wallet_from_seed(b"alice").unwrap();
        let c = wallet_from_seed(b"bob").unwrap();

        assert_eq!(address_of(&a), address_of(&b));
        assert_ne!(address_of(&a), address_of(&c));
    }

    #[test]
    fn test_participants_are_distinct() {
        let wallets = participants(4).unwrap();
        let mut addresses: Vec<_> = wallets.iter().map(address_of).collect();
        addresses.sort();
        addresses.dedup();
        assert_eq!(addresses.len(), 4);
    }

    #[test]
    fn test_devnet_config_is_valid() {
        let net = Devnet::new().unwrap();
        assert!(net.config.instance_config().is_ok());
        assert_eq!(net.config.cookie_jar().unwrap(), net.jar);
    }
}
