//! One user's view of the cookie jar.
//!
//! A [`CookieJarSession`] ties the client, the grant cache and a wallet
//! together and offers the three user actions: contribute, read the total,
//! reveal the total. The last total seen is kept so a UI can render it
//! without another decrypt.

use std::sync::{Arc, Mutex};

use cookie_jar_core::Address;
use cookie_jar_fhevm::FhevmSdk;
use cookie_jar_store::{resolve_storage, StorageProvider};

use crate::ciphertext::CiphertextBuilder;
use crate::client::EncryptionClient;
use crate::config::FhevmConfig;
use crate::decrypt::DecryptionProtocol;
use crate::error::{CookieJarError, Result};
use crate::gateway::{ContractGateway, TxHash, TxReceipt, Wallet};

/// Fewest cookies accepted per contribution.
pub const MIN_COOKIES: u64 = 1;

/// Most cookies accepted per contribution.
pub const MAX_COOKIES: u64 = 5;

pub const CONNECT_WALLET_FIRST: &str = "Connect a wallet first";
pub const WALLET_REQUIRED: &str = "A browser wallet is required";

/// Cookie jar actions for the connected account of one wallet.
pub struct CookieJarSession {
    client: Arc<EncryptionClient>,
    builder: CiphertextBuilder,
    protocol: DecryptionProtocol,
    wallet: Option<Arc<dyn Wallet>>,
    cached_total: Mutex<Option<u64>>,
}

impl CookieJarSession {
    pub fn new(
        client: Arc<EncryptionClient>,
        storage: Arc<dyn StorageProvider>,
        wallet: Option<Arc<dyn Wallet>>,
    ) -> Self {
        Self {
            builder: CiphertextBuilder::new(Arc::clone(&client)),
            protocol: DecryptionProtocol::new(Arc::clone(&client), storage),
            client,
            wallet,
            cached_total: Mutex::new(None),
        }
    }

    /// Build a session from configuration, with grants stored at the
    /// configured path when it can be opened and in memory otherwise.
    pub fn from_config(
        config: FhevmConfig,
        sdk: Arc<dyn FhevmSdk>,
        wallet: Option<Arc<dyn Wallet>>,
    ) -> Self {
        let storage = resolve_storage(config.storage_path.as_deref());
        tracing::debug!(backend = ?storage.backend, "grant storage resolved");
        let client = Arc::new(EncryptionClient::new(config, sdk));
        Self::new(client, storage.provider, wallet)
    }

    pub fn client(&self) -> &Arc<EncryptionClient> {
        &self.client
    }

    pub fn protocol(&self) -> &DecryptionProtocol {
        &self.protocol
    }

    /// The connected account, if a wallet is present and connected.
    pub fn address(&self) -> Option<Address> {
        self.wallet.as_ref().and_then(|w| w.account())
    }

    pub fn is_connected(&self) -> bool {
        self.address().is_some()
    }

    /// Last total obtained by [`total`](Self::total) or
    /// [`reveal_total`](Self::reveal_total), cleared by a contribution.
    pub fn cached_total(&self) -> Option<u64> {
        *self.cached_total.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn set_cached_total(&self, value: Option<u64>) {
        *self.cached_total.lock().unwrap_or_else(|e| e.into_inner()) = value;
    }

    async fn gateway(&self) -> Result<(Address, Arc<dyn ContractGateway>)> {
        // The account is checked before the wallet is asked for a provider.
        let (wallet, user) = self
            .wallet
            .as_ref()
            .and_then(|w| w.account().map(|user| (w, user)))
            .ok_or_else(|| CookieJarError::Precondition(CONNECT_WALLET_FIRST.into()))?;
        let jar = self.client.config().cookie_jar()?;
        Ok((user, wallet.cookie_jar(jar).await?))
    }

    /// Encrypt and submit a contribution of `amount` cookies.
    ///
    /// Returns once the transaction is submitted. Each call sends a new
    /// transaction; preventing double submission is up to the caller.
    pub async fn add_cookies(&self, amount: u64) -> Result<TxHash> {
        let (user, gateway) = self.gateway().await?;
        if !(MIN_COOKIES..=MAX_COOKIES).contains(&amount) {
            return Err(CookieJarError::AmountOutOfRange {
                amount,
                min: MIN_COOKIES,
                max: MAX_COOKIES,
            });
        }

        let payload = self.builder.encrypt_amount(amount, &user).await?;
        let (handle, proof) = payload.decode()?;
        let tx = gateway.add_cookies(&handle, &proof).await?;

        self.set_cached_total(None);
        tracing::info!(%user, tx = %tx, "cookies added");
        Ok(tx)
    }

    /// Wait for a transaction sent through this session.
    pub async fn confirm(&self, tx: TxHash) -> Result<TxReceipt> {
        let (_, gateway) = self.gateway().await?;
        gateway.wait_for_transaction(tx).await
    }

    /// Decrypt the current total without revealing it first.
    pub async fn total(&self) -> Result<u64> {
        let (_, gateway) = self.gateway().await?;
        let total = self.protocol.decrypt_total(gateway.as_ref()).await?;
        self.set_cached_total(Some(total));
        Ok(total)
    }

    /// Reveal the total to the connected account and decrypt it.
    pub async fn reveal_total(&self) -> Result<u64> {
        let (user, gateway) = self.gateway().await?;
        let total = self.protocol.reveal_and_decrypt(gateway.as_ref()).await?;
        self.set_cached_total(Some(total));
        tracing::info!(%user, "total revealed");
        Ok(total)
    }
}
