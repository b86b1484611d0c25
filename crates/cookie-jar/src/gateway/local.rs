//! An automining in-process chain hosting cookie jar contracts.
//!
//! Transactions execute synchronously against a [`LocalCoprocessor`] and are
//! mined into their own block on submission. A reverted transaction still
//! gets a hash and a receipt; the revert surfaces when the receipt is
//! awaited.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use alloy_primitives::B256;
use alloy_signer_local::PrivateKeySigner;
use async_trait::async_trait;

use cookie_jar_core::{Address, CiphertextHandle, InputProof};
use cookie_jar_fhevm::{FheType, FhevmError, LocalCoprocessor};

use super::{ContractGateway, TxHash, TxReceipt, TxStatus, Wallet};
use crate::error::{CookieJarError, Result};
use crate::session::{CONNECT_WALLET_FIRST, WALLET_REQUIRED};

struct JarState {
    total: CiphertextHandle,
}

#[derive(Default)]
struct ChainState {
    block_number: u64,
    tx_count: u64,
    deployments: u64,
    jars: HashMap<Address, JarState>,
    receipts: HashMap<TxHash, TxReceipt>,
}

/// A single-node chain that mines every transaction immediately.
pub struct LocalChain {
    coprocessor: Arc<LocalCoprocessor>,
    state: Mutex<ChainState>,
}

impl LocalChain {
    pub fn new(coprocessor: Arc<LocalCoprocessor>) -> Arc<Self> {
        Arc::new(Self {
            coprocessor,
            state: Mutex::new(ChainState::default()),
        })
    }

    pub fn coprocessor(&self) -> &Arc<LocalCoprocessor> {
        &self.coprocessor
    }

    // Each transaction updates state under one guard, so a poisoned lock
    // never exposes a half-applied transaction.
    fn lock(&self) -> MutexGuard<'_, ChainState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Deploy a cookie jar whose total starts at an encrypted zero.
    pub fn deploy_cookie_jar(&self) -> Result<Address> {
        let mut state = self.lock();
        state.deployments += 1;

        let mut hasher = blake3::Hasher::new_derive_key("cookie-jar-local-chain-deploy-v0");
        hasher.update(&self.coprocessor.deployment().chain_id.to_be_bytes());
        hasher.update(&state.deployments.to_be_bytes());
        let address = Address::from_slice(&hasher.finalize().as_bytes()[..20]);

        let total = self.coprocessor.trivial_encrypt(0, FheType::Uint32, address)?;
        state.jars.insert(address, JarState { total });
        tracing::debug!(%address, "deployed cookie jar");
        Ok(address)
    }

    /// Current block height.
    pub fn block_number(&self) -> u64 {
        self.lock().block_number
    }

    /// Receipt of a mined transaction.
    pub fn receipt(&self, tx: &TxHash) -> Option<TxReceipt> {
        self.lock().receipts.get(tx).cloned()
    }

    /// Bind `jar` to `signer`.
    pub fn connect(self: &Arc<Self>, jar: Address, signer: PrivateKeySigner) -> LocalCookieJar {
        LocalCookieJar {
            chain: Arc::clone(self),
            address: jar,
            signer: Arc::new(signer),
        }
    }

    fn total_of(&self, jar: &Address) -> Result<CiphertextHandle> {
        self.lock()
            .jars
            .get(jar)
            .map(|j| j.total)
            .ok_or_else(|| CookieJarError::Gateway(format!("no contract at {jar}")))
    }

    /// Run `call` as a transaction from `from` to `jar` and mine it.
    fn transact<F>(&self, from: Address, jar: Address, call: F) -> TxHash
    where
        F: FnOnce(&LocalCoprocessor, &mut JarState) -> std::result::Result<(), String>,
    {
        let mut state = self.lock();
        state.tx_count += 1;
        state.block_number += 1;

        let mut hasher = blake3::Hasher::new_derive_key("cookie-jar-local-chain-tx-v0");
        hasher.update(from.as_slice());
        hasher.update(jar.as_slice());
        hasher.update(&state.tx_count.to_be_bytes());
        let tx_hash = B256::from(*hasher.finalize().as_bytes());

        let status = match state.jars.get_mut(&jar) {
            None => TxStatus::Reverted(format!("no contract at {jar}")),
            Some(jar_state) => match call(&self.coprocessor, jar_state) {
                Ok(()) => TxStatus::Success,
                Err(reason) => TxStatus::Reverted(reason),
            },
        };

        let receipt = TxReceipt {
            tx_hash,
            block_number: state.block_number,
            from,
            status,
        };
        tracing::debug!(
            tx = %tx_hash,
            block = receipt.block_number,
            status = ?receipt.status,
            "mined transaction"
        );
        state.receipts.insert(tx_hash, receipt);
        tx_hash
    }
}

fn revert(err: FhevmError) -> String {
    err.to_string()
}

/// A cookie jar on a [`LocalChain`], bound to one account.
pub struct LocalCookieJar {
    chain: Arc<LocalChain>,
    address: Address,
    signer: Arc<PrivateKeySigner>,
}

impl LocalCookieJar {
    pub fn chain(&self) -> &Arc<LocalChain> {
        &self.chain
    }

    fn sender(&self) -> Address {
        self.signer.address()
    }
}

#[async_trait]
impl ContractGateway for LocalCookieJar {
    fn address(&self) -> Address {
        self.address
    }

    async fn add_cookies(
        &self,
        encrypted_amount: &CiphertextHandle,
        input_proof: &InputProof,
    ) -> Result<TxHash> {
        let sender = self.sender();
        let contract = self.address;
        let tx = self.chain.transact(sender, contract, |fhe, jar| {
            let amount = fhe
                .verify_input(encrypted_amount, input_proof, contract, sender)
                .map_err(revert)?;
            let total = fhe.add(&jar.total, &amount, contract).map_err(revert)?;
            jar.total = total;
            Ok(())
        });
        tracing::debug!(tx = %tx, %sender, "submitted addCookies");
        Ok(tx)
    }

    async fn encrypted_total(&self) -> Result<CiphertextHandle> {
        self.chain.total_of(&self.address)
    }

    async fn reveal_total(&self) -> Result<TxHash> {
        let sender = self.sender();
        let tx = self.chain.transact(sender, self.address, |fhe, jar| {
            fhe.allow(&jar.total, sender);
            Ok(())
        });
        tracing::debug!(tx = %tx, %sender, "submitted revealTotal");
        Ok(tx)
    }

    async fn wait_for_transaction(&self, tx: TxHash) -> Result<TxReceipt> {
        let receipt = self
            .chain
            .receipt(&tx)
            .ok_or_else(|| CookieJarError::Gateway(format!("unknown transaction {tx}")))?;
        match &receipt.status {
            TxStatus::Success => Ok(receipt),
            TxStatus::Reverted(reason) => Err(CookieJarError::Gateway(format!(
                "transaction {tx} reverted: {reason}"
            ))),
        }
    }

    fn signer(&self) -> Arc<dyn cookie_jar_perms::TypedDataSigner> {
        self.signer.clone()
    }
}

/// A wallet on a [`LocalChain`].
///
/// The connected account and the provider that reaches the chain are
/// separate: an account can be connected while no provider is available.
pub struct LocalWallet {
    chain: Option<Arc<LocalChain>>,
    account: Option<PrivateKeySigner>,
}

impl LocalWallet {
    /// A wallet with `signer` connected.
    pub fn connected(chain: Arc<LocalChain>, signer: PrivateKeySigner) -> Self {
        Self {
            chain: Some(chain),
            account: Some(signer),
        }
    }

    /// A wallet with no account connected.
    pub fn disconnected(chain: Arc<LocalChain>) -> Self {
        Self {
            chain: Some(chain),
            account: None,
        }
    }

    /// An account connected with no provider to send transactions through.
    pub fn without_provider(signer: PrivateKeySigner) -> Self {
        Self {
            chain: None,
            account: Some(signer),
        }
    }
}

#[async_trait]
impl Wallet for LocalWallet {
    fn account(&self) -> Option<Address> {
        self.account.as_ref().map(|s| s.address())
    }

    async fn cookie_jar(&self, address: Address) -> Result<Arc<dyn ContractGateway>> {
        let signer = self
            .account
            .clone()
            .ok_or_else(|| CookieJarError::Precondition(CONNECT_WALLET_FIRST.into()))?;
        let chain = self
            .chain
            .as_ref()
            .ok_or_else(|| CookieJarError::Precondition(WALLET_REQUIRED.into()))?;
        Ok(Arc::new(chain.connect(address, signer)))
    }
}
