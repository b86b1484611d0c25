//! The contract call surface.
//!
//! The cookie jar contract exposes three calls:
//!
//! ```text
//! function addCookies(bytes32 encryptedAmount, bytes inputProof)
//! function encryptedTotal() view returns (bytes32)
//! function revealTotal() returns (uint32)
//! ```
//!
//! A [`ContractGateway`] is one such contract bound to the account that
//! sends transactions and signs decryption grants. A [`Wallet`] hands out
//! gateways for its connected account.

pub mod local;

use std::sync::Arc;

use alloy_primitives::B256;
use async_trait::async_trait;

use cookie_jar_core::{Address, CiphertextHandle, InputProof};
use cookie_jar_perms::TypedDataSigner;

use crate::error::Result;

/// Transaction hash.
pub type TxHash = B256;

/// Outcome of a mined transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxStatus {
    Success,
    Reverted(String),
}

/// Receipt of a mined transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxReceipt {
    pub tx_hash: TxHash,
    pub block_number: u64,
    pub from: Address,
    pub status: TxStatus,
}

/// A cookie jar contract bound to a sending account.
#[async_trait]
pub trait ContractGateway: Send + Sync {
    /// Address of the contract.
    fn address(&self) -> Address;

    /// Submit `addCookies(encryptedAmount, inputProof)`.
    async fn add_cookies(
        &self,
        encrypted_amount: &CiphertextHandle,
        input_proof: &InputProof,
    ) -> Result<TxHash>;

    /// Read `encryptedTotal()`.
    async fn encrypted_total(&self) -> Result<CiphertextHandle>;

    /// Submit `revealTotal()`. The returned value of the call is not used;
    /// the plaintext comes from the decrypt exchange.
    async fn reveal_total(&self) -> Result<TxHash>;

    /// Block until `tx` is mined. A reverted transaction is an error.
    async fn wait_for_transaction(&self, tx: TxHash) -> Result<TxReceipt>;

    /// The signer behind the sending account, used for decryption grants.
    fn signer(&self) -> Arc<dyn TypedDataSigner>;
}

/// A wallet that may or may not have an account connected.
#[async_trait]
pub trait Wallet: Send + Sync {
    /// The connected account, if any.
    fn account(&self) -> Option<Address>;

    /// Bind the cookie jar at `address` to the connected account.
    async fn cookie_jar(&self, address: Address) -> Result<Arc<dyn ContractGateway>>;
}
