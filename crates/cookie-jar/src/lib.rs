//! # Cookie Jar
//!
//! Client for a confidential cookie jar contract on an fhEVM chain.
//!
//! ## Overview
//!
//! Contributors add encrypted amounts; nobody, the contract included, sees
//! individual contributions or the running total. Anyone may reveal the
//! total to themselves, after which they can decrypt it with a signed
//! authorization.
//!
//! ```text
//! contribute:  CiphertextBuilder -> ContractGateway::add_cookies
//! reveal:      ContractGateway::reveal_total (confirmed)
//!              -> DecryptionProtocol -> AuthorizationCache + EncryptionClient
//!              -> plaintext total
//! ```
//!
//! ## Key Types
//!
//! - [`EncryptionClient`] - lazily built, shared FHE instance
//! - [`CiphertextBuilder`] - encrypts amounts for submission
//! - [`DecryptionProtocol`] - grant + decrypt exchange for the total
//! - [`ContractGateway`] / [`Wallet`] - the contract call surface
//! - [`CookieJarSession`] - the three user actions for one wallet
//! - [`Task`] - pending/data/error tracking for a UI
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use cookie_jar::{CookieJarSession, FhevmConfig};
//! use cookie_jar::fhevm::{LocalCoprocessor, LocalDeployment, LocalFhevm};
//!
//! async fn example(wallet: Arc<dyn cookie_jar::Wallet>) -> cookie_jar::Result<()> {
//!     let config = FhevmConfig::from_env()?;
//!     let sdk = Arc::new(LocalFhevm::new(Arc::new(LocalCoprocessor::new(
//!         LocalDeployment::default(),
//!     ))));
//!     let session = CookieJarSession::from_config(config, sdk, Some(wallet));
//!
//!     let tx = session.add_cookies(3).await?;
//!     session.confirm(tx).await?;
//!     let total = session.reveal_total().await?;
//!     println!("{total} cookies in the jar");
//!     Ok(())
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `cookie_jar::core` - handles, payloads, EIP-712, addresses
//! - `cookie_jar::store` - grant storage
//! - `cookie_jar::fhevm` - SDK seam and local runtime
//! - `cookie_jar::perms` - grants and their cache

pub mod ciphertext;
pub mod client;
pub mod config;
pub mod decrypt;
pub mod error;
pub mod gateway;
pub mod session;
pub mod task;

pub use ciphertext::CiphertextBuilder;
pub use client::EncryptionClient;
pub use config::FhevmConfig;
pub use decrypt::DecryptionProtocol;
pub use error::{CookieJarError, Result};
pub use gateway::local::{LocalChain, LocalCookieJar, LocalWallet};
pub use gateway::{ContractGateway, TxHash, TxReceipt, TxStatus, Wallet};
pub use session::{CookieJarSession, MAX_COOKIES, MIN_COOKIES};
pub use task::{Task, TaskState};

pub use cookie_jar_core as core;
pub use cookie_jar_fhevm as fhevm;
pub use cookie_jar_perms as perms;
pub use cookie_jar_store as store;
