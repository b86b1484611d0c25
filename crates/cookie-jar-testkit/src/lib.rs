//! # Cookie Jar Testkit
//!
//! Testing utilities for the Cookie Jar.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Fixtures**: a local devnet with a deployed jar, deterministic wallets,
//!   and signer doubles that count or decline signatures
//! - **Generators**: Proptest strategies for amounts, addresses and grant
//!   windows
//!
//! End-to-end scenarios live in this crate's `tests/` directory.
//!
//! ## Test Fixtures
//!
//! ```rust,no_run
//! use cookie_jar_testkit::fixtures::{wallet_from_seed, Devnet};
//!
//! async fn example() -> anyhow::Result<()> {
//!     let net = Devnet::new()?;
//!     let alice = net.session(wallet_from_seed(b"alice")?);
//!     alice.add_cookies(3).await?;
//!     assert_eq!(alice.reveal_total().await?, 3);
//!     Ok(())
//! }
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use cookie_jar_testkit::generators::valid_amount;
//!
//! proptest! {
//!     #[test]
//!     fn accepted(amount in valid_amount()) {
//!         prop_assert!((1..=5).contains(&amount));
//!     }
//! }
//! ```

pub mod fixtures;
pub mod generators;

pub use fixtures::{
    address_of, participants, wallet_from_seed, CountingSigner, DecliningSigner, Devnet,
};
