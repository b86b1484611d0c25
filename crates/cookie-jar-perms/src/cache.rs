//! Load-or-create for decryption grants.
//!
//! Signing is an interactive wallet prompt, so a valid grant is cached per
//! `(user, contract)` and reused until it expires. Anything unreadable or
//! mismatched under the key is discarded and replaced; the caller never
//! sees a stale entry.

use std::fmt;

use cookie_jar_core::{lowercase_address, unix_seconds, Address};
use cookie_jar_fhevm::FhevmInstance;
use cookie_jar_store::StorageProvider;

use crate::error::{PermsError, Result};
use crate::grant::AuthorizationGrant;
use crate::signer::TypedDataSigner;

/// Storage key prefix for cached grants.
pub const CACHE_KEY_PREFIX: &str = "fhevm-cookie-jar-signature";

/// Validity of a newly issued grant.
pub const GRANT_DURATION_DAYS: u64 = 365;

/// Storage key of the grant for `(user, contract)`.
pub fn cache_key(user: &Address, contract: &Address) -> String {
    format!(
        "{CACHE_KEY_PREFIX}:{}:{}",
        lowercase_address(user),
        lowercase_address(contract)
    )
}

/// Why a cached record was not reused.
enum Stale {
    Corrupt(String),
    Mismatch,
    Expired { expires_at: u64 },
}

impl fmt::Display for Stale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stale::Corrupt(e) => write!(f, "unparseable record: {e}"),
            Stale::Mismatch => f.write_str("user or contract mismatch"),
            Stale::Expired { expires_at } => write!(f, "expired at {expires_at}"),
        }
    }
}

/// Grant cache over a [`StorageProvider`].
///
/// Concurrent creators for the same key may both sign; the last write wins,
/// and either grant is valid.
pub struct AuthorizationCache<S: StorageProvider> {
    storage: S,
}

impl<S: StorageProvider> AuthorizationCache<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Return the cached grant for `(signer, contract)` if still valid,
    /// otherwise sign and persist a new one.
    pub async fn load_or_create(
        &self,
        instance: &dyn FhevmInstance,
        contract: &Address,
        signer: &dyn TypedDataSigner,
    ) -> Result<AuthorizationGrant> {
        self.load_or_create_at(instance, contract, signer, unix_seconds())
            .await
    }

    /// [`load_or_create`](Self::load_or_create) with an explicit clock
    /// reading.
    pub async fn load_or_create_at(
        &self,
        instance: &dyn FhevmInstance,
        contract: &Address,
        signer: &dyn TypedDataSigner,
        now: u64,
    ) -> Result<AuthorizationGrant> {
        let user = signer.address().await?;
        let key = cache_key(&user, contract);

        if let Some(raw) = self.storage.get(&key) {
            match check_cached(&raw, &user, contract, now) {
                Ok(grant) => {
                    tracing::debug!(
                        %user,
                        %contract,
                        expires_at = grant.expires_at(),
                        "reusing cached grant"
                    );
                    return Ok(grant);
                }
                Err(reason) => {
                    tracing::debug!(%user, %contract, %reason, "discarding cached grant");
                    self.storage.remove(&key);
                }
            }
        }

        let keypair = instance.generate_keypair();
        let payload = instance.create_eip712(
            &keypair.public_key_hex(),
            &[*contract],
            now,
            GRANT_DURATION_DAYS,
        )?;
        let signature = signer.sign_typed_data(&payload).await?;

        let grant = AuthorizationGrant::new(
            &keypair,
            signature,
            &user,
            &[*contract],
            now,
            GRANT_DURATION_DAYS,
        );

        match grant.to_json() {
            Ok(json) => self.storage.set(&key, &json),
            Err(e) => tracing::debug!(error = %e, "grant not persisted"),
        }
        tracing::info!(%user, %contract, "issued decryption grant");

        Ok(grant)
    }

    /// Drop the cached grant for `(user, contract)`, if any.
    pub fn forget(&self, user: &Address, contract: &Address) {
        self.storage.remove(&cache_key(user, contract));
    }
}

fn check_cached(
    raw: &str,
    user: &Address,
    contract: &Address,
    now: u64,
) -> std::result::Result<AuthorizationGrant, Stale> {
    let corrupt = |e: PermsError| Stale::Corrupt(e.to_string());
    let grant = AuthorizationGrant::from_json(raw).map_err(corrupt)?;
    // Addresses must survive the same parse the decrypt exchange applies.
    let owner = grant.user().map_err(corrupt)?;
    let covered = grant.contracts().map_err(corrupt)?;
    if owner != *user || covered.first() != Some(contract) {
        return Err(Stale::Mismatch);
    }
    if !grant.is_valid_at(now) {
        return Err(Stale::Expired {
            expires_at: grant.expires_at(),
        });
    }
    Ok(grant)
}
