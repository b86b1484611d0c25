//! The FHE SDK seam.
//!
//! [`FhevmSdk`] bootstraps the SDK and constructs instances; an
//! [`FhevmInstance`] is bound to one deployment and does the actual work:
//! keypair generation, typed-data construction, input encryption and the
//! user-decrypt exchange. Implementations must be thread-safe.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use cookie_jar_core::{
    decode_hex, Address, CiphertextHandle, DecryptionDomain, DecryptionKeypair, Eip712Payload,
    InputProof, UserDecryptRequest,
};

use crate::error::{FhevmError, Result};
use crate::handle::FheType;

/// Maximum number of bits a single encrypted input may carry.
pub const MAX_INPUT_BITS: u32 = 2048;

/// Longest validity window a decryption authorization may request.
pub const MAX_DURATION_DAYS: u64 = 365;

/// Most contracts a single decryption authorization may cover.
pub const MAX_CONTRACT_ADDRESSES: usize = 10;

/// Everything an instance is bound to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceConfig {
    pub acl_contract_address: Address,
    pub kms_contract_address: Address,
    pub input_verifier_contract_address: Address,
    pub verifying_contract_address_decryption: Address,
    pub verifying_contract_address_input_verification: Address,
    pub gateway_chain_id: u64,
    /// Target (host) chain id.
    pub chain_id: u64,
    pub relayer_url: String,
    /// RPC endpoint of the host chain.
    pub network_url: String,
}

impl InstanceConfig {
    /// EIP-712 domain used for decryption grants.
    pub fn decryption_domain(&self) -> DecryptionDomain {
        DecryptionDomain {
            chain_id: self.gateway_chain_id,
            verifying_contract: self.verifying_contract_address_decryption,
        }
    }
}

/// A plaintext queued for encryption.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncryptedValue {
    pub fhe_type: FheType,
    pub value: u64,
}

/// Output of encrypting an input: one handle per value, one shared proof.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedInputs {
    pub handles: Vec<CiphertextHandle>,
    pub input_proof: InputProof,
}

/// A handle to decrypt and the contract it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandleContractPair {
    /// `0x`-prefixed hex handle.
    pub handle: String,
    pub contract_address: Address,
}

/// Arguments of the user-decrypt exchange.
#[derive(Clone)]
pub struct UserDecryptParams {
    pub pairs: Vec<HandleContractPair>,
    pub private_key: String,
    pub public_key: String,
    pub signature: String,
    pub contract_addresses: Vec<Address>,
    pub user_address: Address,
    pub start_timestamp: u64,
    pub duration_days: u64,
}

impl UserDecryptParams {
    /// The typed data the signature is expected to cover.
    pub fn eip712(&self, domain: DecryptionDomain) -> Result<Eip712Payload> {
        Ok(Eip712Payload::new(
            domain,
            UserDecryptRequest {
                public_key: decode_hex(&self.public_key)?,
                contract_addresses: self.contract_addresses.clone(),
                start_timestamp: self.start_timestamp,
                duration_days: self.duration_days,
            },
        ))
    }

    /// Request-shape checks every implementation applies before any
    /// network round trip.
    pub fn validate_shape(&self) -> Result<()> {
        if self.pairs.is_empty() {
            return Err(FhevmError::InvalidRequest("no handles to decrypt".into()));
        }
        if self.contract_addresses.is_empty() {
            return Err(FhevmError::InvalidRequest("no contract addresses".into()));
        }
        if self.contract_addresses.len() > MAX_CONTRACT_ADDRESSES {
            return Err(FhevmError::InvalidRequest(format!(
                "{} contract addresses exceeds {MAX_CONTRACT_ADDRESSES}",
                self.contract_addresses.len()
            )));
        }
        if self.duration_days == 0 || self.duration_days > MAX_DURATION_DAYS {
            return Err(FhevmError::InvalidRequest(format!(
                "duration of {} days outside 1..={MAX_DURATION_DAYS}",
                self.duration_days
            )));
        }
        for pair in &self.pairs {
            if !self.contract_addresses.contains(&pair.contract_address) {
                return Err(FhevmError::InvalidRequest(format!(
                    "contract {} not covered by the authorization",
                    pair.contract_address
                )));
            }
            if pair.contract_address == self.user_address {
                return Err(FhevmError::InvalidRequest(
                    "user address must differ from contract address".into(),
                ));
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for UserDecryptParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserDecryptParams")
            .field("pairs", &self.pairs)
            .field("public_key", &self.public_key)
            .field("contract_addresses", &self.contract_addresses)
            .field("user_address", &self.user_address)
            .field("start_timestamp", &self.start_timestamp)
            .field("duration_days", &self.duration_days)
            .finish_non_exhaustive()
    }
}

/// Decrypted values keyed by `0x`-prefixed hex handle.
pub type DecryptedValues = HashMap<String, u64>;

/// SDK entry points: bootstrap, then construct instances.
#[async_trait]
pub trait FhevmSdk: Send + Sync {
    /// One-time SDK bootstrap. Must be called before `create_instance`.
    async fn init(&self) -> Result<()>;

    /// Construct an instance bound to `config`.
    async fn create_instance(&self, config: InstanceConfig) -> Result<Arc<dyn FhevmInstance>>;
}

/// A constructed SDK instance.
#[async_trait]
pub trait FhevmInstance: Send + Sync {
    /// The configuration this instance is bound to.
    fn config(&self) -> &InstanceConfig;

    /// Generate the keypair a decryption grant is scoped to.
    fn generate_keypair(&self) -> DecryptionKeypair;

    /// Build the typed data a user signs to authorize decryption.
    fn create_eip712(
        &self,
        public_key: &str,
        contract_addresses: &[Address],
        start_timestamp: u64,
        duration_days: u64,
    ) -> Result<Eip712Payload> {
        Ok(Eip712Payload::new(
            self.config().decryption_domain(),
            UserDecryptRequest {
                public_key: decode_hex(public_key)?,
                contract_addresses: contract_addresses.to_vec(),
                start_timestamp,
                duration_days,
            },
        ))
    }

    /// Encrypt `values` for `contract`, to be submitted by `user`.
    async fn encrypt_inputs(
        &self,
        contract: Address,
        user: Address,
        values: &[EncryptedValue],
    ) -> Result<EncryptedInputs>;

    /// Exchange authorized handles for their plaintexts.
    ///
    /// Handles the caller is not (yet) authorized for are absent from the
    /// result rather than failing the whole request.
    async fn user_decrypt(&self, params: UserDecryptParams) -> Result<DecryptedValues>;
}

impl<'a> dyn FhevmInstance + 'a {
    /// Start an encrypted input scoped to `(contract, user)`.
    pub fn create_encrypted_input(&self, contract: Address, user: Address) -> EncryptedInput<'_> {
        EncryptedInput {
            instance: self,
            contract,
            user,
            values: Vec::new(),
        }
    }
}

/// Builder for a multi-value encrypted input.
pub struct EncryptedInput<'a> {
    instance: &'a dyn FhevmInstance,
    contract: Address,
    user: Address,
    values: Vec<EncryptedValue>,
}

impl EncryptedInput<'_> {
    fn push(mut self, fhe_type: FheType, value: u64) -> Self {
        self.values.push(EncryptedValue { fhe_type, value });
        self
    }

    pub fn add_bool(self, value: bool) -> Self {
        self.push(FheType::Bool, u64::from(value))
    }

    pub fn add8(self, value: u8) -> Self {
        self.push(FheType::Uint8, u64::from(value))
    }

    pub fn add16(self, value: u16) -> Self {
        self.push(FheType::Uint16, u64::from(value))
    }

    pub fn add32(self, value: u32) -> Self {
        self.push(FheType::Uint32, u64::from(value))
    }

    pub fn add64(self, value: u64) -> Self {
        self.push(FheType::Uint64, value)
    }

    /// Total bits queued so far.
    pub fn bits(&self) -> u32 {
        self.values.iter().map(|v| v.fhe_type.bits()).sum()
    }

    /// Encrypt everything queued.
    pub async fn encrypt(self) -> Result<EncryptedInputs> {
        if self.values.is_empty() {
            return Err(FhevmError::EmptyInput);
        }
        let bits = self.bits();
        if bits > MAX_INPUT_BITS {
            return Err(FhevmError::InputTooLarge {
                bits,
                max: MAX_INPUT_BITS,
            });
        }
        self.instance
            .encrypt_inputs(self.contract, self.user, &self.values)
            .await
    }
}
