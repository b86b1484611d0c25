//! Deployment configuration.
//!
//! Settings come from the environment at startup. Loading never fails on a
//! missing address or URL; [`FhevmConfig::instance_config`] reports the
//! first bad setting by name when the client is first used.

use std::path::PathBuf;

use cookie_jar_core::{parse_address, Address};
use cookie_jar_fhevm::{InstanceConfig, LocalDeployment};

use crate::error::{CookieJarError, Result};

pub const ENV_TARGET_CHAIN_ID: &str = "COOKIE_JAR_TARGET_CHAIN_ID";
pub const ENV_GATEWAY_CHAIN_ID: &str = "COOKIE_JAR_GATEWAY_CHAIN_ID";
pub const ENV_COOKIE_JAR_ADDRESS: &str = "COOKIE_JAR_ADDRESS";
pub const ENV_ACL_CONTRACT_ADDRESS: &str = "COOKIE_JAR_ACL_CONTRACT_ADDRESS";
pub const ENV_KMS_CONTRACT_ADDRESS: &str = "COOKIE_JAR_KMS_CONTRACT_ADDRESS";
pub const ENV_INPUT_VERIFIER_CONTRACT_ADDRESS: &str = "COOKIE_JAR_INPUT_VERIFIER_CONTRACT_ADDRESS";
pub const ENV_INPUT_VERIFICATION_CONTRACT_ADDRESS: &str =
    "COOKIE_JAR_INPUT_VERIFICATION_CONTRACT_ADDRESS";
pub const ENV_DECRYPTION_ORACLE_ADDRESS: &str = "COOKIE_JAR_DECRYPTION_ORACLE_ADDRESS";
pub const ENV_RELAYER_URL: &str = "COOKIE_JAR_RELAYER_URL";
pub const ENV_RPC_URL: &str = "COOKIE_JAR_RPC_URL";
pub const ENV_STORAGE_PATH: &str = "COOKIE_JAR_STORAGE_PATH";

/// Sepolia.
pub const DEFAULT_TARGET_CHAIN_ID: u64 = 11155111;
pub const DEFAULT_GATEWAY_CHAIN_ID: u64 = 55815;

/// Where the client and its contract live.
///
/// Addresses are kept as the raw strings they were configured with so that
/// validation can name the offending setting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FhevmConfig {
    pub target_chain_id: u64,
    pub gateway_chain_id: u64,
    pub cookie_jar_address: String,
    pub acl_contract_address: String,
    pub kms_contract_address: String,
    pub input_verifier_contract_address: String,
    pub input_verification_contract_address: String,
    pub decryption_oracle_address: String,
    pub relayer_url: String,
    pub rpc_url: String,
    /// SQLite file for cached grants. `None` keeps them in memory.
    pub storage_path: Option<PathBuf>,
}

impl FhevmConfig {
    /// Read the configuration from process environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read the configuration through an arbitrary key lookup.
    ///
    /// Only a malformed chain id fails here; everything else is checked by
    /// [`instance_config`](Self::instance_config).
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let text = |key: &str| lookup(key).map(|v| v.trim().to_string()).unwrap_or_default();
        let chain_id = |key: &str, default: u64| -> Result<u64> {
            match lookup(key).map(|v| v.trim().to_string()) {
                None => Ok(default),
                Some(v) if v.is_empty() => Ok(default),
                Some(v) => v.parse().map_err(|_| {
                    SettingError::new(key, "to a decimal chain id").into()
                }),
            }
        };

        Ok(Self {
            target_chain_id: chain_id(ENV_TARGET_CHAIN_ID, DEFAULT_TARGET_CHAIN_ID)?,
            gateway_chain_id: chain_id(ENV_GATEWAY_CHAIN_ID, DEFAULT_GATEWAY_CHAIN_ID)?,
            cookie_jar_address: text(ENV_COOKIE_JAR_ADDRESS),
            acl_contract_address: text(ENV_ACL_CONTRACT_ADDRESS),
            kms_contract_address: text(ENV_KMS_CONTRACT_ADDRESS),
            input_verifier_contract_address: text(ENV_INPUT_VERIFIER_CONTRACT_ADDRESS),
            input_verification_contract_address: text(ENV_INPUT_VERIFICATION_CONTRACT_ADDRESS),
            decryption_oracle_address: text(ENV_DECRYPTION_ORACLE_ADDRESS),
            relayer_url: text(ENV_RELAYER_URL),
            rpc_url: text(ENV_RPC_URL),
            storage_path: lookup(ENV_STORAGE_PATH)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),
        })
    }

    /// Configuration pointing at a local deployment hosting `cookie_jar`.
    pub fn local(deployment: &LocalDeployment, cookie_jar: Address) -> Self {
        Self {
            target_chain_id: deployment.chain_id,
            gateway_chain_id: deployment.gateway_chain_id,
            cookie_jar_address: cookie_jar.to_string(),
            acl_contract_address: deployment.acl.to_string(),
            kms_contract_address: deployment.kms.to_string(),
            input_verifier_contract_address: deployment.input_verifier.to_string(),
            input_verification_contract_address: deployment.input_verification.to_string(),
            decryption_oracle_address: deployment.decryption_oracle.to_string(),
            relayer_url: deployment.relayer_url.clone(),
            rpc_url: deployment.rpc_url.clone(),
            storage_path: None,
        }
    }

    /// Validate every setting the SDK needs and build the instance
    /// configuration.
    ///
    /// Fails on the first missing or malformed setting, naming it.
    pub fn instance_config(&self) -> Result<InstanceConfig> {
        let acl = contract(ENV_ACL_CONTRACT_ADDRESS, &self.acl_contract_address)?;
        let kms = contract(ENV_KMS_CONTRACT_ADDRESS, &self.kms_contract_address)?;
        let input_verifier = contract(
            ENV_INPUT_VERIFIER_CONTRACT_ADDRESS,
            &self.input_verifier_contract_address,
        )?;
        let input_verification = contract(
            ENV_INPUT_VERIFICATION_CONTRACT_ADDRESS,
            &self.input_verification_contract_address,
        )?;
        let decryption = contract(ENV_DECRYPTION_ORACLE_ADDRESS, &self.decryption_oracle_address)?;

        if self.relayer_url.is_empty() {
            return Err(SettingError::new(ENV_RELAYER_URL, "to the fhEVM relayer URL").into());
        }
        if self.rpc_url.is_empty() {
            return Err(SettingError::new(ENV_RPC_URL, "to an RPC endpoint").into());
        }

        Ok(InstanceConfig {
            acl_contract_address: acl,
            kms_contract_address: kms,
            input_verifier_contract_address: input_verifier,
            verifying_contract_address_decryption: decryption,
            verifying_contract_address_input_verification: input_verification,
            gateway_chain_id: self.gateway_chain_id,
            chain_id: self.target_chain_id,
            relayer_url: self.relayer_url.clone(),
            network_url: self.rpc_url.clone(),
        })
    }

    /// The cookie jar contract address.
    pub fn cookie_jar(&self) -> Result<Address> {
        contract(ENV_COOKIE_JAR_ADDRESS, &self.cookie_jar_address)
    }
}

fn contract(setting: &str, value: &str) -> Result<Address> {
    parse_address(value)
        .map_err(|_| SettingError::new(setting, "to a valid contract address").into())
}

/// Builds the "Set X to Y" message of a configuration error.
struct SettingError {
    setting: String,
    expected: &'static str,
}

impl SettingError {
    fn new(setting: &str, expected: &'static str) -> Self {
        Self {
            setting: setting.to_string(),
            expected,
        }
    }
}

impl From<SettingError> for CookieJarError {
    fn from(e: SettingError) -> Self {
        CookieJarError::Configuration(format!("Set {} {}", e.setting, e.expected))
    }
}
