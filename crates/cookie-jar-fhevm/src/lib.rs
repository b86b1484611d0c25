//! # Cookie Jar fhEVM
//!
//! The boundary between the Cookie Jar client and an FHE SDK.
//!
//! [`FhevmSdk`] and [`FhevmInstance`] are the seam: a relayer-backed SDK
//! sits behind them in a deployed client, and [`local`] provides an
//! in-process runtime with the same observable protocol (handle layout,
//! input proofs, ACL, EIP-712 authorizations, sealed KMS responses) for
//! development and tests.
//!
//! ## Example
//!
//! ```ignore
//! let sdk = LocalFhevm::new(Arc::new(LocalCoprocessor::new(LocalDeployment::default())));
//! sdk.init().await?;
//! let instance = sdk.create_instance(config).await?;
//! let inputs = instance
//!     .create_encrypted_input(contract, user)
//!     .add32(3)
//!     .encrypt()
//!     .await?;
//! ```

pub mod error;
pub mod handle;
pub mod instance;
pub mod local;

pub use error::{FhevmError, Result};
pub use handle::{compose_handle, FheType, HandleInfo, COMPUTED_INDEX, HANDLE_VERSION};
pub use instance::{
    DecryptedValues, EncryptedInput, EncryptedInputs, EncryptedValue, FhevmInstance, FhevmSdk,
    HandleContractPair, InstanceConfig, UserDecryptParams, MAX_CONTRACT_ADDRESSES,
    MAX_DURATION_DAYS, MAX_INPUT_BITS,
};
pub use local::{KmsShare, LocalCoprocessor, LocalDeployment, LocalFhevm, LocalInstance};
