//! An in-process FHE runtime for development and tests.
//!
//! [`LocalCoprocessor`] plays every off-chain role of an fhEVM deployment:
//! it holds the network key, registers ciphertexts, co-signs input proofs,
//! evaluates homomorphic additions, keeps the ACL, and acts as the KMS that
//! answers user-decrypt requests. "Encryption" under the network key is
//! ChaCha20-Poly1305; the point is to exercise the protocol (handles,
//! proofs, ACL, signed authorizations, sealed responses), not the lattice
//! cryptography.
//!
//! [`LocalFhevm`] is the matching [`FhevmSdk`]: it counts bootstraps and
//! constructions and can be slowed down to exercise concurrent first use.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use async_trait::async_trait;
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};

use cookie_jar_core::{
    decode_hex, unix_seconds, Address, CiphertextHandle, DecryptionDomain, DecryptionKeypair,
    EncryptionKey, EncryptionNonce, InputProof, SealedValue, X25519PublicKey, HANDLE_LEN,
};

use crate::error::{FhevmError, Result};
use crate::handle::{compose_handle, FheType, HandleInfo, COMPUTED_INDEX};
use crate::instance::{
    DecryptedValues, EncryptedInputs, EncryptedValue, FhevmInstance, FhevmSdk, InstanceConfig,
    UserDecryptParams,
};

const HANDLE_DOMAIN: &str = "cookie-jar-local-handle-v0";
const INPUT_PROOF_DOMAIN: &str = "cookie-jar-local-input-proof-v0";
const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

/// Addresses and chain ids of a local deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalDeployment {
    pub chain_id: u64,
    pub gateway_chain_id: u64,
    pub acl: Address,
    pub kms: Address,
    pub input_verifier: Address,
    pub input_verification: Address,
    pub decryption_oracle: Address,
    pub relayer_url: String,
    pub rpc_url: String,
}

impl LocalDeployment {
    /// A deployment with deterministic contract addresses.
    pub fn new(chain_id: u64, gateway_chain_id: u64) -> Self {
        Self {
            chain_id,
            gateway_chain_id,
            acl: derive_address("acl", chain_id),
            kms: derive_address("kms", chain_id),
            input_verifier: derive_address("input-verifier", chain_id),
            input_verification: derive_address("input-verification", gateway_chain_id),
            decryption_oracle: derive_address("decryption", gateway_chain_id),
            relayer_url: "http://127.0.0.1:3000".into(),
            rpc_url: "http://127.0.0.1:8545".into(),
        }
    }

    /// The instance configuration a client needs to talk to this deployment.
    pub fn instance_config(&self) -> InstanceConfig {
        InstanceConfig {
            acl_contract_address: self.acl,
            kms_contract_address: self.kms,
            input_verifier_contract_address: self.input_verifier,
            verifying_contract_address_decryption: self.decryption_oracle,
            verifying_contract_address_input_verification: self.input_verification,
            gateway_chain_id: self.gateway_chain_id,
            chain_id: self.chain_id,
            relayer_url: self.relayer_url.clone(),
            network_url: self.rpc_url.clone(),
        }
    }

    pub fn decryption_domain(&self) -> DecryptionDomain {
        DecryptionDomain {
            chain_id: self.gateway_chain_id,
            verifying_contract: self.decryption_oracle,
        }
    }

    /// Name of the first field where `config` disagrees with this deployment.
    fn mismatch(&self, config: &InstanceConfig) -> Option<&'static str> {
        let expected = self.instance_config();
        if config.acl_contract_address != expected.acl_contract_address {
            Some("aclContractAddress")
        } else if config.kms_contract_address != expected.kms_contract_address {
            Some("kmsContractAddress")
        } else if config.input_verifier_contract_address
            != expected.input_verifier_contract_address
        {
            Some("inputVerifierContractAddress")
        } else if config.verifying_contract_address_decryption
            != expected.verifying_contract_address_decryption
        {
            Some("verifyingContractAddressDecryption")
        } else if config.verifying_contract_address_input_verification
            != expected.verifying_contract_address_input_verification
        {
            Some("verifyingContractAddressInputVerification")
        } else if config.gateway_chain_id != expected.gateway_chain_id {
            Some("gatewayChainId")
        } else if config.chain_id != expected.chain_id {
            Some("chainId")
        } else {
            None
        }
    }
}

impl Default for LocalDeployment {
    fn default() -> Self {
        Self::new(11155111, 55815)
    }
}

fn derive_address(label: &str, chain_id: u64) -> Address {
    let mut hasher = blake3::Hasher::new_derive_key("cookie-jar-local-deployment-v0");
    hasher.update(label.as_bytes());
    hasher.update(&chain_id.to_be_bytes());
    Address::from_slice(&hasher.finalize().as_bytes()[..20])
}

/// One value sealed by the KMS, with the KMS signature over it.
#[derive(Debug, Clone)]
pub struct KmsShare {
    pub handle: CiphertextHandle,
    pub sealed: SealedValue,
    pub signature: [u8; 64],
}

struct StoredCiphertext {
    fhe_type: FheType,
    nonce: EncryptionNonce,
    ciphertext: Vec<u8>,
}

#[derive(Default)]
struct CoprocessorState {
    ciphertexts: HashMap<CiphertextHandle, StoredCiphertext>,
    acl: HashMap<CiphertextHandle, HashSet<Address>>,
}

/// The off-chain half of a local fhEVM deployment.
pub struct LocalCoprocessor {
    deployment: LocalDeployment,
    network_key: EncryptionKey,
    input_signer: SigningKey,
    kms_signer: SigningKey,
    state: RwLock<CoprocessorState>,
}

impl LocalCoprocessor {
    /// Start a coprocessor with fresh keys.
    pub fn new(deployment: LocalDeployment) -> Self {
        let mut rng = rand::thread_rng();
        Self {
            deployment,
            network_key: EncryptionKey::generate(),
            input_signer: SigningKey::generate(&mut rng),
            kms_signer: SigningKey::generate(&mut rng),
            state: RwLock::new(CoprocessorState::default()),
        }
    }

    pub fn deployment(&self) -> &LocalDeployment {
        &self.deployment
    }

    /// Key clients use to verify KMS responses.
    pub fn kms_verifying_key(&self) -> VerifyingKey {
        self.kms_signer.verifying_key()
    }

    // Every mutation is a single insert, so a poisoned lock holds
    // consistent data.
    fn read(&self) -> RwLockReadGuard<'_, CoprocessorState> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, CoprocessorState> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }

    fn seal_network(&self, fhe_type: FheType, value: u64) -> Result<StoredCiphertext> {
        let nonce = EncryptionNonce::generate();
        let plaintext = fhe_type.wrap(value).to_be_bytes();
        let ciphertext = self.network_key.encrypt(&plaintext, &nonce)?;
        Ok(StoredCiphertext {
            fhe_type,
            nonce,
            ciphertext,
        })
    }

    fn open_network(&self, stored: &StoredCiphertext) -> Result<u64> {
        let plaintext = self.network_key.decrypt(&stored.ciphertext, &stored.nonce)?;
        let bytes: [u8; 8] = plaintext
            .as_slice()
            .try_into()
            .map_err(|_| FhevmError::InvalidResponse("corrupt network ciphertext".into()))?;
        Ok(u64::from_be_bytes(bytes))
    }

    fn input_digest(&self, contract: &Address, user: &Address, handles: &[CiphertextHandle]) -> [u8; 32] {
        let mut hasher = blake3::Hasher::new_derive_key(INPUT_PROOF_DOMAIN);
        hasher.update(&self.deployment.chain_id.to_be_bytes());
        hasher.update(contract.as_slice());
        hasher.update(user.as_slice());
        for handle in handles {
            hasher.update(handle.as_bytes());
        }
        *hasher.finalize().as_bytes()
    }

    /// Encrypt client inputs and co-sign the proof binding them to
    /// `(contract, user)`.
    ///
    /// Proof layout: `count (1) || handles (32 * count) || signature (64)`.
    pub fn encrypt_inputs(
        &self,
        contract: Address,
        user: Address,
        values: &[EncryptedValue],
    ) -> Result<EncryptedInputs> {
        let count = u8::try_from(values.len())
            .map_err(|_| FhevmError::InvalidRequest("too many values in one input".into()))?;

        let mut handles = Vec::with_capacity(values.len());
        let mut stored = Vec::with_capacity(values.len());
        for (index, value) in (0u8..).zip(values) {
            let ct = self.seal_network(value.fhe_type, value.value)?;

            let mut hasher = blake3::Hasher::new_derive_key(HANDLE_DOMAIN);
            hasher.update(&ct.ciphertext);
            hasher.update(ct.nonce.as_bytes());
            hasher.update(contract.as_slice());
            hasher.update(user.as_slice());
            hasher.update(&[index]);
            let digest = *hasher.finalize().as_bytes();

            let handle = compose_handle(&digest, index, self.deployment.chain_id, value.fhe_type);
            handles.push(handle);
            stored.push((handle, ct));
        }

        let signature = self
            .input_signer
            .sign(&self.input_digest(&contract, &user, &handles));

        let mut proof = Vec::with_capacity(1 + HANDLE_LEN * handles.len() + 64);
        proof.push(count);
        for handle in &handles {
            proof.extend_from_slice(handle.as_bytes());
        }
        proof.extend_from_slice(&signature.to_bytes());

        let mut state = self.write();
        for (handle, ct) in stored {
            state.ciphertexts.insert(handle, ct);
        }

        Ok(EncryptedInputs {
            handles,
            input_proof: InputProof(proof),
        })
    }

    /// Check an external input submitted by `user` to `contract`.
    ///
    /// On success the contract gains ACL access to the handle.
    pub fn verify_input(
        &self,
        handle: &CiphertextHandle,
        proof: &InputProof,
        contract: Address,
        user: Address,
    ) -> Result<CiphertextHandle> {
        let bytes = proof.as_bytes();
        let (count, rest) = bytes
            .split_first()
            .ok_or_else(|| FhevmError::InvalidProof("empty proof".into()))?;
        let count = usize::from(*count);
        if rest.len() != count * HANDLE_LEN + 64 {
            return Err(FhevmError::InvalidProof(format!(
                "expected {} bytes after count, got {}",
                count * HANDLE_LEN + 64,
                rest.len()
            )));
        }

        let (handle_bytes, sig_bytes) = rest.split_at(count * HANDLE_LEN);
        let handles = handle_bytes
            .chunks_exact(HANDLE_LEN)
            .map(CiphertextHandle::try_from)
            .collect::<std::result::Result<Vec<_>, _>>()?;

        if !handles.contains(handle) {
            return Err(FhevmError::InvalidProof("handle not covered by proof".into()));
        }
        if HandleInfo::parse(handle).chain_id != self.deployment.chain_id {
            return Err(FhevmError::InvalidProof("handle bound to another chain".into()));
        }

        let sig_array: [u8; 64] = sig_bytes
            .try_into()
            .map_err(|_| FhevmError::InvalidProof("malformed signature".into()))?;
        self.input_signer
            .verifying_key()
            .verify(
                &self.input_digest(&contract, &user, &handles),
                &Signature::from_bytes(&sig_array),
            )
            .map_err(|_| FhevmError::InvalidProof("signature does not bind contract and user".into()))?;

        if !self.read().ciphertexts.contains_key(handle) {
            return Err(FhevmError::UnknownHandle(handle.to_hex()));
        }

        self.allow(handle, contract);
        Ok(*handle)
    }

    /// Encrypt a public constant on behalf of `caller`.
    pub fn trivial_encrypt(&self, value: u64, fhe_type: FheType, caller: Address) -> Result<CiphertextHandle> {
        let ct = self.seal_network(fhe_type, value)?;
        let handle = self.computed_handle(&[&ct.ciphertext, ct.nonce.as_bytes()], fhe_type);

        let mut state = self.write();
        state.ciphertexts.insert(handle, ct);
        state.acl.entry(handle).or_default().insert(caller);
        Ok(handle)
    }

    /// Homomorphic addition (wrapping at the operand width).
    ///
    /// `caller` must hold ACL access to both operands and receives access to
    /// the result.
    pub fn add(
        &self,
        lhs: &CiphertextHandle,
        rhs: &CiphertextHandle,
        caller: Address,
    ) -> Result<CiphertextHandle> {
        let (fhe_type, sum) = {
            let state = self.read();
            for operand in [lhs, rhs] {
                let allowed = state
                    .acl
                    .get(operand)
                    .is_some_and(|accounts| accounts.contains(&caller));
                if !allowed {
                    return Err(FhevmError::Unauthorized(format!(
                        "{caller} has no access to {operand}"
                    )));
                }
            }

            let a = state
                .ciphertexts
                .get(lhs)
                .ok_or_else(|| FhevmError::UnknownHandle(lhs.to_hex()))?;
            let b = state
                .ciphertexts
                .get(rhs)
                .ok_or_else(|| FhevmError::UnknownHandle(rhs.to_hex()))?;
            if a.fhe_type != b.fhe_type {
                return Err(FhevmError::TypeMismatch(format!(
                    "{:?} + {:?}",
                    a.fhe_type, b.fhe_type
                )));
            }

            let sum = self.open_network(a)?.wrapping_add(self.open_network(b)?);
            (a.fhe_type, a.fhe_type.wrap(sum))
        };

        let ct = self.seal_network(fhe_type, sum)?;
        let handle = self.computed_handle(
            &[lhs.as_bytes(), rhs.as_bytes(), &ct.ciphertext, ct.nonce.as_bytes()],
            fhe_type,
        );

        let mut state = self.write();
        state.ciphertexts.insert(handle, ct);
        state.acl.entry(handle).or_default().insert(caller);
        Ok(handle)
    }

    fn computed_handle(&self, parts: &[&[u8]], fhe_type: FheType) -> CiphertextHandle {
        let mut hasher = blake3::Hasher::new_derive_key(HANDLE_DOMAIN);
        for part in parts {
            hasher.update(part);
        }
        compose_handle(
            hasher.finalize().as_bytes(),
            COMPUTED_INDEX,
            self.deployment.chain_id,
            fhe_type,
        )
    }

    /// Grant `account` decrypt/compute access to `handle`.
    pub fn allow(&self, handle: &CiphertextHandle, account: Address) {
        self.write().acl.entry(*handle).or_default().insert(account);
    }

    pub fn is_allowed(&self, handle: &CiphertextHandle, account: &Address) -> bool {
        self.read()
            .acl
            .get(handle)
            .is_some_and(|accounts| accounts.contains(account))
    }

    /// Answer a user-decrypt request at time `now`.
    ///
    /// Verifies the EIP-712 signature against the requesting user and the
    /// validity window, then seals every handle both the user and its
    /// contract may access. Handles failing the ACL check are left out.
    pub fn user_decrypt(&self, params: &UserDecryptParams, now: u64) -> Result<Vec<KmsShare>> {
        params.validate_shape()?;

        let signature = decode_hex(&params.signature)?;
        let payload = params.eip712(self.deployment.decryption_domain())?;
        let signer = payload.recover_signer(&signature)?;
        if signer != params.user_address {
            return Err(FhevmError::Unauthorized(format!(
                "authorization signed by {signer}, not {}",
                params.user_address
            )));
        }

        let start = params.start_timestamp;
        let end = start.saturating_add(params.duration_days.saturating_mul(SECONDS_PER_DAY));
        if now < start || now >= end {
            return Err(FhevmError::AuthorizationExpired { now, start, end });
        }

        let recipient = X25519PublicKey::from_hex(&params.public_key)?;

        let state = self.read();
        let mut shares = Vec::new();
        for pair in &params.pairs {
            let handle = CiphertextHandle::from_hex(&pair.handle)?;
            let permitted = state.acl.get(&handle).is_some_and(|accounts| {
                accounts.contains(&params.user_address) && accounts.contains(&pair.contract_address)
            });
            let Some(stored) = state.ciphertexts.get(&handle).filter(|_| permitted) else {
                tracing::debug!(handle = %handle, "handle not decryptable for requester");
                continue;
            };

            let value = self.open_network(stored)?;
            let sealed = SealedValue::seal(&value.to_be_bytes(), &recipient, handle.as_bytes())?;
            let signature = self
                .kms_signer
                .sign(&sealed.signed_bytes(handle.as_bytes()))
                .to_bytes();
            shares.push(KmsShare {
                handle,
                sealed,
                signature,
            });
        }

        Ok(shares)
    }
}

/// An [`FhevmInstance`] talking to a [`LocalCoprocessor`].
pub struct LocalInstance {
    config: InstanceConfig,
    coprocessor: Arc<LocalCoprocessor>,
}

impl LocalInstance {
    fn open_share(&self, keypair: &DecryptionKeypair, share: &KmsShare) -> Result<u64> {
        let context = share.handle.as_bytes();
        self.coprocessor
            .kms_verifying_key()
            .verify(
                &share.sealed.signed_bytes(context),
                &Signature::from_bytes(&share.signature),
            )
            .map_err(|_| FhevmError::InvalidResponse("bad KMS signature".into()))?;

        let plaintext = keypair.open(&share.sealed, context)?;
        let bytes: [u8; 8] = plaintext
            .as_slice()
            .try_into()
            .map_err(|_| FhevmError::InvalidResponse("unexpected plaintext length".into()))?;
        Ok(u64::from_be_bytes(bytes))
    }
}

#[async_trait]
impl FhevmInstance for LocalInstance {
    fn config(&self) -> &InstanceConfig {
        &self.config
    }

    fn generate_keypair(&self) -> DecryptionKeypair {
        DecryptionKeypair::generate()
    }

    async fn encrypt_inputs(
        &self,
        contract: Address,
        user: Address,
        values: &[EncryptedValue],
    ) -> Result<EncryptedInputs> {
        self.coprocessor.encrypt_inputs(contract, user, values)
    }

    async fn user_decrypt(&self, params: UserDecryptParams) -> Result<DecryptedValues> {
        params.validate_shape()?;

        let keypair = DecryptionKeypair::from_private_hex(&params.private_key)?;
        if keypair.public_key() != X25519PublicKey::from_hex(&params.public_key)? {
            return Err(FhevmError::InvalidRequest(
                "private key does not match public key".into(),
            ));
        }

        let shares = self.coprocessor.user_decrypt(&params, unix_seconds())?;

        let mut values = DecryptedValues::with_capacity(shares.len());
        for share in &shares {
            values.insert(share.handle.to_hex(), self.open_share(&keypair, share)?);
        }
        Ok(values)
    }
}

/// An [`FhevmSdk`] backed by a [`LocalCoprocessor`].
pub struct LocalFhevm {
    coprocessor: Arc<LocalCoprocessor>,
    init_calls: AtomicUsize,
    instances_created: AtomicUsize,
    construction_delay: Option<Duration>,
}

impl LocalFhevm {
    pub fn new(coprocessor: Arc<LocalCoprocessor>) -> Self {
        Self {
            coprocessor,
            init_calls: AtomicUsize::new(0),
            instances_created: AtomicUsize::new(0),
            construction_delay: None,
        }
    }

    /// Make every `create_instance` call wait, widening the window in which
    /// concurrent first uses overlap.
    pub fn with_construction_delay(mut self, delay: Duration) -> Self {
        self.construction_delay = Some(delay);
        self
    }

    pub fn coprocessor(&self) -> &Arc<LocalCoprocessor> {
        &self.coprocessor
    }

    /// Number of times `init` ran.
    pub fn init_calls(&self) -> usize {
        self.init_calls.load(Ordering::SeqCst)
    }

    /// Number of instances constructed.
    pub fn instances_created(&self) -> usize {
        self.instances_created.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FhevmSdk for LocalFhevm {
    async fn init(&self) -> Result<()> {
        self.init_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn create_instance(&self, config: InstanceConfig) -> Result<Arc<dyn FhevmInstance>> {
        if self.init_calls() == 0 {
            return Err(FhevmError::Bootstrap("init must run before create_instance".into()));
        }
        if let Some(field) = self.coprocessor.deployment().mismatch(&config) {
            return Err(FhevmError::InvalidConfig(format!(
                "{field} does not match the local deployment"
            )));
        }
        if let Some(delay) = self.construction_delay {
            tokio::time::sleep(delay).await;
        }

        self.instances_created.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(LocalInstance {
            config,
            coprocessor: Arc::clone(&self.coprocessor),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instance::HandleContractPair;
    use alloy_signer::{Signer as _, SignerSync};
    use alloy_signer_local::PrivateKeySigner;
    use cookie_jar_core::to_prefixed_hex;

    const CONTRACT: Address = Address::repeat_byte(0xc0);

    async fn instance() -> (Arc<dyn FhevmInstance>, Arc<LocalCoprocessor>) {
        let coprocessor = Arc::new(LocalCoprocessor::new(LocalDeployment::default()));
        let sdk = LocalFhevm::new(Arc::clone(&coprocessor));
        sdk.init().await.unwrap();
        let instance = sdk
            .create_instance(coprocessor.deployment().instance_config())
            .await
            .unwrap();
        (instance, coprocessor)
    }

    fn authorize(
        instance: &dyn FhevmInstance,
        signer: &PrivateKeySigner,
        handle: &CiphertextHandle,
        start: u64,
    ) -> UserDecryptParams {
        let keypair = instance.generate_keypair();
        let payload = instance
            .create_eip712(&keypair.public_key_hex(), &[CONTRACT], start, 365)
            .unwrap();
        let signature = signer.sign_hash_sync(&payload.signing_hash()).unwrap();

        UserDecryptParams {
            pairs: vec![HandleContractPair {
                handle: handle.to_hex(),
                contract_address: CONTRACT,
            }],
            private_key: keypair.private_key_hex(),
            public_key: keypair.public_key_hex(),
            signature: to_prefixed_hex(signature.as_bytes()),
            contract_addresses: vec![CONTRACT],
            user_address: signer.address(),
            start_timestamp: start,
            duration_days: 365,
        }
    }

    #[tokio::test]
    async fn test_create_instance_requires_init() {
        let coprocessor = Arc::new(LocalCoprocessor::new(LocalDeployment::default()));
        let sdk = LocalFhevm::new(Arc::clone(&coprocessor));
        let result = sdk
            .create_instance(coprocessor.deployment().instance_config())
            .await;
        assert!(matches!(result, Err(FhevmError::Bootstrap(_))));
    }

    #[tokio::test]
    async fn test_create_instance_rejects_foreign_config() {
        let coprocessor = Arc::new(LocalCoprocessor::new(LocalDeployment::default()));
        let sdk = LocalFhevm::new(Arc::clone(&coprocessor));
        sdk.init().await.unwrap();

        let mut config = coprocessor.deployment().instance_config();
        config.gateway_chain_id = 1;
        let err = sdk.create_instance(config).await.err().unwrap();
        assert!(err.to_string().contains("gatewayChainId"));
    }

    #[tokio::test]
    async fn test_input_proof_binds_contract_and_user() {
        let (instance, coprocessor) = instance().await;
        let user = Address::repeat_byte(0x01);

        let inputs = instance
            .create_encrypted_input(CONTRACT, user)
            .add32(3)
            .encrypt()
            .await
            .unwrap();
        let handle = inputs.handles[0];

        assert!(coprocessor
            .verify_input(&handle, &inputs.input_proof, CONTRACT, Address::repeat_byte(0x02))
            .is_err());
        assert!(coprocessor
            .verify_input(&handle, &inputs.input_proof, Address::repeat_byte(0xc1), user)
            .is_err());
        assert_eq!(
            coprocessor
                .verify_input(&handle, &inputs.input_proof, CONTRACT, user)
                .unwrap(),
            handle
        );
        assert!(coprocessor.is_allowed(&handle, &CONTRACT));
    }

    async fn encrypt_one(
        instance: &dyn FhevmInstance,
        user: Address,
        value: u32,
    ) -> Result<EncryptedInputs> {
        instance
            .create_encrypted_input(CONTRACT, user)
            .add32(value)
            .encrypt()
            .await
    }

    #[tokio::test]
    async fn test_encrypted_input_from_borrowed_instance() {
        let (instance, coprocessor) = instance().await;
        let user = Address::repeat_byte(0x01);

        let inputs = encrypt_one(instance.as_ref(), user, 4).await.unwrap();
        let handle = inputs.handles[0];

        assert_eq!(HandleInfo::parse(&handle).fhe_type, Some(FheType::Uint32));
        assert!(coprocessor
            .verify_input(&handle, &inputs.input_proof, CONTRACT, user)
            .is_ok());
    }

    #[tokio::test]
    async fn test_tampered_proof_rejected() {
        let (instance, coprocessor) = instance().await;
        let user = Address::repeat_byte(0x01);
        let inputs = instance
            .create_encrypted_input(CONTRACT, user)
            .add32(3)
            .encrypt()
            .await
            .unwrap();

        let mut bytes = inputs.input_proof.0.clone();
        let last = bytes.len() - 1;
        bytes[last] ^= 0x01;
        assert!(matches!(
            coprocessor.verify_input(&inputs.handles[0], &InputProof(bytes), CONTRACT, user),
            Err(FhevmError::InvalidProof(_))
        ));
    }

    #[tokio::test]
    async fn test_empty_and_oversized_inputs() {
        let (instance, _) = instance().await;
        let user = Address::repeat_byte(0x01);

        let empty = instance.create_encrypted_input(CONTRACT, user).encrypt().await;
        assert!(matches!(empty, Err(FhevmError::EmptyInput)));

        let mut input = instance.create_encrypted_input(CONTRACT, user);
        for _ in 0..33 {
            input = input.add64(1);
        }
        assert!(matches!(
            input.encrypt().await,
            Err(FhevmError::InputTooLarge { bits: 2112, .. })
        ));
    }

    #[tokio::test]
    async fn test_add_then_user_decrypt() {
        let (instance, coprocessor) = instance().await;
        let signer = PrivateKeySigner::random();
        let user = signer.address();

        let a = instance
            .create_encrypted_input(CONTRACT, user)
            .add32(3)
            .encrypt()
            .await
            .unwrap();
        let b = instance
            .create_encrypted_input(CONTRACT, user)
            .add32(5)
            .encrypt()
            .await
            .unwrap();
        let ha = coprocessor
            .verify_input(&a.handles[0], &a.input_proof, CONTRACT, user)
            .unwrap();
        let hb = coprocessor
            .verify_input(&b.handles[0], &b.input_proof, CONTRACT, user)
            .unwrap();
        let sum = coprocessor.add(&ha, &hb, CONTRACT).unwrap();

        let params = authorize(instance.as_ref(), &signer, &sum, unix_seconds());

        // not yet allowed for the user
        let values = instance.user_decrypt(params.clone()).await.unwrap();
        assert!(values.is_empty());

        coprocessor.allow(&sum, user);
        let values = instance.user_decrypt(params).await.unwrap();
        assert_eq!(values.get(&sum.to_hex()), Some(&8));
    }

    #[tokio::test]
    async fn test_add_wraps_at_width() {
        let (_, coprocessor) = instance().await;
        let max = coprocessor
            .trivial_encrypt(u64::from(u32::MAX), FheType::Uint32, CONTRACT)
            .unwrap();
        let two = coprocessor.trivial_encrypt(2, FheType::Uint32, CONTRACT).unwrap();
        let sum = coprocessor.add(&max, &two, CONTRACT).unwrap();

        let state = coprocessor.read();
        let stored = state.ciphertexts.get(&sum).unwrap();
        assert_eq!(coprocessor.open_network(stored).unwrap(), 1);
    }

    #[tokio::test]
    async fn test_add_requires_acl() {
        let (_, coprocessor) = instance().await;
        let a = coprocessor.trivial_encrypt(1, FheType::Uint32, CONTRACT).unwrap();
        let b = coprocessor.trivial_encrypt(1, FheType::Uint32, CONTRACT).unwrap();
        assert!(matches!(
            coprocessor.add(&a, &b, Address::repeat_byte(0x99)),
            Err(FhevmError::Unauthorized(_))
        ));
    }

    #[tokio::test]
    async fn test_user_decrypt_rejects_foreign_signature() {
        let (instance, coprocessor) = instance().await;
        let signer = PrivateKeySigner::random();
        let handle = coprocessor.trivial_encrypt(7, FheType::Uint32, CONTRACT).unwrap();
        coprocessor.allow(&handle, signer.address());

        let mut params = authorize(instance.as_ref(), &signer, &handle, unix_seconds());
        params.user_address = PrivateKeySigner::random().address();

        assert!(matches!(
            instance.user_decrypt(params).await,
            Err(FhevmError::Unauthorized(_))
        ));
    }

    #[tokio::test]
    async fn test_user_decrypt_rejects_expired_window() {
        let (instance, coprocessor) = instance().await;
        let signer = PrivateKeySigner::random();
        let handle = coprocessor.trivial_encrypt(7, FheType::Uint32, CONTRACT).unwrap();
        coprocessor.allow(&handle, signer.address());

        let stale_start = unix_seconds() - 366 * SECONDS_PER_DAY;
        let params = authorize(instance.as_ref(), &signer, &handle, stale_start);

        assert!(matches!(
            instance.user_decrypt(params).await,
            Err(FhevmError::AuthorizationExpired { .. })
        ));
    }

    #[tokio::test]
    async fn test_user_decrypt_rejects_uncovered_contract() {
        let (instance, coprocessor) = instance().await;
        let signer = PrivateKeySigner::random();
        let handle = coprocessor.trivial_encrypt(7, FheType::Uint32, CONTRACT).unwrap();

        let mut params = authorize(instance.as_ref(), &signer, &handle, unix_seconds());
        params.pairs[0].contract_address = Address::repeat_byte(0xee);

        assert!(matches!(
            instance.user_decrypt(params).await,
            Err(FhevmError::InvalidRequest(_))
        ));
    }

    #[tokio::test]
    async fn test_sdk_counts_constructions() {
        let coprocessor = Arc::new(LocalCoprocessor::new(LocalDeployment::default()));
        let sdk = LocalFhevm::new(Arc::clone(&coprocessor));
        sdk.init().await.unwrap();
        sdk.create_instance(coprocessor.deployment().instance_config())
            .await
            .unwrap();

        assert_eq!(sdk.init_calls(), 1);
        assert_eq!(sdk.instances_created(), 1);
    }
}
