//! The lazily constructed FHE client.
//!
//! Construction is expensive (SDK bootstrap, key material download in a
//! deployed setting), so an [`EncryptionClient`] builds its instance once on
//! first use and hands out the same `Arc` afterwards. Concurrent first
//! callers share a single construction.

use std::sync::Arc;

use tokio::sync::OnceCell;

use cookie_jar_fhevm::{FhevmInstance, FhevmSdk};

use crate::config::FhevmConfig;
use crate::error::{CookieJarError, Result};

/// Owner of the process-lifetime FHE instance.
pub struct EncryptionClient {
    config: FhevmConfig,
    sdk: Arc<dyn FhevmSdk>,
    instance: OnceCell<Arc<dyn FhevmInstance>>,
}

impl EncryptionClient {
    pub fn new(config: FhevmConfig, sdk: Arc<dyn FhevmSdk>) -> Self {
        Self {
            config,
            sdk,
            instance: OnceCell::new(),
        }
    }

    pub fn config(&self) -> &FhevmConfig {
        &self.config
    }

    /// Return the instance, constructing it on first use.
    ///
    /// Configuration is validated before the SDK is touched. A failed
    /// construction leaves nothing behind, so a later call tries again.
    pub async fn ensure_instance(&self) -> Result<Arc<dyn FhevmInstance>> {
        let instance = self
            .instance
            .get_or_try_init(|| async {
                let instance_config = self.config.instance_config()?;

                tracing::debug!("bootstrapping fhevm sdk");
                self.sdk.init().await?;

                let instance = self.sdk.create_instance(instance_config).await?;
                tracing::info!(
                    chain_id = self.config.target_chain_id,
                    gateway_chain_id = self.config.gateway_chain_id,
                    "fhevm instance ready"
                );
                Ok::<_, CookieJarError>(instance)
            })
            .await?;

        Ok(Arc::clone(instance))
    }

    /// Whether the instance has been constructed.
    pub fn is_initialized(&self) -> bool {
        self.instance.initialized()
    }

    /// Drop the constructed instance so the next call builds a new one.
    pub fn reset(&mut self) {
        self.instance.take();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use cookie_jar_core::Address;
    use cookie_jar_fhevm::{
        FhevmError, InstanceConfig, LocalCoprocessor, LocalDeployment, LocalFhevm,
    };

    fn setup(delay: Option<Duration>) -> (Arc<LocalFhevm>, FhevmConfig) {
        let deployment = LocalDeployment::default();
        let config = FhevmConfig::local(&deployment, Address::repeat_byte(0x77));
        let mut sdk = LocalFhevm::new(Arc::new(LocalCoprocessor::new(deployment)));
        if let Some(delay) = delay {
            sdk = sdk.with_construction_delay(delay);
        }
        (Arc::new(sdk), config)
    }

    #[tokio::test]
    async fn test_sequential_calls_share_instance() {
        let (sdk, config) = setup(None);
        let client = EncryptionClient::new(config, sdk.clone());

        let a = client.ensure_instance().await.unwrap();
        let b = client.ensure_instance().await.unwrap();

        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(sdk.init_calls(), 1);
        assert_eq!(sdk.instances_created(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_first_use_constructs_once() {
        let (sdk, config) = setup(Some(Duration::from_millis(50)));
        let client = Arc::new(EncryptionClient::new(config, sdk.clone()));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let client = Arc::clone(&client);
                tokio::spawn(async move { client.ensure_instance().await })
            })
            .collect();

        let mut instances = Vec::new();
        for handle in handles {
            instances.push(handle.await.unwrap().unwrap());
        }

        assert_eq!(sdk.instances_created(), 1);
        assert!(instances.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
    }

    #[tokio::test]
    async fn test_bad_config_fails_before_bootstrap() {
        let (sdk, mut config) = setup(None);
        config.relayer_url.clear();
        let client = EncryptionClient::new(config, sdk.clone());

        let err = client.ensure_instance().await.err().unwrap();
        assert!(matches!(err, CookieJarError::Configuration(ref m) if m.contains("COOKIE_JAR_RELAYER_URL")));
        assert_eq!(sdk.init_calls(), 0);
        assert!(!client.is_initialized());
    }

    #[tokio::test]
    async fn test_reset_rebuilds() {
        let (sdk, config) = setup(None);
        let mut client = EncryptionClient::new(config, sdk.clone());

        let a = client.ensure_instance().await.unwrap();
        client.reset();
        assert!(!client.is_initialized());
        let b = client.ensure_instance().await.unwrap();

        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(sdk.instances_created(), 2);
    }

    #[tokio::test]
    async fn test_sdk_rejection_is_not_memoized() {
        let (sdk, mut config) = setup(None);
        config.target_chain_id = 1;
        let client = EncryptionClient::new(config, sdk.clone());

        for attempt in 1..=2 {
            assert!(matches!(
                client.ensure_instance().await,
                Err(CookieJarError::Fhevm(FhevmError::InvalidConfig(_)))
            ));
            assert!(!client.is_initialized());
            assert_eq!(sdk.init_calls(), attempt);
        }
        assert_eq!(sdk.instances_created(), 0);
    }

    /// Fails the first `failures` constructions, then delegates.
    struct FlakySdk {
        inner: Arc<LocalFhevm>,
        failures: AtomicUsize,
    }

    #[async_trait]
    impl FhevmSdk for FlakySdk {
        async fn init(&self) -> cookie_jar_fhevm::Result<()> {
            self.inner.init().await
        }

        async fn create_instance(
            &self,
            config: InstanceConfig,
        ) -> cookie_jar_fhevm::Result<Arc<dyn FhevmInstance>> {
            if self
                .failures
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
            {
                return Err(FhevmError::Bootstrap("relayer unreachable".into()));
            }
            self.inner.create_instance(config).await
        }
    }

    #[tokio::test]
    async fn test_construction_retried_after_failure() {
        let (inner, config) = setup(None);
        let sdk = Arc::new(FlakySdk {
            inner: inner.clone(),
            failures: AtomicUsize::new(1),
        });
        let client = EncryptionClient::new(config, sdk);

        assert!(matches!(
            client.ensure_instance().await,
            Err(CookieJarError::Fhevm(FhevmError::Bootstrap(_)))
        ));
        assert!(!client.is_initialized());

        let a = client.ensure_instance().await.unwrap();
        let b = client.ensure_instance().await.unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(inner.init_calls(), 2);
        assert_eq!(inner.instances_created(), 1);
    }
}
