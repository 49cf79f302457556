//! # Secret Cache Store
//!
//! Top level of the cache: an LRU of [`SecretEntry`] values keyed by secret
//! name. It routes each lookup to the right entry, creating it on first
//! access, and makes no backend calls of its own.

use super::bounded::BoundedCache;
use super::secret::SecretEntry;
use crate::config::CacheConfig;
use crate::error::{Error, Result};
use crate::observability::metrics;
use crate::provider::SecretsBackend;
use crate::types::{GetSecretOptions, SecretPayload};
use std::num::NonZeroUsize;
use std::sync::Arc;
use tracing::{debug, debug_span, Instrument};

/// Read-through cache over a [`SecretsBackend`]
///
/// Cheap to share behind an `Arc`; every method takes `&self`.
pub struct SecretCacheStore {
    config: CacheConfig,
    backend: Arc<dyn SecretsBackend>,
    entries: BoundedCache<String, SecretEntry>,
}

impl std::fmt::Debug for SecretCacheStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretCacheStore")
            .field("config", &self.config)
            .field("backend", &self.backend)
            .field("entries", &self.entries)
            .finish()
    }
}

impl SecretCacheStore {
    /// Create a store with the given configuration
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if the configuration does not validate.
    pub fn new(backend: Arc<dyn SecretsBackend>, config: CacheConfig) -> Result<Self> {
        config.validate()?;
        let capacity = NonZeroUsize::new(config.max_cache_size).ok_or_else(|| {
            Error::InvalidConfig("max_cache_size must be greater than zero".to_string())
        })?;
        Ok(Self {
            config,
            backend,
            entries: BoundedCache::new(capacity),
        })
    }

    /// Resolve a secret by version id, stage, or the default stage
    ///
    /// Returns `Ok(None)` when the secret, the stage or the version does not exist.
    ///
    /// # Errors
    ///
    /// Backend failures are returned unchanged as [`Error::Backend`];
    /// a version with neither value field yields [`Error::MalformedPayload`].
    pub async fn get(
        &self,
        secret_id: &str,
        options: &GetSecretOptions,
    ) -> Result<Option<SecretPayload>> {
        let selector = options.selector(&self.config.default_version_stage);
        let span = debug_span!("cache.get", secret.id = secret_id);

        async move {
            let refresh_interval = self.config.secret_refresh_interval();
            let admission = self.entries.get_or_insert_with(secret_id, || {
                SecretEntry::new(secret_id, refresh_interval)
            });
            metrics::record_lookup("secret", !admission.inserted);
            if let Some(evicted) = &admission.evicted {
                metrics::increment_evictions("secret");
                debug!(
                    secret_id = %evicted,
                    "Evicted least-recently-used secret"
                );
            }
            if admission.inserted {
                metrics::set_secrets_cached(self.entries.len());
            }

            admission.entry.resolve(self.backend.as_ref(), selector).await
        }
        .instrument(span)
        .await
    }

    /// Drop the cached entry for `secret_id`; the next lookup starts cold
    pub fn invalidate(&self, secret_id: &str) -> bool {
        let removed = self.entries.remove(secret_id).is_some();
        if removed {
            debug!(secret_id = secret_id, "Invalidated cached secret");
            metrics::set_secrets_cached(self.entries.len());
        }
        removed
    }

    pub fn clear(&self) {
        self.entries.clear();
        metrics::set_secrets_cached(0);
    }

    /// True when `secret_id` is cached; does not affect LRU order
    #[must_use]
    pub fn contains(&self, secret_id: &str) -> bool {
        self.entries.contains(secret_id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::MAX_SECRET_REFRESH_INTERVAL_SECS;
    use crate::provider::memory::InMemoryBackend;
    use std::time::Duration;

    fn store_with(backend: &Arc<InMemoryBackend>, max_cache_size: usize) -> SecretCacheStore {
        let config = CacheConfig {
            max_cache_size,
            ..CacheConfig::default()
        };
        SecretCacheStore::new(Arc::clone(backend) as Arc<dyn SecretsBackend>, config).unwrap()
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let backend: Arc<dyn SecretsBackend> = Arc::new(InMemoryBackend::new());
        let config = CacheConfig {
            max_cache_size: 0,
            ..CacheConfig::default()
        };
        assert!(matches!(
            SecretCacheStore::new(backend, config),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_new_rejects_oversized_settings() {
        for config in [
            CacheConfig {
                max_cache_size: usize::MAX,
                ..CacheConfig::default()
            },
            CacheConfig {
                secret_refresh_interval_secs: u64::MAX,
                ..CacheConfig::default()
            },
        ] {
            let backend: Arc<dyn SecretsBackend> = Arc::new(InMemoryBackend::new());
            assert!(matches!(
                SecretCacheStore::new(backend, config),
                Err(Error::InvalidConfig(_))
            ));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_longest_refresh_interval_resolves() {
        let backend = Arc::new(InMemoryBackend::new());
        backend.put_secret_string("db", "hunter2");
        let config = CacheConfig {
            secret_refresh_interval_secs: MAX_SECRET_REFRESH_INTERVAL_SECS,
            ..CacheConfig::default()
        };
        let store =
            SecretCacheStore::new(Arc::clone(&backend) as Arc<dyn SecretsBackend>, config).unwrap();

        assert!(store
            .get("db", &GetSecretOptions::default())
            .await
            .unwrap()
            .is_some());
        tokio::time::advance(Duration::from_secs(MAX_SECRET_REFRESH_INTERVAL_SECS + 1)).await;
        store.get("db", &GetSecretOptions::default()).await.unwrap();
        assert_eq!(backend.describe_calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_default_stage_is_used() {
        let backend = Arc::new(InMemoryBackend::new());
        backend.put_secret_string("db", "hunter2");
        let store = store_with(&backend, 4);

        let payload = store
            .get("db", &GetSecretOptions::default())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(payload.secret_string.as_deref(), Some("hunter2"));
        assert!(store.contains("db"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_evicts_least_recently_used_secret() {
        let backend = Arc::new(InMemoryBackend::new());
        for name in ["a", "b", "c"] {
            backend.put_secret_string(name, name);
        }
        let store = store_with(&backend, 2);

        store.get("a", &GetSecretOptions::default()).await.unwrap();
        store.get("b", &GetSecretOptions::default()).await.unwrap();
        store.get("a", &GetSecretOptions::default()).await.unwrap();
        store.get("c", &GetSecretOptions::default()).await.unwrap();

        assert_eq!(store.len(), 2);
        assert!(store.contains("a"));
        assert!(!store.contains("b"));
        assert!(store.contains("c"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalidate_forces_refetch() {
        let backend = Arc::new(InMemoryBackend::new());
        backend.put_secret_string("db", "hunter2");
        let store = store_with(&backend, 4);

        store.get("db", &GetSecretOptions::default()).await.unwrap();
        assert!(store.invalidate("db"));
        assert!(!store.invalidate("db"));
        store.get("db", &GetSecretOptions::default()).await.unwrap();

        assert_eq!(backend.describe_calls(), 2);
        assert_eq!(backend.fetch_calls(), 2);

        store.clear();
        assert!(store.is_empty());
    }
}
