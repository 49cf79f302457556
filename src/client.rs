//! # Client
//!
//! Convenience front end over [`SecretCacheStore`].
//!
//! The store reports unknown secrets, stages and versions as `Ok(None)`; this
//! client turns that into [`Error::NotFound`] and offers typed views of the
//! payload (text, JSON, raw bytes).

use crate::cache::SecretCacheStore;
use crate::config::CacheConfig;
use crate::error::{Error, Result};
use crate::provider::SecretsBackend;
use crate::types::{GetSecretOptions, SecretPayload};
use base64::Engine;
use serde::de::DeserializeOwned;
use std::sync::Arc;

/// Caching Secrets Manager client
#[derive(Debug, Clone)]
pub struct SecretsManagerCache {
    store: Arc<SecretCacheStore>,
}

impl SecretsManagerCache {
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if `config` does not validate.
    pub fn new(backend: Arc<dyn SecretsBackend>, config: CacheConfig) -> Result<Self> {
        Ok(Self::from_store(Arc::new(SecretCacheStore::new(backend, config)?)))
    }

    #[must_use]
    pub fn from_store(store: Arc<SecretCacheStore>) -> Self {
        Self { store }
    }

    #[must_use]
    pub fn store(&self) -> &Arc<SecretCacheStore> {
        &self.store
    }

    /// Full payload for a secret
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] when the secret, stage or version does not exist;
    /// otherwise whatever the store returns.
    pub async fn get_secret_value(
        &self,
        secret_id: &str,
        options: &GetSecretOptions,
    ) -> Result<SecretPayload> {
        self.store
            .get(secret_id, options)
            .await?
            .ok_or_else(|| Error::NotFound {
                secret_id: secret_id.to_string(),
            })
    }

    /// Secret as text
    ///
    /// `SecretString` is returned as is; a `SecretBinary` is decoded and must be UTF-8.
    ///
    /// # Errors
    ///
    /// As [`get_secret_value`](Self::get_secret_value), plus [`Error::Base64`] or
    /// [`Error::Utf8`] when a `SecretBinary` cannot be decoded to text.
    pub async fn get_secret_string(
        &self,
        secret_id: &str,
        options: &GetSecretOptions,
    ) -> Result<String> {
        let payload = self.get_secret_value(secret_id, options).await?;
        match payload.secret_string {
            Some(text) => Ok(text),
            None => {
                let bytes = decode_binary(secret_id, &payload)?;
                String::from_utf8(bytes).map_err(|source| Error::Utf8 {
                    secret_id: secret_id.to_string(),
                    source,
                })
            }
        }
    }

    /// Secret text parsed as JSON into `T`
    ///
    /// # Errors
    ///
    /// As [`get_secret_string`](Self::get_secret_string), plus [`Error::Json`] when
    /// the text does not deserialize into `T`.
    pub async fn get_secret_json<T: DeserializeOwned>(
        &self,
        secret_id: &str,
        options: &GetSecretOptions,
    ) -> Result<T> {
        let text = self.get_secret_string(secret_id, options).await?;
        serde_json::from_str(&text).map_err(|source| Error::Json {
            secret_id: secret_id.to_string(),
            source,
        })
    }

    /// Secret as raw bytes
    ///
    /// A `SecretBinary` is base64-decoded; a `SecretString` yields its UTF-8 bytes.
    ///
    /// # Errors
    ///
    /// As [`get_secret_value`](Self::get_secret_value), plus [`Error::Base64`] when
    /// the `SecretBinary` is not valid base64.
    pub async fn get_secret_binary(
        &self,
        secret_id: &str,
        options: &GetSecretOptions,
    ) -> Result<Vec<u8>> {
        let payload = self.get_secret_value(secret_id, options).await?;
        match payload.secret_string {
            Some(text) if payload.secret_binary.is_none() => Ok(text.into_bytes()),
            _ => decode_binary(secret_id, &payload),
        }
    }
}

fn decode_binary(secret_id: &str, payload: &SecretPayload) -> Result<Vec<u8>> {
    let encoded = payload
        .secret_binary
        .as_deref()
        .ok_or_else(|| Error::MalformedPayload {
            secret_id: secret_id.to_string(),
            version_id: payload.version_id.clone().unwrap_or_default(),
        })?;
    base64::engine::general_purpose::STANDARD
        .decode(encoded)
        .map_err(|source| Error::Base64 {
            secret_id: secret_id.to_string(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::InMemoryBackend;
    use serde::Deserialize;

    fn client_with(backend: InMemoryBackend) -> SecretsManagerCache {
        SecretsManagerCache::new(Arc::new(backend), CacheConfig::default()).unwrap()
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct DbCredentials {
        username: String,
        port: u16,
    }

    #[tokio::test(start_paused = true)]
    async fn test_absent_becomes_not_found() {
        let client = client_with(InMemoryBackend::new());
        let err = client
            .get_secret_value("missing", &GetSecretOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound { ref secret_id } if secret_id == "missing"));
        assert_eq!(err.code(), "ResourceNotFoundException");
    }

    #[tokio::test(start_paused = true)]
    async fn test_get_secret_json() {
        let backend = InMemoryBackend::new();
        backend.put_secret_string("db", r#"{"username":"admin","port":5432}"#);
        let client = client_with(backend);

        let creds: DbCredentials = client
            .get_secret_json("db", &GetSecretOptions::default())
            .await
            .unwrap();
        assert_eq!(
            creds,
            DbCredentials {
                username: "admin".to_string(),
                port: 5432
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_json_is_not_not_found() {
        let backend = InMemoryBackend::new();
        backend.put_secret_string("db", "not json");
        let client = client_with(backend);

        let err = client
            .get_secret_json::<serde_json::Value>("db", &GetSecretOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Json { .. }));
        assert!(!err.is_not_found());
    }

    #[tokio::test(start_paused = true)]
    async fn test_binary_views() {
        let backend = InMemoryBackend::new();
        backend.put_secret_binary("key", [0xde, 0xad, 0xbe, 0xef]);
        backend.put_secret_binary("greeting", b"hello");
        let client = client_with(backend);
        let options = GetSecretOptions::default();

        assert_eq!(
            client.get_secret_binary("key", &options).await.unwrap(),
            vec![0xde, 0xad, 0xbe, 0xef]
        );
        assert!(matches!(
            client.get_secret_string("key", &options).await,
            Err(Error::Utf8 { .. })
        ));
        assert_eq!(
            client.get_secret_string("greeting", &options).await.unwrap(),
            "hello"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_string_as_bytes() {
        let backend = InMemoryBackend::new();
        backend.put_secret_string("token", "abc");
        let client = client_with(backend);
        assert_eq!(
            client
                .get_secret_binary("token", &GetSecretOptions::default())
                .await
                .unwrap(),
            b"abc".to_vec()
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_base64_is_decode_error() {
        let backend = InMemoryBackend::new();
        let payload = SecretPayload {
            secret_binary: Some("***".to_string()),
            ..SecretPayload::default()
        };
        backend.put_version("key", "v1", payload, &["AWSCURRENT"]);
        let client = client_with(backend);

        let err = client
            .get_secret_binary("key", &GetSecretOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Base64 { .. }));
        assert_eq!(err.code(), "DecodeError");
    }
}
