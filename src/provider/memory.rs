//! # In-Memory Backend
//!
//! In-process secret store with AWS-style versioning and staging labels:
//! - Each write creates a new version and moves `AWSCURRENT` to it
//! - The version that held `AWSCURRENT` receives `AWSPREVIOUS`
//! - Labels can be moved or removed explicitly to simulate rotation
//!
//! It also counts backend calls and can inject failures, which is what the
//! cache tests assert against.

use crate::constants::{DEFAULT_VERSION_STAGE, PREVIOUS_VERSION_STAGE};
use crate::error::BackendError;
use crate::provider::SecretsBackend;
use crate::types::SecretPayload;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

#[derive(Debug, Default)]
struct StoredSecret {
    versions: HashMap<String, SecretPayload>,
    /// Maps staging labels to version IDs
    stages: HashMap<String, String>,
    next_version: u64,
}

#[derive(Debug, Default)]
struct InjectedFailures {
    describe: VecDeque<String>,
    fetch: VecDeque<String>,
}

/// In-memory [`SecretsBackend`]
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    secrets: Mutex<HashMap<String, StoredSecret>>,
    failures: Mutex<InjectedFailures>,
    describe_calls: AtomicUsize,
    fetch_calls: AtomicUsize,
    latency: Option<Duration>,
}

impl InMemoryBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every backend call by `latency` (uses `tokio::time::sleep`)
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Write a new `SecretString` version and make it `AWSCURRENT`
    ///
    /// Returns the generated version id.
    pub fn put_secret_string(&self, secret_id: &str, value: &str) -> String {
        self.put_rotated(secret_id, SecretPayload::from_string(value))
    }

    /// Write a new `SecretBinary` version and make it `AWSCURRENT`
    pub fn put_secret_binary(&self, secret_id: &str, bytes: impl AsRef<[u8]>) -> String {
        self.put_rotated(secret_id, SecretPayload::from_binary(bytes))
    }

    fn put_rotated(&self, secret_id: &str, payload: SecretPayload) -> String {
        let mut secrets = self.secrets.lock();
        let secret = secrets.entry(secret_id.to_string()).or_default();
        secret.next_version += 1;
        let version_id = format!("{secret_id}-v{}", secret.next_version);

        // Move AWSCURRENT to AWSPREVIOUS if it exists
        if let Some(prev_current) = secret.stages.remove(DEFAULT_VERSION_STAGE) {
            secret
                .stages
                .insert(PREVIOUS_VERSION_STAGE.to_string(), prev_current);
        }
        secret
            .stages
            .insert(DEFAULT_VERSION_STAGE.to_string(), version_id.clone());
        secret.versions.insert(
            version_id.clone(),
            payload.with_identity(secret_id, version_id.as_str()),
        );
        version_id
    }

    /// Store `payload` under an explicit version id and attach `stages` to it
    ///
    /// Each stage is moved off whatever version held it before. An empty
    /// payload is stored as is, to simulate a malformed backend response.
    pub fn put_version(
        &self,
        secret_id: &str,
        version_id: &str,
        payload: SecretPayload,
        stages: &[&str],
    ) {
        let payload = if payload.is_empty() {
            payload
        } else {
            payload.with_identity(secret_id, version_id)
        };
        let mut secrets = self.secrets.lock();
        let secret = secrets.entry(secret_id.to_string()).or_default();
        secret.versions.insert(version_id.to_string(), payload);
        for stage in stages {
            secret
                .stages
                .insert((*stage).to_string(), version_id.to_string());
        }
    }

    /// Move `stage` to `move_to_version_id`, or remove it when `None`
    ///
    /// Returns false if the secret or the target version does not exist.
    pub fn update_version_stage(
        &self,
        secret_id: &str,
        stage: &str,
        move_to_version_id: Option<&str>,
    ) -> bool {
        let mut secrets = self.secrets.lock();
        let Some(secret) = secrets.get_mut(secret_id) else {
            return false;
        };
        match move_to_version_id {
            Some(version_id) if secret.versions.contains_key(version_id) => {
                secret
                    .stages
                    .insert(stage.to_string(), version_id.to_string());
                true
            }
            Some(_) => false,
            None => {
                secret.stages.remove(stage);
                true
            }
        }
    }

    /// Remove every staging label from a secret, keeping its versions
    pub fn clear_stages(&self, secret_id: &str) {
        if let Some(secret) = self.secrets.lock().get_mut(secret_id) {
            secret.stages.clear();
        }
    }

    /// Delete one version and any labels pointing at it
    pub fn delete_version(&self, secret_id: &str, version_id: &str) -> bool {
        let mut secrets = self.secrets.lock();
        let Some(secret) = secrets.get_mut(secret_id) else {
            return false;
        };
        secret.stages.retain(|_, vid| vid != version_id);
        secret.versions.remove(version_id).is_some()
    }

    /// Delete a secret (all versions and labels)
    pub fn delete_secret(&self, secret_id: &str) -> bool {
        self.secrets.lock().remove(secret_id).is_some()
    }

    /// Staging labels for a secret, as the backend currently sees them
    #[must_use]
    pub fn stages(&self, secret_id: &str) -> Option<HashMap<String, String>> {
        self.secrets
            .lock()
            .get(secret_id)
            .map(|secret| secret.stages.clone())
    }

    /// Fail the next `describe_stages` call with a service error
    pub fn fail_next_describe(&self, message: &str) {
        self.failures.lock().describe.push_back(message.to_string());
    }

    /// Fail the next `fetch_version` call with a service error
    pub fn fail_next_fetch(&self, message: &str) {
        self.failures.lock().fetch.push_back(message.to_string());
    }

    /// Number of `describe_stages` calls made so far
    #[must_use]
    pub fn describe_calls(&self) -> usize {
        self.describe_calls.load(Ordering::SeqCst)
    }

    /// Number of `fetch_version` calls made so far
    #[must_use]
    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    async fn simulate_latency(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }
}

#[async_trait]
impl SecretsBackend for InMemoryBackend {
    async fn describe_stages(
        &self,
        secret_id: &str,
    ) -> Result<Option<HashMap<String, String>>, BackendError> {
        self.describe_calls.fetch_add(1, Ordering::SeqCst);
        self.simulate_latency().await;

        let injected = self.failures.lock().describe.pop_front();
        if let Some(message) = injected {
            return Err(BackendError::service(message));
        }

        let secrets = self.secrets.lock();
        let secret = secrets
            .get(secret_id)
            .ok_or_else(|| BackendError::not_found(format!("secret {secret_id}")))?;
        if secret.stages.is_empty() {
            Ok(None)
        } else {
            Ok(Some(secret.stages.clone()))
        }
    }

    async fn fetch_version(
        &self,
        secret_id: &str,
        version_id: &str,
    ) -> Result<SecretPayload, BackendError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        self.simulate_latency().await;

        let injected = self.failures.lock().fetch.pop_front();
        if let Some(message) = injected {
            return Err(BackendError::service(message));
        }

        self.secrets
            .lock()
            .get(secret_id)
            .and_then(|secret| secret.versions.get(version_id))
            .cloned()
            .ok_or_else(|| {
                BackendError::not_found(format!("secret {secret_id} version {version_id}"))
            })
    }
}
