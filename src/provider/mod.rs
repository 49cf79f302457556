//! # Provider Modules
//!
//! Backends the cache reads from.
//!
//! Each provider implements the `SecretsBackend` trait:
//! - `aws`: AWS Secrets Manager through the official SDK
//! - `memory`: in-process staging-label store for tests and local runs

use crate::error::BackendError;
use crate::types::SecretPayload;
use async_trait::async_trait;
use std::collections::HashMap;

/// Read side of a versioned secret store with stage labels
#[async_trait]
pub trait SecretsBackend: Send + Sync + std::fmt::Debug {
    /// Current stage label → version id mapping for a secret
    ///
    /// Returns `Ok(None)` when the secret exists but has no stage mapping
    /// (e.g. mid-creation).
    async fn describe_stages(
        &self,
        secret_id: &str,
    ) -> Result<Option<HashMap<String, String>>, BackendError>;

    /// Payload of one immutable version
    ///
    /// Fails with [`BackendError::NotFound`] when the secret or version does not exist.
    async fn fetch_version(
        &self,
        secret_id: &str,
        version_id: &str,
    ) -> Result<SecretPayload, BackendError>;
}

pub mod aws;
pub mod memory;

pub use aws::AwsSecretsBackend;
pub use memory::InMemoryBackend;
