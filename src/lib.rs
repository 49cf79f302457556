//! Secrets Manager Cache Library
//!
//! Read-through cache for AWS Secrets Manager style stores, where each secret
//! has immutable versions and mutable stage labels (`AWSCURRENT`,
//! `AWSPREVIOUS`, ...) pointing at them.
//!
//! - [`SecretCacheStore`] is the engine: an LRU of secret names, each holding a
//!   lazily refreshed stage mapping and a small LRU of versions.
//! - [`SecretsManagerCache`] is the client most callers want. It turns "absent"
//!   into [`Error::NotFound`] and decodes payloads.
//! - [`SecretsBackend`] is the seam to the remote store; [`AwsSecretsBackend`]
//!   talks to AWS and [`InMemoryBackend`] is an in-process stand-in.

pub mod cache;
pub mod client;
pub mod config;
pub mod constants;
pub mod error;
pub mod observability;
pub mod provider;
pub mod server;
pub mod types;

pub use cache::SecretCacheStore;
pub use client::SecretsManagerCache;
pub use config::{AwsConfig, CacheConfig};
pub use error::{BackendError, Error, Result};
pub use provider::{AwsSecretsBackend, InMemoryBackend, SecretsBackend};
pub use types::{GetSecretOptions, SecretPayload};
