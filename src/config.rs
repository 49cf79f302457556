//! # Configuration
//!
//! Cache and backend settings loaded from environment variables.

use crate::constants::{
    DEFAULT_MAX_CACHE_SIZE, DEFAULT_SECRET_REFRESH_INTERVAL_SECS, DEFAULT_VERSION_STAGE,
    MAX_CACHE_SIZE, MAX_SECRET_REFRESH_INTERVAL_SECS,
};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Cache configuration
///
/// All settings have sensible defaults and can be overridden via environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Maximum number of secret names held by the top-level cache
    /// The least-recently-used name is evicted when a new one is inserted beyond this bound
    pub max_cache_size: usize,
    /// Refresh interval for stage mappings and version payloads (seconds)
    pub secret_refresh_interval_secs: u64,
    /// Stage label used when a lookup names neither a version id nor a stage
    pub default_version_stage: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_cache_size: DEFAULT_MAX_CACHE_SIZE,
            secret_refresh_interval_secs: DEFAULT_SECRET_REFRESH_INTERVAL_SECS,
            default_version_stage: DEFAULT_VERSION_STAGE.to_string(),
        }
    }
}

impl CacheConfig {
    /// Load configuration from environment variables with defaults
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            max_cache_size: env_var_or_default("SECRETS_CACHE_MAX_SIZE", DEFAULT_MAX_CACHE_SIZE),
            secret_refresh_interval_secs: env_var_or_default(
                "SECRETS_CACHE_REFRESH_INTERVAL_SECS",
                DEFAULT_SECRET_REFRESH_INTERVAL_SECS,
            ),
            default_version_stage: env_var_or_default_str(
                "SECRETS_CACHE_DEFAULT_VERSION_STAGE",
                DEFAULT_VERSION_STAGE,
            ),
        }
    }

    /// Get secret refresh interval duration
    #[must_use]
    pub fn secret_refresh_interval(&self) -> Duration {
        Duration::from_secs(self.secret_refresh_interval_secs)
    }

    /// Reject settings the cache cannot run with
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] when the cache size or the refresh
    /// interval is zero or above its ceiling, or the default stage is empty.
    pub fn validate(&self) -> Result<()> {
        if self.max_cache_size == 0 || self.max_cache_size > MAX_CACHE_SIZE {
            return Err(Error::InvalidConfig(format!(
                "max_cache_size must be between 1 and {MAX_CACHE_SIZE}, got {}",
                self.max_cache_size
            )));
        }
        if self.secret_refresh_interval_secs == 0
            || self.secret_refresh_interval_secs > MAX_SECRET_REFRESH_INTERVAL_SECS
        {
            return Err(Error::InvalidConfig(format!(
                "secret_refresh_interval_secs must be between 1 and {MAX_SECRET_REFRESH_INTERVAL_SECS}, got {}",
                self.secret_refresh_interval_secs
            )));
        }
        if self.default_version_stage.trim().is_empty() {
            return Err(Error::InvalidConfig(
                "default_version_stage must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// AWS configuration for Secrets Manager
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AwsConfig {
    /// Region override; the SDK default chain is used when unset
    #[serde(default)]
    pub region: Option<String>,
    /// Endpoint override, e.g. a local mock server
    #[serde(default)]
    pub endpoint_url: Option<String>,
}

impl AwsConfig {
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            region: std::env::var("AWS_REGION").ok(),
            endpoint_url: std::env::var("AWS_ENDPOINT_URL").ok(),
        }
    }
}

/// Read environment variable or return default value
fn env_var_or_default<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Read environment variable as string or return default
fn env_var_or_default_str(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CacheConfig::default();
        assert_eq!(config.max_cache_size, 128);
        assert_eq!(config.secret_refresh_interval(), Duration::from_secs(3600));
        assert_eq!(config.default_version_stage, "AWSCURRENT");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_cache_size() {
        let config = CacheConfig {
            max_cache_size: 0,
            ..CacheConfig::default()
        };
        match config.validate() {
            Err(Error::InvalidConfig(msg)) => assert!(msg.contains("max_cache_size")),
            other => panic!("Expected InvalidConfig, got {other:?}"),
        }
    }

    #[test]
    fn test_validate_rejects_zero_interval_and_empty_stage() {
        let zero_interval = CacheConfig {
            secret_refresh_interval_secs: 0,
            ..CacheConfig::default()
        };
        assert!(matches!(
            zero_interval.validate(),
            Err(Error::InvalidConfig(_))
        ));

        let empty_stage = CacheConfig {
            default_version_stage: "  ".to_string(),
            ..CacheConfig::default()
        };
        assert!(matches!(empty_stage.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_validate_accepts_ceilings_and_rejects_beyond() {
        let at_ceiling = CacheConfig {
            max_cache_size: MAX_CACHE_SIZE,
            secret_refresh_interval_secs: MAX_SECRET_REFRESH_INTERVAL_SECS,
            ..CacheConfig::default()
        };
        assert!(at_ceiling.validate().is_ok());

        for config in [
            CacheConfig {
                max_cache_size: MAX_CACHE_SIZE + 1,
                ..CacheConfig::default()
            },
            CacheConfig {
                max_cache_size: usize::MAX,
                ..CacheConfig::default()
            },
            CacheConfig {
                secret_refresh_interval_secs: MAX_SECRET_REFRESH_INTERVAL_SECS + 1,
                ..CacheConfig::default()
            },
            CacheConfig {
                secret_refresh_interval_secs: u64::MAX,
                ..CacheConfig::default()
            },
        ] {
            assert!(
                matches!(config.validate(), Err(Error::InvalidConfig(_))),
                "Expected InvalidConfig for {config:?}"
            );
        }
    }

    #[test]
    fn test_env_var_or_default_uses_default_when_unset() {
        assert_eq!(
            env_var_or_default("SECRETS_CACHE_TEST_UNSET_VARIABLE", 42usize),
            42
        );
    }

    #[test]
    fn test_aws_config_deserialize() {
        let config: AwsConfig =
            serde_json::from_str(r#"{"region":"eu-west-1","endpointUrl":"http://localhost:4566"}"#)
                .unwrap();
        assert_eq!(config.region.as_deref(), Some("eu-west-1"));
        assert_eq!(config.endpoint_url.as_deref(), Some("http://localhost:4566"));

        let empty: AwsConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(empty, AwsConfig::default());
    }
}
