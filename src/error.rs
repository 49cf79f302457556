//! # Errors
//!
//! Error types for the cache and its backends.
//!
//! "Not found" is not an error inside the cache: lookups return `Ok(None)`.
//! Only the [`SecretsManagerCache`](crate::client::SecretsManagerCache) client
//! turns it into [`Error::NotFound`].

use crate::constants::RESOURCE_NOT_FOUND_CODE;
use thiserror::Error;

/// Crate-wide result type
pub type Result<T> = std::result::Result<T, Error>;

/// Errors reported by a [`SecretsBackend`](crate::provider::SecretsBackend)
#[derive(Debug, Error)]
pub enum BackendError {
    /// The secret or the requested version does not exist
    #[error("{resource} not found")]
    NotFound { resource: String },

    /// Transport, authentication or service-side failure
    #[error("secrets backend request failed: {0}")]
    Service(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl BackendError {
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    pub fn service<E>(error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::Service(error.into())
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Errors surfaced to callers of the cache and the convenience client
#[derive(Debug, Error)]
pub enum Error {
    /// Secret name unknown, stage unresolved or version unknown
    #[error("Secrets Manager can't find the specified secret: {secret_id}")]
    NotFound { secret_id: String },

    /// Backend failure, passed through as-is
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// The backend answered but the version carries neither SecretString nor SecretBinary
    #[error("secret {secret_id} version {version_id} has neither SecretString nor SecretBinary")]
    MalformedPayload {
        secret_id: String,
        version_id: String,
    },

    #[error("secret {secret_id} is not valid JSON: {source}")]
    Json {
        secret_id: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("secret {secret_id} has an invalid base64 SecretBinary: {source}")]
    Base64 {
        secret_id: String,
        #[source]
        source: base64::DecodeError,
    },

    #[error("secret {secret_id} is not valid UTF-8: {source}")]
    Utf8 {
        secret_id: String,
        #[source]
        source: std::string::FromUtf8Error,
    },

    #[error("invalid cache configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    /// Stable machine-readable code for this error
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Error::NotFound { .. } | Error::Backend(BackendError::NotFound { .. }) => {
                RESOURCE_NOT_FOUND_CODE
            }
            Error::Backend(BackendError::Service(_)) => "BackendError",
            Error::MalformedPayload { .. } => "MalformedPayload",
            Error::Json { .. } => "JsonParseError",
            Error::Base64 { .. } | Error::Utf8 { .. } => "DecodeError",
            Error::InvalidConfig(_) => "InvalidConfiguration",
        }
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.code() == RESOURCE_NOT_FOUND_CODE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_code() {
        let err = Error::NotFound {
            secret_id: "db-password".to_string(),
        };
        assert_eq!(err.code(), "ResourceNotFoundException");
        assert!(err.is_not_found());
        assert!(err.to_string().contains("db-password"));
    }

    #[test]
    fn test_backend_error_is_transparent() {
        let err: Error = BackendError::service("connection reset by peer").into();
        assert_eq!(
            err.to_string(),
            "secrets backend request failed: connection reset by peer"
        );
        assert_eq!(err.code(), "BackendError");
        assert!(!err.is_not_found());
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_backend_not_found_helpers() {
        let err = BackendError::not_found("secret db-password");
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "secret db-password not found");
        assert!(!BackendError::service("throttled").is_not_found());
    }

    #[test]
    fn test_json_error_code_distinct_from_not_found() {
        let source = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err = Error::Json {
            secret_id: "api-config".to_string(),
            source,
        };
        assert_eq!(err.code(), "JsonParseError");
        assert!(!err.is_not_found());
    }
}
