//! # Types
//!
//! Request and response types shared by the cache, the backends and the client.

use base64::Engine;
use serde::{Deserialize, Serialize};

/// Secret value as returned by the backend for one version
///
/// Mirrors the `GetSecretValue` response shape. `secret_binary` holds the
/// standard base64 encoding of the binary value; the cache never decodes it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SecretPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_string: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_binary: Option<String>,
}

impl SecretPayload {
    /// Payload carrying a `SecretString`
    #[must_use]
    pub fn from_string(value: impl Into<String>) -> Self {
        Self {
            secret_string: Some(value.into()),
            ..Self::default()
        }
    }

    /// Payload carrying a `SecretBinary`, base64-encoded from raw bytes
    #[must_use]
    pub fn from_binary(bytes: impl AsRef<[u8]>) -> Self {
        Self {
            secret_binary: Some(base64::engine::general_purpose::STANDARD.encode(bytes)),
            ..Self::default()
        }
    }

    /// Attach the secret name and version id echoed by the backend
    #[must_use]
    pub fn with_identity(mut self, name: impl Into<String>, version_id: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self.version_id = Some(version_id.into());
        self
    }

    /// True when neither value field is present
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.secret_string.is_none() && self.secret_binary.is_none()
    }
}

/// Options for a single lookup
///
/// At most one of `version_id` and `version_stage` is meaningful. When both are
/// set the version id wins; when neither is set the configured default stage is used.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetSecretOptions {
    #[serde(default)]
    pub version_id: Option<String>,
    #[serde(default)]
    pub version_stage: Option<String>,
}

impl GetSecretOptions {
    /// Pin the lookup to an immutable version id
    #[must_use]
    pub fn version_id(version_id: impl Into<String>) -> Self {
        Self {
            version_id: Some(version_id.into()),
            version_stage: None,
        }
    }

    /// Resolve the lookup through a stage label
    #[must_use]
    pub fn version_stage(version_stage: impl Into<String>) -> Self {
        Self {
            version_id: None,
            version_stage: Some(version_stage.into()),
        }
    }

    pub(crate) fn selector<'a>(&'a self, default_stage: &'a str) -> VersionSelector<'a> {
        match (&self.version_id, &self.version_stage) {
            (Some(version_id), _) => VersionSelector::Id(version_id),
            (None, Some(stage)) => VersionSelector::Stage(stage),
            (None, None) => VersionSelector::Stage(default_stage),
        }
    }
}

/// How a lookup addresses a version
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum VersionSelector<'a> {
    Id(&'a str),
    Stage(&'a str),
}
