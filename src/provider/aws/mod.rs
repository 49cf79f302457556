//! # AWS Secrets Manager Backend
//!
//! Backend for the cache that reads from AWS Secrets Manager.
//!
//! - `describe_stages` calls `DescribeSecret` and inverts `VersionIdsToStages`
//! - `fetch_version` calls `GetSecretValue` pinned to a `VersionId`
//!
//! Credentials come from the SDK default chain (environment, profile, IRSA,
//! instance metadata).

use crate::config::AwsConfig;
use crate::error::BackendError;
use crate::provider::SecretsBackend;
use crate::types::SecretPayload;
use async_trait::async_trait;
use aws_sdk_secretsmanager::operation::get_secret_value::GetSecretValueOutput;
use aws_sdk_secretsmanager::Client as SecretsManagerClient;
use base64::Engine;
use std::collections::HashMap;
use std::time::Instant;
use tracing::{debug, debug_span, field, info, Instrument};

/// AWS Secrets Manager backend implementation
pub struct AwsSecretsBackend {
    client: SecretsManagerClient,
    region: Option<String>,
}

impl std::fmt::Debug for AwsSecretsBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AwsSecretsBackend")
            .field("region", &self.region)
            .finish_non_exhaustive()
    }
}

impl AwsSecretsBackend {
    /// Create a backend from the SDK default configuration chain
    ///
    /// `config.region` and `config.endpoint_url` override what the chain resolves.
    pub async fn new(config: &AwsConfig) -> Self {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
        if let Some(region) = &config.region {
            loader = loader.region(aws_config::Region::new(region.clone()));
        }
        if let Some(endpoint_url) = &config.endpoint_url {
            info!("Using AWS Secrets Manager endpoint override: {}", endpoint_url);
            loader = loader.endpoint_url(endpoint_url);
        }
        let sdk_config = loader.load().await;
        let region = sdk_config.region().map(ToString::to_string);

        Self::from_client(SecretsManagerClient::new(&sdk_config), region)
    }

    /// Wrap an already configured SDK client
    pub fn from_client(client: SecretsManagerClient, region: Option<String>) -> Self {
        Self { client, region }
    }

    fn region_label(&self) -> &str {
        self.region.as_deref().unwrap_or("default")
    }
}

#[async_trait]
impl SecretsBackend for AwsSecretsBackend {
    async fn describe_stages(
        &self,
        secret_id: &str,
    ) -> Result<Option<HashMap<String, String>>, BackendError> {
        let span = debug_span!(
            "aws.secret.describe",
            secret.name = secret_id,
            region = self.region_label(),
            operation.duration_ms = field::Empty,
            operation.success = field::Empty,
        );
        let span_clone = span.clone();
        let start = Instant::now();

        async move {
            let result = self
                .client
                .describe_secret()
                .secret_id(secret_id)
                .send()
                .await;
            span_clone.record("operation.duration_ms", elapsed_ms(start));

            match result {
                Ok(output) => {
                    span_clone.record("operation.success", true);
                    let mapping = output
                        .version_ids_to_stages()
                        .map(invert_version_stages)
                        .filter(|mapping| !mapping.is_empty());
                    debug!(
                        provider = "aws",
                        secret_name = secret_id,
                        stages = mapping.as_ref().map_or(0, HashMap::len),
                        "Described AWS secret"
                    );
                    Ok(mapping)
                }
                Err(e) => {
                    let not_found = e
                        .as_service_error()
                        .is_some_and(|se| se.is_resource_not_found_exception());
                    span_clone.record("operation.success", not_found);
                    if not_found {
                        Err(BackendError::not_found(format!("secret {secret_id}")))
                    } else {
                        Err(BackendError::service(e))
                    }
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn fetch_version(
        &self,
        secret_id: &str,
        version_id: &str,
    ) -> Result<SecretPayload, BackendError> {
        let span = debug_span!(
            "aws.secret.get",
            secret.name = secret_id,
            secret.version = version_id,
            region = self.region_label(),
            operation.duration_ms = field::Empty,
            operation.success = field::Empty,
        );
        let span_clone = span.clone();
        let start = Instant::now();

        async move {
            let result = self
                .client
                .get_secret_value()
                .secret_id(secret_id)
                .version_id(version_id)
                .send()
                .await;
            span_clone.record("operation.duration_ms", elapsed_ms(start));

            match result {
                Ok(output) => {
                    span_clone.record("operation.success", true);
                    Ok(payload_from_output(&output))
                }
                Err(e) => {
                    let not_found = e
                        .as_service_error()
                        .is_some_and(|se| se.is_resource_not_found_exception());
                    span_clone.record("operation.success", not_found);
                    if not_found {
                        Err(BackendError::not_found(format!(
                            "secret {secret_id} version {version_id}"
                        )))
                    } else {
                        Err(BackendError::service(e))
                    }
                }
            }
        }
        .instrument(span)
        .await
    }
}

/// `VersionIdsToStages` is keyed by version; the cache wants stage → version
fn invert_version_stages(versions: &HashMap<String, Vec<String>>) -> HashMap<String, String> {
    versions
        .iter()
        .flat_map(|(version_id, stages)| {
            stages
                .iter()
                .map(move |stage| (stage.clone(), version_id.clone()))
        })
        .collect()
}

fn payload_from_output(output: &GetSecretValueOutput) -> SecretPayload {
    SecretPayload {
        name: output.name().map(ToString::to_string),
        version_id: output.version_id().map(ToString::to_string),
        secret_string: output.secret_string().map(ToString::to_string),
        secret_binary: output
            .secret_binary()
            .map(|blob| base64::engine::general_purpose::STANDARD.encode(blob.as_ref())),
    }
}

fn elapsed_ms(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}
