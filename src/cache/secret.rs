//! # Secret Entry
//!
//! Per-secret state: the stage-label → version-id mapping, refreshed lazily
//! on a jittered deadline, plus a small LRU of [`VersionEntry`] values keyed
//! by version id.
//!
//! Lookups by version id bypass the mapping entirely. Lookups by stage refresh
//! the mapping first when it is due, then resolve through the same version
//! cache, so a version reached by id and by stage is fetched only once.

use super::bounded::BoundedCache;
use super::refresh::RefreshDeadline;
use super::version::VersionEntry;
use crate::constants::VERSION_CACHE_CAPACITY;
use crate::error::{BackendError, Result};
use crate::observability::metrics;
use crate::provider::SecretsBackend;
use crate::types::{SecretPayload, VersionSelector};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

#[derive(Debug, Default)]
struct StageState {
    /// Verbatim copy of the last describe response
    stage_to_version: HashMap<String, String>,
    deadline: RefreshDeadline,
}

#[derive(Debug)]
pub(crate) struct SecretEntry {
    secret_id: String,
    refresh_interval: Duration,
    stages: Mutex<StageState>,
    versions: BoundedCache<String, VersionEntry>,
}

impl SecretEntry {
    pub(crate) fn new(secret_id: &str, refresh_interval: Duration) -> Self {
        Self {
            secret_id: secret_id.to_string(),
            refresh_interval,
            stages: Mutex::new(StageState::default()),
            versions: BoundedCache::new(version_cache_capacity()),
        }
    }

    pub(crate) async fn resolve(
        &self,
        backend: &dyn SecretsBackend,
        selector: VersionSelector<'_>,
    ) -> Result<Option<SecretPayload>> {
        let version = match selector {
            VersionSelector::Id(version_id) => self.version(version_id),
            VersionSelector::Stage(stage) => {
                let Some(version_id) = self.resolve_stage(backend, stage).await? else {
                    debug!(
                        secret_id = %self.secret_id,
                        version_stage = stage,
                        "Stage not mapped to any version"
                    );
                    return Ok(None);
                };
                self.version(&version_id)
            }
        };
        version.resolve(backend).await
    }

    /// Map `stage` to a version id, refreshing the mapping first if it is due
    async fn resolve_stage(
        &self,
        backend: &dyn SecretsBackend,
        stage: &str,
    ) -> Result<Option<String>> {
        {
            let stages = self.stages.lock();
            if !stages.deadline.is_due(Instant::now()) {
                metrics::record_lookup("mapping", true);
                let version_id = stages.stage_to_version.get(stage).cloned();
                metrics::record_lookup("stage", version_id.is_some());
                return Ok(version_id);
            }
        }
        metrics::record_lookup("mapping", false);

        let start = Instant::now();
        let result = backend.describe_stages(&self.secret_id).await;
        metrics::record_backend_call(
            "describe",
            start.elapsed().as_secs_f64(),
            matches!(&result, Err(e) if !e.is_not_found()),
        );

        // An unknown secret and a secret without stages both leave an empty
        // mapping; the deadline is reset either way.
        let mapping = match result {
            Ok(Some(mapping)) => mapping,
            Ok(None) | Err(BackendError::NotFound { .. }) => HashMap::new(),
            Err(e) => {
                warn!(
                    secret_id = %self.secret_id,
                    error = %e,
                    "Failed to describe secret stages"
                );
                return Err(e.into());
            }
        };
        debug!(
            secret_id = %self.secret_id,
            stages = mapping.len(),
            "Refreshed stage mapping"
        );

        let mut stages = self.stages.lock();
        stages.stage_to_version = mapping;
        stages.deadline.reset(Instant::now(), self.refresh_interval);
        let version_id = stages.stage_to_version.get(stage).cloned();
        metrics::record_lookup("stage", version_id.is_some());
        Ok(version_id)
    }

    /// Find or create the cached entry for `version_id`
    fn version(&self, version_id: &str) -> Arc<VersionEntry> {
        let admission = self.versions.get_or_insert_with(version_id, || {
            VersionEntry::new(&self.secret_id, version_id, self.refresh_interval)
        });
        if let Some(evicted) = &admission.evicted {
            metrics::increment_evictions("version");
            debug!(
                secret_id = %self.secret_id,
                version_id = %evicted,
                "Evicted least-recently-used version"
            );
        }
        admission.entry
    }

    #[cfg(test)]
    pub(crate) fn cached_version_ids(&self) -> Vec<String> {
        let mut ids = self.versions.keys();
        ids.sort();
        ids
    }

    #[cfg(test)]
    pub(crate) fn cached_version(&self, version_id: &str) -> Option<Arc<VersionEntry>> {
        self.versions.peek(version_id)
    }
}

fn version_cache_capacity() -> NonZeroUsize {
    NonZeroUsize::new(VERSION_CACHE_CAPACITY).unwrap_or(NonZeroUsize::MIN)
}
