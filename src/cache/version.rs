//! # Version Entry
//!
//! Cached payload for one immutable version of one secret.
//!
//! Versions never change at the backend, but the payload is still refetched
//! once its jittered deadline passes so that a cached "not found" (or a
//! backend-side correction) does not live forever.

use super::refresh::RefreshDeadline;
use crate::error::{BackendError, Error, Result};
use crate::observability::metrics;
use crate::provider::SecretsBackend;
use crate::types::SecretPayload;
use parking_lot::Mutex;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

#[derive(Debug, Default)]
struct VersionState {
    payload: Option<SecretPayload>,
    deadline: RefreshDeadline,
}

#[derive(Debug)]
pub(crate) struct VersionEntry {
    secret_id: String,
    version_id: String,
    refresh_interval: Duration,
    state: Mutex<VersionState>,
}

impl VersionEntry {
    pub(crate) fn new(secret_id: &str, version_id: &str, refresh_interval: Duration) -> Self {
        Self {
            secret_id: secret_id.to_string(),
            version_id: version_id.to_string(),
            refresh_interval,
            state: Mutex::new(VersionState::default()),
        }
    }

    /// Return the cached payload, fetching it first if it is due for refresh
    ///
    /// `Ok(None)` means the backend reported the version as not found.
    /// Backend failures are returned unchanged and leave the cached state as it was.
    pub(crate) async fn resolve(
        &self,
        backend: &dyn SecretsBackend,
    ) -> Result<Option<SecretPayload>> {
        {
            let state = self.state.lock();
            if !state.deadline.is_due(Instant::now()) {
                metrics::record_lookup("version", true);
                debug!(
                    secret_id = %self.secret_id,
                    version_id = %self.version_id,
                    found = state.payload.is_some(),
                    "Version cache hit"
                );
                return Ok(state.payload.clone());
            }
        }
        metrics::record_lookup("version", false);

        let start = Instant::now();
        let result = backend
            .fetch_version(&self.secret_id, &self.version_id)
            .await;
        metrics::record_backend_call(
            "fetch",
            start.elapsed().as_secs_f64(),
            matches!(&result, Err(e) if !e.is_not_found()),
        );

        match result {
            Ok(payload) => {
                if payload.is_empty() {
                    return Err(Error::MalformedPayload {
                        secret_id: self.secret_id.clone(),
                        version_id: self.version_id.clone(),
                    });
                }
                let mut state = self.state.lock();
                state.payload = Some(payload.clone());
                state.deadline.reset(Instant::now(), self.refresh_interval);
                debug!(
                    secret_id = %self.secret_id,
                    version_id = %self.version_id,
                    "Fetched secret version"
                );
                Ok(Some(payload))
            }
            Err(BackendError::NotFound { .. }) => {
                let mut state = self.state.lock();
                state.payload = None;
                state.deadline.reset(Instant::now(), self.refresh_interval);
                debug!(
                    secret_id = %self.secret_id,
                    version_id = %self.version_id,
                    "Secret version not found"
                );
                Ok(None)
            }
            Err(e) => {
                warn!(
                    secret_id = %self.secret_id,
                    version_id = %self.version_id,
                    error = %e,
                    "Failed to fetch secret version"
                );
                Err(e.into())
            }
        }
    }
}
