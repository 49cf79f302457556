//! # Metrics
//!
//! Prometheus metrics for monitoring the cache.
//!
//! ## Metrics Exposed
//!
//! - `secrets_cache_lookups_total` - Cache lookups by layer and outcome (hit, miss). Layers: `secret`
//!   (name cached), `mapping` (stage mapping fresh), `stage` (stage mapped to a version), `version`
//!   (payload fresh)
//! - `secrets_cache_evictions_total` - LRU evictions by layer (secret, version)
//! - `secrets_cache_backend_calls_total` - Backend calls by operation (describe, fetch)
//! - `secrets_cache_backend_call_duration_seconds` - Duration of backend calls by operation
//! - `secrets_cache_backend_errors_total` - Failed backend calls by operation
//! - `secrets_cache_secrets_cached` - Current number of secret names in the cache

use prometheus::{HistogramVec, IntCounterVec, IntGauge, Registry};
use std::sync::LazyLock;

pub(crate) static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

static LOOKUPS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "secrets_cache_lookups_total",
            "Total number of cache lookups by layer and outcome",
        ),
        &["layer", "outcome"],
    )
    .expect("Failed to create LOOKUPS_TOTAL metric - this should never happen")
});

static EVICTIONS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "secrets_cache_evictions_total",
            "Total number of LRU evictions by layer",
        ),
        &["layer"],
    )
    .expect("Failed to create EVICTIONS_TOTAL metric - this should never happen")
});

static BACKEND_CALLS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "secrets_cache_backend_calls_total",
            "Total number of secrets backend calls by operation",
        ),
        &["operation"],
    )
    .expect("Failed to create BACKEND_CALLS_TOTAL metric - this should never happen")
});

static BACKEND_CALL_DURATION: LazyLock<HistogramVec> = LazyLock::new(|| {
    HistogramVec::new(
        prometheus::HistogramOpts::new(
            "secrets_cache_backend_call_duration_seconds",
            "Duration of secrets backend calls in seconds by operation",
        )
        .buckets(vec![0.01, 0.05, 0.1, 0.5, 1.0, 2.0, 5.0]),
        &["operation"],
    )
    .expect("Failed to create BACKEND_CALL_DURATION metric - this should never happen")
});

static BACKEND_ERRORS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "secrets_cache_backend_errors_total",
            "Total number of failed secrets backend calls by operation",
        ),
        &["operation"],
    )
    .expect("Failed to create BACKEND_ERRORS_TOTAL metric - this should never happen")
});

static SECRETS_CACHED: LazyLock<IntGauge> = LazyLock::new(|| {
    IntGauge::new(
        "secrets_cache_secrets_cached",
        "Current number of secret names held by the cache",
    )
    .expect("Failed to create SECRETS_CACHED metric - this should never happen")
});

/// Register all cache metrics with the crate registry
///
/// Safe to call more than once; collectors that are already registered are skipped.
///
/// # Errors
///
/// Returns an error if a collector fails to register for any other reason.
pub fn register_metrics() -> prometheus::Result<()> {
    register(Box::new(LOOKUPS_TOTAL.clone()))?;
    register(Box::new(EVICTIONS_TOTAL.clone()))?;
    register(Box::new(BACKEND_CALLS_TOTAL.clone()))?;
    register(Box::new(BACKEND_CALL_DURATION.clone()))?;
    register(Box::new(BACKEND_ERRORS_TOTAL.clone()))?;
    register(Box::new(SECRETS_CACHED.clone()))?;
    Ok(())
}

fn register(collector: Box<dyn prometheus::core::Collector>) -> prometheus::Result<()> {
    match REGISTRY.register(collector) {
        Ok(()) | Err(prometheus::Error::AlreadyReg) => Ok(()),
        Err(e) => Err(e),
    }
}

/// Gather all registered metric families
pub fn gather() -> Vec<prometheus::proto::MetricFamily> {
    REGISTRY.gather()
}

/// Record a cache lookup at one layer
pub fn record_lookup(layer: &str, hit: bool) {
    let outcome = if hit { "hit" } else { "miss" };
    LOOKUPS_TOTAL.with_label_values(&[layer, outcome]).inc();
}

#[cfg(test)]
pub(crate) fn lookup_total(layer: &str, outcome: &str) -> u64 {
    LOOKUPS_TOTAL.with_label_values(&[layer, outcome]).get()
}

pub fn increment_evictions(layer: &str) {
    EVICTIONS_TOTAL.with_label_values(&[layer]).inc();
}

/// Record a completed backend call
///
/// `failed` should be false for "not found" answers; those are expected outcomes.
pub fn record_backend_call(operation: &str, duration: f64, failed: bool) {
    BACKEND_CALLS_TOTAL.with_label_values(&[operation]).inc();
    BACKEND_CALL_DURATION
        .with_label_values(&[operation])
        .observe(duration);
    if failed {
        BACKEND_ERRORS_TOTAL.with_label_values(&[operation]).inc();
    }
}

pub fn set_secrets_cached(count: usize) {
    SECRETS_CACHED.set(i64::try_from(count).unwrap_or(i64::MAX));
}
