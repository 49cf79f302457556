//! # Constants
//!
//! Shared constants used throughout the cache.
//!
//! These values represent reasonable defaults and can be overridden via
//! configuration or environment variables where applicable.

/// Default maximum number of secret names held by the top-level cache
pub const DEFAULT_MAX_CACHE_SIZE: usize = 128;

/// Default refresh interval for stage mappings and version payloads (seconds)
/// Refreshes land at a random point in the back half of this window
pub const DEFAULT_SECRET_REFRESH_INTERVAL_SECS: u64 = 3600;

/// Stage label used when a lookup names neither a version id nor a stage
pub const DEFAULT_VERSION_STAGE: &str = "AWSCURRENT";

/// Stage label AWS Secrets Manager moves to the prior version on rotation
pub const PREVIOUS_VERSION_STAGE: &str = "AWSPREVIOUS";

/// Number of versions cached per secret
/// Large enough that current, previous and pending never evict each other
pub const VERSION_CACHE_CAPACITY: usize = 10;

/// Default HTTP server port for cached secret lookups, metrics and probes
pub const DEFAULT_SERVER_PORT: u16 = 2773;

/// Error code reported when a secret, stage or version cannot be resolved
pub const RESOURCE_NOT_FOUND_CODE: &str = "ResourceNotFoundException";

/// Upper bound accepted for `max_cache_size`
/// The LRU table is allocated up front at this size
pub const MAX_CACHE_SIZE: usize = 100_000;

/// Upper bound accepted for the refresh interval (30 days)
pub const MAX_SECRET_REFRESH_INTERVAL_SECS: u64 = 30 * 24 * 60 * 60;
