//! # Cache
//!
//! Two-level read-through cache:
//!
//! - [`SecretCacheStore`]: LRU of secret names, bounded by `max_cache_size`
//! - `SecretEntry`: stage-label → version-id mapping on a jittered TTL, plus a
//!   10-slot LRU of versions
//! - `VersionEntry`: payload of one immutable version on its own jittered TTL
//!
//! Staleness is checked inline on each lookup; there are no background tasks.
//! Two concurrent lookups that both find an entry stale may both call the
//! backend.

mod bounded;
mod refresh;
mod secret;
mod store;
mod version;

pub use bounded::{Admission, BoundedCache};
pub use store::SecretCacheStore;
