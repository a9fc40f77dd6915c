//! Cache facade used to memoize the module collection and aggregates.
//!
//! Values are JSON strings so the backend never needs to know the registry's
//! types. The default backend is an in-process Moka cache with per-entry TTL.

use std::time::{Duration, Instant};

use moka::Expiry;
use moka::sync::Cache as MokaInner;
use tracing::debug;

/// Default maximum number of entries in the in-process cache.
pub const DEFAULT_CAPACITY: u64 = 10_000;

/// Key-value store with TTL.
///
/// Backends swallow their own transport errors (logging them) and behave as
/// a miss; the registry always falls back to recomputing.
pub trait Cache: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;

    fn put(&self, key: &str, value: String, ttl: Duration);

    fn forget(&self, key: &str);
}

/// Builds the registry's cache keys from a prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheKeys {
    prefix: String,
}

impl CacheKeys {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// `<prefix>.modules`
    pub fn modules(&self) -> String {
        format!("{}.modules", self.prefix)
    }

    /// `<prefix>.permissions`
    pub fn permissions(&self) -> String {
        format!("{}.permissions", self.prefix)
    }

    /// `<prefix>.navigation.<menu>`
    pub fn navigation(&self, menu: &str) -> String {
        format!("{}.navigation.{menu}", self.prefix)
    }

    /// `<prefix>.navigation_menus`, the menus with a cached navigation entry.
    pub fn navigation_menus(&self) -> String {
        format!("{}.navigation_menus", self.prefix)
    }
}

#[derive(Clone)]
struct CachedValue {
    payload: String,
    ttl: Duration,
}

/// Expires each entry after the TTL it was stored with.
struct PerEntryTtl;

impl Expiry<String, CachedValue> for PerEntryTtl {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &CachedValue,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &CachedValue,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// In-process cache backed by Moka.
#[derive(Clone)]
pub struct MokaCache {
    inner: MokaInner<String, CachedValue>,
}

impl MokaCache {
    /// Create a cache holding at most `max_capacity` entries.
    pub fn new(max_capacity: u64) -> Self {
        let inner = MokaInner::builder()
            .max_capacity(max_capacity)
            .expire_after(PerEntryTtl)
            .build();

        Self { inner }
    }

    /// Get cache statistics (for monitoring).
    pub fn stats(&self) -> CacheStats {
        self.inner.run_pending_tasks();
        CacheStats {
            entry_count: self.inner.entry_count(),
        }
    }
}

impl Default for MokaCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl Cache for MokaCache {
    fn get(&self, key: &str) -> Option<String> {
        let hit = self.inner.get(key).map(|v| v.payload);
        debug!(key = %key, hit = hit.is_some(), "cache lookup");
        hit
    }

    fn put(&self, key: &str, value: String, ttl: Duration) {
        self.inner.insert(
            key.to_string(),
            CachedValue {
                payload: value,
                ttl,
            },
        );
        debug!(key = %key, ttl_secs = ttl.as_secs(), "cache set");
    }

    fn forget(&self, key: &str) {
        self.inner.invalidate(key);
        debug!(key = %key, "cache invalidated");
    }
}

impl std::fmt::Debug for MokaCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MokaCache").finish()
    }
}

/// Cache statistics.
#[derive(Debug, Clone)]
pub struct CacheStats {
    /// Number of live entries.
    pub entry_count: u64,
}
