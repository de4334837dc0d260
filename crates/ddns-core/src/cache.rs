// # Update Cache
//
// Short-lived memo of the last value written per (domain, record type).
//
// ## Purpose
//
// Clients typically call the update endpoint every minute or two. Without a
// cache every call would list the whole zone at the provider. With it, the
// provider is consulted at most once per TTL for an unchanged address, so
// record TTLs of ~5 minutes stay practical.
//
// ## Crash Behavior
//
// - All entries are lost on restart
// - The first request per record after a restart syncs against the provider
// - The provider client only writes when its value differs, so no bad data

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::config::RecordType;

/// Default lifetime of a cache entry (10 minutes)
pub const DEFAULT_CACHE_TTL_SECS: i64 = 10 * 60;

/// A cached value and when it stops counting
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    /// The value last written upstream
    pub value: String,
    /// When this entry expires
    pub expires_at: DateTime<Utc>,
}

impl CacheEntry {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

/// In-memory TTL cache of upstream writes
///
/// A single mutex guards every `get`/`set`. It does not serialize the
/// read-check-then-write sequence of a caller: two concurrent requests for
/// the same record may both miss and both write the same value.
///
/// # Example
///
/// ```rust
/// use ddns_core::cache::UpdateCache;
/// use ddns_core::config::RecordType;
///
/// #[tokio::main]
/// async fn main() {
///     let cache = UpdateCache::new();
///     cache.set("home.example.com", RecordType::A, "1.2.3.4").await;
///
///     let value = cache.get("home.example.com", RecordType::A).await;
///     assert_eq!(value.as_deref(), Some("1.2.3.4"));
/// }
/// ```
#[derive(Debug, Clone)]
pub struct UpdateCache {
    inner: Arc<Mutex<HashMap<String, CacheEntry>>>,
    ttl: Duration,
}

impl UpdateCache {
    /// Create an empty cache with the default 10-minute TTL
    pub fn new() -> Self {
        Self::with_ttl(Duration::seconds(DEFAULT_CACHE_TTL_SECS))
    }

    /// Create an empty cache with a custom TTL
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            inner: Arc::new(Mutex::new(HashMap::new())),
            ttl,
        }
    }

    /// Entry lifetime
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Get the unexpired value for a domain/record type pair
    ///
    /// An expired entry is evicted and reported as absent.
    pub async fn get(&self, domain: &str, record_type: RecordType) -> Option<String> {
        let key = cache_key(domain, record_type);
        let mut guard = self.inner.lock().await;

        match guard.get(&key) {
            Some(entry) if entry.is_expired(Utc::now()) => {
                guard.remove(&key);
                None
            }
            Some(entry) => Some(entry.value.clone()),
            None => None,
        }
    }

    /// Store a value with a fresh expiry, overwriting any previous entry
    pub async fn set(&self, domain: &str, record_type: RecordType, value: impl Into<String>) {
        let entry = CacheEntry {
            value: value.into(),
            expires_at: Utc::now() + self.ttl,
        };
        let mut guard = self.inner.lock().await;
        guard.insert(cache_key(domain, record_type), entry);
    }

    /// Number of entries held, expired ones included
    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }

    /// Whether the cache holds no entries
    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.is_empty()
    }
}

impl Default for UpdateCache {
    fn default() -> Self {
        Self::new()
    }
}

fn cache_key(domain: &str, record_type: RecordType) -> String {
    format!("{}:{}", domain, record_type)
}
