//! In-memory TTL cache
//!
//! Memoizes expensive lookups (source calls, reconciled conditions, risk
//! results) keyed by semantic request identity. One fixed TTL applies to
//! every entry; staleness is decided lazily at read time and expired entries
//! are simply treated as absent until the next put overwrites them. State is
//! process-local and does not survive restart.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Time-to-live applied uniformly to all entries.
pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

struct StoredEntry {
    payload: serde_json::Value,
    created_at: Instant,
}

/// Coarsely-locked TTL map. The lock is held only for the map operation
/// itself; serialization happens outside it.
pub struct TtlCache {
    ttl: Duration,
    entries: Mutex<HashMap<String, StoredEntry>>,
}

impl TtlCache {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Retrieves a value if it exists and has not expired.
    /// Returns `None` for misses, expired entries, and payloads that no
    /// longer deserialize to the requested type.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let payload = {
            let entries = self.lock();
            let entry = entries.get(key)?;
            if entry.created_at.elapsed() >= self.ttl {
                debug!(key, "cache entry expired");
                return None;
            }
            entry.payload.clone()
        };

        match serde_json::from_value(payload) {
            Ok(value) => {
                debug!(key, "cache hit");
                Some(value)
            }
            Err(e) => {
                warn!(key, error = %e, "cache entry failed to deserialize");
                None
            }
        }
    }

    /// Stores a value under `key`, replacing any previous entry.
    pub fn put<T: Serialize>(&self, key: &str, value: &T) {
        match serde_json::to_value(value) {
            Ok(payload) => {
                let entry = StoredEntry {
                    payload,
                    created_at: Instant::now(),
                };
                self.lock().insert(key.to_string(), entry);
                debug!(key, "cache store");
            }
            Err(e) => warn!(key, error = %e, "value could not be cached"),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, StoredEntry>> {
        // A poisoned lock only means another thread panicked mid-insert; the
        // map itself is still usable.
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for TtlCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

/// Builds a cache key from an operation name and coordinates, quantized to
/// micro-degrees so float formatting noise cannot split identical requests.
#[must_use]
pub fn coord_key(op: &str, lat: f64, lon: f64) -> String {
    let lat_micro = (lat * 1_000_000.0).round() as i64;
    let lon_micro = (lon * 1_000_000.0).round() as i64;
    format!("{op}:{lat_micro}:{lon_micro}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_before_ttl_returns_value() {
        let cache = TtlCache::new(Duration::from_secs(60));
        cache.put("k", &42_u32);
        assert_eq!(cache.get::<u32>("k"), Some(42));
    }

    #[test]
    fn test_get_after_ttl_is_a_miss() {
        let cache = TtlCache::new(Duration::from_millis(20));
        cache.put("k", &"hello".to_string());
        std::thread::sleep(Duration::from_millis(40));
        assert_eq!(cache.get::<String>("k"), None);
    }

    #[test]
    fn test_put_overwrites_previous_entry() {
        let cache = TtlCache::new(Duration::from_secs(60));
        cache.put("k", &1_u32);
        cache.put("k", &2_u32);
        assert_eq!(cache.get::<u32>("k"), Some(2));
    }

    #[test]
    fn test_missing_key_is_a_miss() {
        let cache = TtlCache::default();
        assert_eq!(cache.get::<u32>("absent"), None);
    }

    #[test]
    fn test_coord_key_quantizes_to_micro_degrees() {
        assert_eq!(
            coord_key("best-aqi", 40.712_8, -74.006),
            "best-aqi:40712800:-74006000"
        );
        // Identical coordinates with float noise map to the same key.
        assert_eq!(
            coord_key("best-aqi", 40.712_800_000_1, -74.006),
            coord_key("best-aqi", 40.712_8, -74.006)
        );
    }
}
