//! TTL cache with least-recently-accessed eviction.
//!
//! An entry is visible to `get` only while `now < expires_at`; a TTL too
//! large to represent as an `Instant` never expires. Expired
//! entries are removed on the lookup that finds them. The entry count never
//! exceeds `max_entries`: inserting a new key into a full store first evicts
//! the entry accessed least recently.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use tracing::debug;

use warden_contracts::config::CacheSettings;

struct CacheEntry<V> {
    value: V,
    /// `None` when `now + ttl` overflows.
    expires_at: Option<Instant>,
    /// Monotonic access stamp; the smallest is the least recently used.
    access_seq: u64,
}

struct CacheState<V> {
    entries: HashMap<String, CacheEntry<V>>,
    next_seq: u64,
}

impl<V> CacheState<V> {
    fn tick(&mut self) -> u64 {
        self.next_seq += 1;
        self.next_seq
    }
}

/// Thread-safe key-value store with per-entry expiry.
///
/// Every mutation (lookup-and-evict, evict-and-insert) runs under a single
/// lock, so concurrent callers on the same key observe them atomically.
pub struct CacheStore<V = serde_json::Value> {
    state: Mutex<CacheState<V>>,
    max_entries: usize,
    default_ttl: Duration,
    enabled: bool,
}

impl<V: Clone> CacheStore<V> {
    pub fn new(max_entries: usize, default_ttl: Duration) -> Self {
        Self {
            state: Mutex::new(CacheState {
                entries: HashMap::new(),
                next_seq: 0,
            }),
            max_entries,
            default_ttl,
            enabled: true,
        }
    }

    pub fn from_settings(settings: &CacheSettings) -> Self {
        Self::new(settings.max_entries, settings.default_ttl())
    }

    /// A store where `get` always misses and `set` stores nothing.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::new(0, Duration::ZERO)
        }
    }

    /// Set whether the store is active. A disabled store never errors.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn lock(&self) -> MutexGuard<'_, CacheState<V>> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Return the live value for `key`, refreshing its access time.
    pub fn get(&self, key: &str) -> Option<V> {
        if !self.enabled {
            return None;
        }

        let now = Instant::now();
        let mut state = self.lock();
        let seq = state.tick();

        match state.entries.get_mut(key) {
            Some(entry) if entry.expires_at.map_or(true, |at| now < at) => {
                entry.access_seq = seq;
                debug!(key, "cache hit");
                Some(entry.value.clone())
            }
            Some(_) => {
                state.entries.remove(key);
                debug!(key, "cache entry expired");
                None
            }
            None => {
                debug!(key, "cache miss");
                None
            }
        }
    }

    /// Store `value` under `key` for `ttl` (or the default TTL).
    ///
    /// Overwriting an existing key replaces value, expiry and access time
    /// together and never evicts another entry.
    pub fn set(&self, key: impl Into<String>, value: V, ttl: Option<Duration>) {
        if !self.enabled || self.max_entries == 0 {
            return;
        }

        let key = key.into();
        let now = Instant::now();
        let ttl = ttl.unwrap_or(self.default_ttl);
        let mut state = self.lock();

        if !state.entries.contains_key(&key) && state.entries.len() >= self.max_entries {
            let oldest = state
                .entries
                .iter()
                .min_by_key(|(_, entry)| entry.access_seq)
                .map(|(k, _)| k.clone());
            if let Some(oldest) = oldest {
                state.entries.remove(&oldest);
                debug!(key = %oldest, "evicted least recently accessed cache entry");
            }
        }

        let seq = state.tick();
        state.entries.insert(
            key,
            CacheEntry {
                value,
                expires_at: now.checked_add(ttl),
                access_seq: seq,
            },
        );
    }

    /// Remove one entry. Returns true if it was present.
    pub fn invalidate(&self, key: &str) -> bool {
        self.lock().entries.remove(key).is_some()
    }

    pub fn clear(&self) {
        self.lock().entries.clear();
        debug!("cache cleared");
    }

    /// Number of stored entries, including ones that expired but have not
    /// been looked up since.
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
