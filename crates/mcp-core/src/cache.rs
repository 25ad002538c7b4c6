// crates/mcp-core/src/cache.rs
// ============================================================================
// Module: Content Cache
// Description: TTL + bounded, single-flight content cache keyed by URI.
// ============================================================================

use std::collections::HashMap;
use std::collections::HashSet;
use std::sync::Condvar;
use std::sync::Mutex;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::time::Duration;
use std::time::Instant;

use mcp_types::ContentItem;

/// Content cache configuration.
#[derive(Debug, Clone, Copy)]
pub struct CacheConfig {
    /// Maximum number of distinct URIs held at once.
    pub capacity: usize,
    /// Time-to-live applied to entries that don't specify their own.
    pub default_ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: 1024,
            default_ttl: Duration::from_secs(300),
        }
    }
}

/// Errors surfaced by [`ContentCache::fetch_or_insert`].
#[derive(Debug, thiserror::Error)]
pub enum CacheError<E> {
    /// The producer closure failed; the failure is never cached.
    #[error("producer failed: {0}")]
    Producer(E),
}

struct Entry {
    items: Vec<ContentItem>,
    inserted_at: Instant,
    ttl: Duration,
    last_access: Instant,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        now.duration_since(self.inserted_at) >= self.ttl
    }
}

struct State {
    entries: HashMap<String, Entry>,
    in_flight: HashSet<String>,
}

/// A TTL-bounded, capacity-bounded, single-flight cache of resource content
/// keyed by URI.
///
/// # Invariants
/// - The cache never holds more than `capacity` entries; over-capacity
///   inserts evict the least-recently-accessed entry first (I2).
/// - For a given key, at most one producer closure runs at a time; callers
///   racing on the same key all observe the single winning result or the
///   single winning error (I3).
pub struct ContentCache {
    config: CacheConfig,
    capacity: AtomicUsize,
    state: Mutex<State>,
    condvar: Condvar,
}

impl ContentCache {
    /// Builds an empty cache from `config`.
    #[must_use]
    pub fn new(config: CacheConfig) -> Self {
        Self {
            capacity: AtomicUsize::new(config.capacity),
            config,
            state: Mutex::new(State {
                entries: HashMap::new(),
                in_flight: HashSet::new(),
            }),
            condvar: Condvar::new(),
        }
    }

    /// Returns the cached content for `uri`, if present and not expired.
    /// Expired entries are evicted on lookup.
    #[must_use]
    pub fn lookup(&self, uri: &str) -> Option<Vec<ContentItem>> {
        let now = Instant::now();
        let mut state = self.state.lock().unwrap_or_else(|poison| poison.into_inner());
        if let Some(entry) = state.entries.get(uri) {
            if entry.is_expired(now) {
                state.entries.remove(uri);
                return None;
            }
        } else {
            return None;
        }
        let entry = state.entries.get_mut(uri).expect("checked present above");
        entry.last_access = now;
        Some(entry.items.clone())
    }

    /// Returns the cached content for `uri` if present and fresh; otherwise
    /// runs `producer` to populate it, ensuring only one caller actually
    /// invokes `producer` for a given key at a time. Concurrent callers for
    /// the same key block until the in-flight producer completes and then
    /// share its result.
    ///
    /// # Errors
    /// Propagates whatever `producer` returns, wrapped in
    /// [`CacheError::Producer`]. A producer failure is not cached.
    pub fn fetch_or_insert<E, F>(&self, uri: &str, ttl: Option<Duration>, producer: F) -> Result<Vec<ContentItem>, CacheError<E>>
    where
        F: FnOnce() -> Result<Vec<ContentItem>, E>,
    {
        loop {
            let now = Instant::now();
            let mut state = self.state.lock().unwrap_or_else(|poison| poison.into_inner());

            if let Some(entry) = state.entries.get(uri) {
                if !entry.is_expired(now) {
                    let entry = state.entries.get_mut(uri).expect("checked present above");
                    entry.last_access = now;
                    return Ok(entry.items.clone());
                }
                state.entries.remove(uri);
            }

            if state.in_flight.contains(uri) {
                state = self
                    .condvar
                    .wait(state)
                    .unwrap_or_else(|poison| poison.into_inner());
                drop(state);
                continue;
            }

            state.in_flight.insert(uri.to_string());
            drop(state);

            let result = producer();

            let mut state = self.state.lock().unwrap_or_else(|poison| poison.into_inner());
            state.in_flight.remove(uri);
            match result {
                Ok(items) => {
                    let capacity = self.capacity.load(Ordering::Acquire);
                    insert_locked(&mut state, capacity, uri, items.clone(), ttl.unwrap_or(self.config.default_ttl));
                    self.condvar.notify_all();
                    return Ok(items);
                }
                Err(err) => {
                    self.condvar.notify_all();
                    return Err(CacheError::Producer(err));
                }
            }
        }
    }

    /// Removes `uri` from the cache, if present.
    pub fn evict(&self, uri: &str) {
        let mut state = self.state.lock().unwrap_or_else(|poison| poison.into_inner());
        state.entries.remove(uri);
    }

    /// Removes every expired entry.
    pub fn prune_expired(&self) {
        let now = Instant::now();
        let mut state = self.state.lock().unwrap_or_else(|poison| poison.into_inner());
        state.entries.retain(|_, entry| !entry.is_expired(now));
    }

    /// Updates the capacity bound, evicting the least-recently-accessed
    /// entries immediately if `new_capacity` is smaller than the current
    /// entry count.
    pub fn resize(&self, new_capacity: usize) {
        self.capacity.store(new_capacity, Ordering::Release);
        let mut state = self.state.lock().unwrap_or_else(|poison| poison.into_inner());
        while state.entries.len() > new_capacity {
            let Some(victim) = state
                .entries
                .iter()
                .min_by_key(|(_, entry)| entry.last_access)
                .map(|(key, _)| key.clone())
            else {
                break;
            };
            state.entries.remove(&victim);
        }
    }

    /// Returns the number of entries currently held (expired or not).
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.lock().unwrap_or_else(|poison| poison.into_inner()).entries.len()
    }

    /// Returns `true` if the cache holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn insert_locked(state: &mut State, capacity: usize, uri: &str, items: Vec<ContentItem>, ttl: Duration) {
    while state.entries.len() >= capacity && !state.entries.contains_key(uri) {
        let Some(victim) = state
            .entries
            .iter()
            .min_by_key(|(_, entry)| entry.last_access)
            .map(|(key, _)| key.clone())
        else {
            break;
        };
        state.entries.remove(&victim);
    }
    let now = Instant::now();
    state.entries.insert(
        uri.to_string(),
        Entry {
            items,
            inserted_at: now,
            ttl,
            last_access: now,
        },
    );
}
