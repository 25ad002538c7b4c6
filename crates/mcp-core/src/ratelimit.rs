// crates/mcp-core/src/ratelimit.rs
// ============================================================================
// Module: Rate Limiter
// Description: Per-client sliding-window request rate limiting.
// ============================================================================

use std::collections::HashMap;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;
use std::time::Instant;

/// Rate limiter configuration.
///
/// Setting `capacity`, `max_requests`, or `window_seconds` to `0` disables
/// rate limiting entirely: every request is allowed and no bookkeeping is
/// performed.
#[derive(Debug, Clone, Copy)]
pub struct RateLimitConfig {
    /// Maximum distinct client keys tracked at once.
    pub capacity: usize,
    /// Width of the sliding window, in seconds.
    pub window_seconds: u64,
    /// Maximum allowed requests per client within the window.
    pub max_requests: usize,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            capacity: 10_000,
            window_seconds: 60,
            max_requests: 120,
        }
    }
}

impl RateLimitConfig {
    fn disabled(&self) -> bool {
        self.capacity == 0 || self.max_requests == 0 || self.window_seconds == 0
    }
}

/// The outcome of a [`RateLimiter::check`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitDecision {
    /// The request is within the client's window budget.
    Allowed,
    /// The client has exhausted its window budget.
    Denied,
}

struct Bucket {
    timestamps: VecDeque<Instant>,
    last_used: Instant,
}

struct State {
    buckets: HashMap<String, Bucket>,
}

/// A sliding-window rate limiter keyed by an opaque client identifier.
///
/// Each client key owns a ring of request timestamps. `check` prunes entries
/// older than `window_seconds`, then allows the request only if fewer than
/// `max_requests` remain in the window, recording the new timestamp on an
/// allow. When the number of tracked client keys would exceed `capacity`,
/// the least-recently-used bucket is evicted to make room.
pub struct RateLimiter {
    config: RateLimitConfig,
    state: Mutex<State>,
}

impl RateLimiter {
    /// Builds a new rate limiter from `config`.
    #[must_use]
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            state: Mutex::new(State {
                buckets: HashMap::new(),
            }),
        }
    }

    /// Checks whether `client_key` may make another request right now,
    /// recording the request if it is allowed.
    #[must_use]
    pub fn check(&self, client_key: &str) -> RateLimitDecision {
        if self.config.disabled() {
            return RateLimitDecision::Allowed;
        }
        let now = Instant::now();
        let window = Duration::from_secs(self.config.window_seconds);
        let mut state = self.state.lock().unwrap_or_else(|poison| poison.into_inner());

        if !state.buckets.contains_key(client_key) && state.buckets.len() >= self.config.capacity {
            evict_lru(&mut state.buckets);
        }

        let bucket = state.buckets.entry(client_key.to_string()).or_insert_with(|| Bucket {
            timestamps: VecDeque::new(),
            last_used: now,
        });
        bucket.last_used = now;
        while let Some(&front) = bucket.timestamps.front() {
            if now.duration_since(front) >= window {
                bucket.timestamps.pop_front();
            } else {
                break;
            }
        }
        if bucket.timestamps.len() >= self.config.max_requests {
            return RateLimitDecision::Denied;
        }
        bucket.timestamps.push_back(now);
        RateLimitDecision::Allowed
    }

    /// Returns the number of distinct client keys currently tracked.
    #[must_use]
    pub fn tracked_clients(&self) -> usize {
        self.state.lock().unwrap_or_else(|poison| poison.into_inner()).buckets.len()
    }
}

fn evict_lru(buckets: &mut HashMap<String, Bucket>) {
    if let Some(key) = buckets
        .iter()
        .min_by_key(|(_, bucket)| bucket.last_used)
        .map(|(key, _)| key.clone())
    {
        buckets.remove(&key);
    }
}
