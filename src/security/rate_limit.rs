//! Per-client token bucket rate limiting.
//!
//! # Responsibilities
//! - Admit or reject each request by client address
//! - Create buckets lazily, at full burst capacity
//! - Evict buckets idle longer than the retention window (sweeper task)
//!
//! # Design Decisions
//! - One coarse mutex guards the whole map and every bucket in it; admit
//!   and sweep are both O(1) per bucket under that lock
//! - Timestamps use `tokio::time::Instant` so paused-clock tests drive refill
//!   and eviction deterministically

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{self, Instant};

use crate::config::LimiterConfig;
use crate::observability::metrics;

/// A simple token bucket rate limiter.
#[derive(Debug)]
struct TokenBucket {
    tokens: f64,
    last_update: Instant,
}

impl TokenBucket {
    fn new(capacity: f64, now: Instant) -> Self {
        Self {
            tokens: capacity,
            last_update: now,
        }
    }

    fn try_acquire(&mut self, now: Instant, capacity: f64, refill_rate: f64) -> bool {
        let elapsed = now.duration_since(self.last_update).as_secs_f64();

        // Refill tokens
        self.tokens = (self.tokens + elapsed * refill_rate).min(capacity);
        self.last_update = now;

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

/// Limiter state for one client address.
#[derive(Debug)]
struct ClientBucket {
    bucket: TokenBucket,
    last_seen: Instant,
}

/// Outcome of an admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Admitted,
    Rejected,
}

/// Registry of client buckets shared by every request and the sweeper.
#[derive(Debug)]
pub struct RateLimiterRegistry {
    clients: Mutex<HashMap<String, ClientBucket>>,
    enabled: bool,
    refill_rate: f64,
    burst: f64,
    sweep_interval: Duration,
    retention: Duration,
}

impl RateLimiterRegistry {
    pub fn new(config: &LimiterConfig) -> Self {
        Self {
            clients: Mutex::new(HashMap::new()),
            enabled: config.enabled,
            refill_rate: config.requests_per_second,
            burst: f64::from(config.burst),
            sweep_interval: config.sweep_interval(),
            retention: config.retention(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Consume one token from `client`'s bucket.
    ///
    /// When the limiter is disabled the map is never touched.
    pub fn admit(&self, client: &str) -> Admission {
        if !self.enabled {
            return Admission::Admitted;
        }

        let now = Instant::now();
        let mut clients = self.lock();
        let tracked = clients.len();
        let entry = match clients.entry(client.to_string()) {
            Entry::Occupied(occupied) => occupied.into_mut(),
            Entry::Vacant(vacant) => {
                metrics::record_tracked_clients(tracked + 1);
                vacant.insert(ClientBucket {
                    bucket: TokenBucket::new(self.burst, now),
                    last_seen: now,
                })
            }
        };
        entry.last_seen = now;

        if entry.bucket.try_acquire(now, self.burst, self.refill_rate) {
            Admission::Admitted
        } else {
            Admission::Rejected
        }
    }

    /// Evict every bucket idle for longer than the retention window.
    ///
    /// Returns the number of evicted buckets.
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let mut clients = self.lock();
        let before = clients.len();
        clients.retain(|_, client| now.duration_since(client.last_seen) <= self.retention);
        let evicted = before - clients.len();
        metrics::record_tracked_clients(clients.len());
        evicted
    }

    /// Number of clients currently holding a bucket.
    pub fn tracked_clients(&self) -> usize {
        self.lock().len()
    }

    /// Start the perpetual sweep loop on the current runtime.
    ///
    /// The task holds its own reference to the registry and never exits on
    /// its own.
    pub fn spawn_sweeper(self: &Arc<Self>) -> JoinHandle<()> {
        let registry = Arc::clone(self);
        tokio::spawn(async move {
            tracing::info!(
                interval_secs = registry.sweep_interval.as_secs(),
                retention_secs = registry.retention.as_secs(),
                "Rate limiter sweeper starting"
            );

            let mut ticker = time::interval_at(
                Instant::now() + registry.sweep_interval,
                registry.sweep_interval,
            );
            loop {
                ticker.tick().await;
                let evicted = registry.sweep();
                if evicted > 0 {
                    tracing::debug!(evicted, "Evicted idle rate limiter buckets");
                }
            }
        })
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, ClientBucket>> {
        // Buckets are plain counters, so a poisoned map is still usable.
        self.clients.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
