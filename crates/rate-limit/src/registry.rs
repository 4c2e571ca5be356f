use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex, MutexGuard, PoisonError,
        atomic::{AtomicU32, Ordering},
    },
    time::Duration,
};

use chrono::{DateTime, Utc};
use clock::Clock;
use config::RateLimitConfig;
use governor::{
    RateLimiter,
    middleware::NoOpMiddleware,
    nanos::Nanos,
    state::{InMemoryState, NotKeyed},
};

use crate::{
    error::RateLimitError,
    limiter_clock::LimiterClock,
    quota::{BucketQuota, quota_from_config},
};

type ClientLimiter = RateLimiter<NotKeyed, InMemoryState, LimiterClock, NoOpMiddleware<Nanos>>;

/// One client's token bucket.
enum Bucket {
    Refilling(ClientLimiter),
    /// Tokens left in a bucket that never refills.
    Fixed(AtomicU32),
}

impl Bucket {
    fn new(quota: BucketQuota, clock: &Arc<dyn Clock>) -> Self {
        match quota {
            BucketQuota::Refilling(quota) => {
                Bucket::Refilling(RateLimiter::direct_with_clock(quota, LimiterClock::new(clock.clone())))
            }
            BucketQuota::NeverRefills(burst) => Bucket::Fixed(AtomicU32::new(burst.get())),
        }
    }

    /// Takes one token, or returns how long until one is available.
    fn take(&self, now: DateTime<Utc>) -> Result<(), Duration> {
        match self {
            Bucket::Refilling(limiter) => limiter
                .check()
                .map_err(|not_until| not_until.wait_time_from(LimiterClock::instant(now))),
            Bucket::Fixed(remaining) => remaining
                .fetch_update(Ordering::AcqRel, Ordering::Acquire, |tokens| tokens.checked_sub(1))
                .map(|_| ())
                .map_err(|_| Duration::MAX),
        }
    }
}

struct ClientEntry {
    bucket: Arc<Bucket>,
    last_seen: DateTime<Utc>,
}

/// Token buckets keyed by client, with idle eviction.
///
/// The key to bucket map sits behind a single mutex that is held only to look up,
/// create or evict entries. Token accounting happens on the bucket itself, which
/// is lock-free, after the mutex has been released.
pub struct RateLimitRegistry {
    quota: BucketQuota,
    idle_timeout: Duration,
    pub(crate) sweep_interval: Duration,
    clock: Arc<dyn Clock>,
    entries: Mutex<HashMap<String, ClientEntry>>,
}

impl RateLimitRegistry {
    /// Creates an empty registry using the rate, burst and eviction settings from `config`.
    pub fn new(config: &RateLimitConfig, clock: Arc<dyn Clock>) -> Result<Self, RateLimitError> {
        let quota = quota_from_config(config.rate, config.burst)?;

        if config.sweep_interval.is_zero() {
            return Err(RateLimitError::InvalidQuota("sweep interval must be greater than zero".into()));
        }

        Ok(Self {
            quota,
            idle_timeout: config.idle_timeout,
            sweep_interval: config.sweep_interval,
            clock,
            entries: Mutex::new(HashMap::new()),
        })
    }

    /// Takes one token from the client's bucket, creating the bucket on first use.
    ///
    /// Never waits: an empty bucket is an immediate [`RateLimitError::Exceeded`].
    pub fn admit(&self, client: &str) -> Result<(), RateLimitError> {
        let now = self.clock.now();

        let bucket = {
            let mut entries = self.lock();

            match entries.get_mut(client) {
                Some(entry) => {
                    entry.last_seen = now;
                    entry.bucket.clone()
                }
                None => {
                    log::debug!("Creating rate limit bucket for client '{client}'");

                    let bucket = Arc::new(Bucket::new(self.quota, &self.clock));

                    entries.insert(
                        client.to_owned(),
                        ClientEntry {
                            bucket: bucket.clone(),
                            last_seen: now,
                        },
                    );

                    bucket
                }
            }
        };

        match bucket.take(now) {
            Ok(()) => Ok(()),
            Err(retry_after) => {
                log::debug!("Request blocked for client '{client}' - rate limit exceeded, retry after {retry_after:?}");

                Err(RateLimitError::Exceeded {
                    client: client.to_owned(),
                    retry_after,
                })
            }
        }
    }

    /// Evicts every client not seen for longer than the idle timeout.
    ///
    /// Returns the number of evicted clients.
    pub fn sweep(&self) -> usize {
        let now = self.clock.now();
        let mut entries = self.lock();
        let before = entries.len();

        entries.retain(|_, entry| {
            // A last_seen in the future (clock moved backwards) counts as fresh.
            let idle = now.signed_duration_since(entry.last_seen).to_std().unwrap_or_default();
            idle <= self.idle_timeout
        });

        before - entries.len()
    }

    /// Number of clients currently tracked.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether no client is tracked.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Whether the client currently has a bucket.
    pub fn contains(&self, client: &str) -> bool {
        self.lock().contains_key(client)
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, ClientEntry>> {
        // The map is consistent after every statement, so a panic elsewhere cannot corrupt it.
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
