//! Rate limiting configuration structures.

use std::time::Duration;

use duration_str::deserialize_duration;
use serde::Deserialize;

/// Per-client token bucket settings, shared by every client key.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RateLimitConfig {
    /// Whether rate limiting is enabled.
    pub enabled: bool,
    /// Sustained refill rate in requests per second. Zero means the bucket never refills.
    pub rate: f64,
    /// Bucket capacity: how many requests a client may make back to back.
    pub burst: u32,
    /// How long a client may stay silent before its bucket is evicted.
    #[serde(deserialize_with = "deserialize_duration")]
    pub idle_timeout: Duration,
    /// How often idle buckets are swept.
    #[serde(deserialize_with = "deserialize_duration")]
    pub sweep_interval: Duration,
    /// Derive the client key from `X-Forwarded-For` / `X-Real-IP` instead of the peer address.
    /// Only enable behind a proxy that overwrites these headers.
    pub trust_forwarded_headers: bool,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            rate: 5.0,
            burst: 10,
            idle_timeout: Duration::from_secs(3 * 60),
            sweep_interval: Duration::from_secs(60),
            trust_forwarded_headers: false,
        }
    }
}
