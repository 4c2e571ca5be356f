//! Per-client rate limiting for hrgate.
//!
//! Every client key gets its own token bucket, created on first sight and
//! evicted by a background sweeper once the client has been idle long enough.
//! All buckets share one process-wide quota: a sustained refill rate and a
//! burst capacity.

#![deny(missing_docs)]

mod error;
mod limiter_clock;
mod quota;
mod registry;
mod sweeper;

pub use error::RateLimitError;
pub use registry::RateLimitRegistry;
