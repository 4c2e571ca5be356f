use std::{num::NonZeroU32, time::Duration};

use governor::Quota;

use crate::RateLimitError;

/// How every client bucket behaves once its burst is spent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BucketQuota {
    /// Governor token bucket refilling at the configured rate.
    Refilling(Quota),
    /// A rate of `0.0`: the bucket holds `burst` tokens and never gets any back.
    NeverRefills(NonZeroU32),
}

/// Creates the token bucket quota shared by every client.
///
/// # How it works
///
/// 1. **Refill period**: governor refills one token every `1 / rate` seconds.
///    A rate of 5.0 refills a token every 200ms.
///
/// 2. **Burst capacity**: the bucket holds at most `burst` tokens and starts full,
///    so a new client can make `burst` requests back to back before the refill
///    rate applies.
///
/// 3. **Zero rate**: governor has no notion of an infinite period, so a rate of `0.0`
///    skips it entirely and counts the `burst` tokens down without ever refilling.
///
/// Each admitted request consumes exactly one token.
pub(crate) fn quota_from_config(rate: f64, burst: u32) -> Result<BucketQuota, RateLimitError> {
    let burst = NonZeroU32::new(burst).ok_or_else(|| RateLimitError::InvalidQuota("burst must be at least 1".into()))?;

    if !rate.is_finite() || rate < 0.0 {
        return Err(RateLimitError::InvalidQuota(format!(
            "rate must be a finite, non-negative number, got {rate}"
        )));
    }

    if rate == 0.0 {
        log::debug!("Calculating rate limit quota: burst capacity of {burst}, never refilled");
        return Ok(BucketQuota::NeverRefills(burst));
    }

    let period = Duration::try_from_secs_f64(rate.recip())
        .map_err(|e| RateLimitError::InvalidQuota(format!("rate {rate} has no representable period: {e}")))?
        .max(Duration::from_nanos(1));

    // Governor keeps bucket state in u64 nanoseconds; `period * (burst + 1)` must fit
    // next to a Unix timestamp in nanoseconds.
    let span = period.as_nanos().saturating_mul(u128::from(burst.get()) + 1);

    if span > u128::from(u64::MAX / 2) {
        return Err(RateLimitError::InvalidQuota(format!(
            "rate {rate} with a burst of {burst} exceeds the bucket's time range, use rate = 0 for a bucket that never refills"
        )));
    }

    log::debug!("Calculating rate limit quota: {rate}/second, one token every {period:?}, burst capacity of {burst}");

    let quota = Quota::with_period(period)
        .ok_or_else(|| RateLimitError::InvalidQuota(format!("invalid refill period {period:?}")))?
        .allow_burst(burst);

    Ok(BucketQuota::Refilling(quota))
}
