use std::{sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use clock::Clock;
use governor::nanos::Nanos;

/// Lets governor buckets read time from an injected [`Clock`].
#[derive(Debug, Clone)]
pub(crate) struct LimiterClock(Arc<dyn Clock>);

impl LimiterClock {
    pub(crate) fn new(clock: Arc<dyn Clock>) -> Self {
        Self(clock)
    }

    /// Nanoseconds since the Unix epoch. Instants before the epoch clamp to zero.
    pub(crate) fn instant(time: DateTime<Utc>) -> Nanos {
        let nanos = time.timestamp_nanos_opt().unwrap_or(i64::MAX).max(0);

        Nanos::from(Duration::from_nanos(nanos as u64))
    }
}

impl governor::clock::Clock for LimiterClock {
    type Instant = Nanos;

    fn now(&self) -> Self::Instant {
        Self::instant(self.0.now())
    }
}
