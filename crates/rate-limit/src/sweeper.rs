use std::sync::{Arc, Weak};

use tokio::{
    task::JoinHandle,
    time::{self, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;

use crate::RateLimitRegistry;

impl RateLimitRegistry {
    /// Spawns the background task evicting idle clients every sweep interval.
    ///
    /// The task stops when `shutdown` is cancelled or the registry is dropped.
    /// Must be called from within a tokio runtime.
    pub fn spawn_sweeper(self: &Arc<Self>, shutdown: CancellationToken) -> JoinHandle<()> {
        let registry: Weak<Self> = Arc::downgrade(self);
        let period = self.sweep_interval;

        tokio::spawn(async move {
            let mut ticker = time::interval_at(time::Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            log::debug!("Rate limit sweeper started, sweeping every {period:?}");

            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = ticker.tick() => {
                        let Some(registry) = registry.upgrade() else {
                            break;
                        };

                        let evicted = registry.sweep();

                        if evicted > 0 {
                            log::debug!("Evicted {evicted} idle rate limit clients, {} remaining", registry.len());
                        }
                    }
                }
            }

            log::debug!("Rate limit sweeper stopped");
        })
    }
}
