use std::num::NonZeroUsize;
use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::time::sleep;

use crate::config::Throttle;

/// Pre-fetch gate pacing requests across the whole worker pool.
#[derive(Clone)]
pub(crate) enum RateLimiter {
    Off,
    Delay(Duration),
    PerSecond(Arc<Semaphore>),
}

impl RateLimiter {
    /// Must be called within a runtime: the per-second strategy spawns
    /// its refill task.
    pub fn new(throttle: Option<Throttle>) -> Self {
        match throttle {
            None => Self::Off,
            Some(Throttle::Delay(secs)) => Self::Delay(Duration::from_secs_f32(secs)),
            Some(Throttle::PerSecond(quota)) => Self::PerSecond(Self::replenished(quota)),
        }
    }

    /// Semaphore topped back up to `quota` every second. The refill task
    /// holds a weak handle and stops once the limiter is dropped.
    fn replenished(quota: NonZeroUsize) -> Arc<Semaphore> {
        let permits = Arc::new(Semaphore::new(quota.get()));
        let weak: Weak<Semaphore> = Arc::downgrade(&permits);
        tokio::spawn(async move {
            loop {
                sleep(Duration::from_secs(1)).await;
                match weak.upgrade() {
                    Some(permits) => {
                        let missing = quota.get().saturating_sub(permits.available_permits());
                        permits.add_permits(missing);
                    }
                    None => break,
                }
            }
        });
        permits
    }

    /// Suspends until the current request may go out.
    pub async fn throttle(&self) {
        match self {
            Self::Off => {}
            Self::Delay(delay) => sleep(*delay).await,
            Self::PerSecond(permits) => {
                if let Ok(permit) = permits.acquire().await {
                    permit.forget();
                }
            }
        }
    }
}
