pub mod pool;
pub mod scheduler;

use std::sync::Arc;
use tracing::debug;

use crate::analytics::stats::LimiterStats;
use crate::config::LimiterConfig;
use crate::error::Result;
use crate::utils::time::{elapsed_ms, now_instant};

pub use pool::{Permit, PermitPool};
pub use scheduler::ReplenishScheduler;

/// Fixed-window limiter: at most `capacity` committed requests per `interval`.
///
/// Callers past the limit wait in arrival order instead of being rejected.
/// Must be created inside a tokio runtime, which drives the refill task.
#[derive(Debug)]
pub struct RateLimiter {
    config: LimiterConfig,
    pool: Arc<PermitPool>,
    scheduler: ReplenishScheduler,
    stats: Arc<LimiterStats>,
}

impl RateLimiter {
    pub fn new(config: LimiterConfig, stats: Arc<LimiterStats>) -> Result<Self> {
        let pool = Arc::new(PermitPool::new(config.capacity()));
        let scheduler = ReplenishScheduler::start(pool.clone(), config.interval(), stats.clone())?;

        Ok(Self {
            config,
            pool,
            scheduler,
            stats,
        })
    }

    pub async fn acquire(&self) -> Result<Permit<'_>> {
        let started = now_instant();
        match self.pool.acquire().await {
            Ok(permit) => {
                let waited = elapsed_ms(started);
                self.stats.update_permit_wait(waited);
                debug!("Permit acquired after {}ms, {} left", waited, self.pool.available());
                Ok(permit)
            }
            Err(e) => {
                self.stats.inc_cancelled();
                Err(e)
            }
        }
    }

    pub fn available(&self) -> usize {
        self.pool.available()
    }

    pub fn config(&self) -> LimiterConfig {
        self.config
    }

    pub fn pool(&self) -> &Arc<PermitPool> {
        &self.pool
    }

    pub fn is_running(&self) -> bool {
        self.scheduler.is_running() && !self.pool.is_closed()
    }

    /// Closes the pool, failing current waiters, and stops replenishment.
    pub async fn shutdown(&self) {
        self.scheduler.shutdown().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_cancels_waiters() {
        let stats = Arc::new(LimiterStats::new());
        let config = LimiterConfig::new(1, Duration::from_millis(100)).unwrap();
        let limiter = Arc::new(RateLimiter::new(config, stats.clone()).unwrap());
        limiter.acquire().await.unwrap().commit();

        let waiter = {
            let limiter = limiter.clone();
            tokio::spawn(async move { limiter.acquire().await.map(|p| p.commit()) })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;

        limiter.shutdown().await;
        assert!(waiter.await.unwrap().unwrap_err().is_cancellation());
        assert!(!limiter.is_running());
        assert_eq!(stats.cancelled.load(Ordering::Relaxed), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_permit_wait_follows_runtime_clock() {
        let stats = Arc::new(LimiterStats::new());
        let config = LimiterConfig::new(1, Duration::from_millis(100)).unwrap();
        let limiter = RateLimiter::new(config, stats.clone()).unwrap();

        limiter.acquire().await.unwrap().commit();
        assert_eq!(stats.last_permit_wait_ms.load(Ordering::Relaxed), 0);

        // Paused time jumps straight to the refill.
        limiter.acquire().await.unwrap().commit();
        assert_eq!(stats.last_permit_wait_ms.load(Ordering::Relaxed), 100);
    }
}
