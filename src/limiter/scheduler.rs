use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, info};

use crate::analytics::stats::LimiterStats;
use crate::error::{AppError, Result};
use crate::limiter::pool::PermitPool;

/// Background task that refills a [`PermitPool`] to capacity once per interval.
///
/// The task is detached on the current tokio runtime and never keeps it
/// alive. Dropping the scheduler aborts the task.
#[derive(Debug)]
pub struct ReplenishScheduler {
    pool: Arc<PermitPool>,
    shutdown_tx: broadcast::Sender<()>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl ReplenishScheduler {
    pub fn start(
        pool: Arc<PermitPool>,
        interval: Duration,
        stats: Arc<LimiterStats>,
    ) -> Result<Self> {
        let runtime = Handle::try_current().map_err(|e| {
            AppError::Init(format!("Replenish scheduler needs a tokio runtime: {}", e))
        })?;

        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let handle = runtime.spawn(run(pool.clone(), interval, stats, shutdown_rx));

        Ok(Self {
            pool,
            shutdown_tx,
            handle: Mutex::new(Some(handle)),
        })
    }

    pub fn is_running(&self) -> bool {
        self.handle
            .lock()
            .as_ref()
            .map(|h| !h.is_finished())
            .unwrap_or(false)
    }

    /// Closes the pool, stops the loop and waits for it to exit.
    /// The pool is not refilled again.
    pub async fn shutdown(&self) {
        self.pool.close();
        let _ = self.shutdown_tx.send(());
        let handle = self.handle.lock().take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }
}

impl Drop for ReplenishScheduler {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.get_mut().take() {
            handle.abort();
        }
    }
}

async fn run(
    pool: Arc<PermitPool>,
    interval: Duration,
    stats: Arc<LimiterStats>,
    mut shutdown: broadcast::Receiver<()>,
) {
    info!(
        "Replenish scheduler started: {} permits every {}ms",
        pool.capacity(),
        interval.as_millis()
    );

    loop {
        tokio::select! {
            biased;
            _ = shutdown.recv() => {
                info!("Replenish scheduler shutting down...");
                break;
            }
            _ = sleep(interval) => {
                let restored = pool.reset_to_capacity();
                stats.inc_replenishments();
                debug!("Window rolled over, restored {} permits", restored);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::Ordering;

    #[test]
    fn test_start_requires_runtime() {
        let pool = Arc::new(PermitPool::new(1));
        let result = ReplenishScheduler::start(
            pool,
            Duration::from_millis(10),
            Arc::new(LimiterStats::new()),
        );
        assert!(matches!(result, Err(AppError::Init(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_refills_each_window() {
        let pool = Arc::new(PermitPool::new(3));
        let stats = Arc::new(LimiterStats::new());
        let scheduler =
            ReplenishScheduler::start(pool.clone(), Duration::from_millis(100), stats.clone())
                .unwrap();

        pool.acquire().await.unwrap().commit();
        pool.acquire().await.unwrap().commit();
        assert_eq!(pool.available(), 1);

        sleep(Duration::from_millis(99)).await;
        assert_eq!(pool.available(), 1);

        sleep(Duration::from_millis(2)).await;
        assert_eq!(pool.available(), 3);

        // Idle windows leave the pool exactly full.
        sleep(Duration::from_millis(300)).await;
        assert_eq!(pool.available(), 3);
        assert_eq!(stats.replenishments.load(Ordering::Relaxed), 4);
        assert!(scheduler.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_refill_after_shutdown() {
        let pool = Arc::new(PermitPool::new(2));
        let scheduler = ReplenishScheduler::start(
            pool.clone(),
            Duration::from_millis(50),
            Arc::new(LimiterStats::new()),
        )
        .unwrap();

        pool.acquire().await.unwrap().commit();
        scheduler.shutdown().await;
        assert!(!scheduler.is_running());
        assert!(pool.is_closed());
        assert!(pool.acquire().await.unwrap_err().is_cancellation());
        // A tick that raced the shutdown signal cannot refill a closed pool.
        assert_eq!(pool.reset_to_capacity(), 0);

        sleep(Duration::from_millis(500)).await;
        assert_eq!(pool.available(), 1);
    }
}
