use parking_lot::Mutex;
use std::future::Future;
use std::time::Duration;
use tokio::sync::Semaphore;

use crate::error::{AppError, Result};

/// Fixed-capacity pool of request permits.
///
/// Waiters are granted permits in the order they started waiting (tokio's
/// `Semaphore` queues acquirers FIFO). Permits taken from the pool are not
/// returned when a guard goes out of scope after [`Permit::commit`]; they
/// come back through [`PermitPool::release`] or [`PermitPool::reset_to_capacity`].
#[derive(Debug)]
pub struct PermitPool {
    semaphore: Semaphore,
    capacity: usize,
    // Serializes the two refill paths so neither can push `available` past `capacity`.
    refill: Mutex<()>,
}

impl PermitPool {
    pub fn new(capacity: usize) -> Self {
        Self {
            semaphore: Semaphore::new(capacity),
            capacity,
            refill: Mutex::new(()),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    pub fn is_closed(&self) -> bool {
        self.semaphore.is_closed()
    }

    /// Waits for a permit. Fails only if the pool is closed while waiting.
    pub async fn acquire(&self) -> Result<Permit<'_>> {
        let permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|_| AppError::Cancelled("permit pool closed".into()))?;
        permit.forget();
        Ok(Permit::new(self))
    }

    /// Waits for a permit until `cancel` resolves, whichever comes first.
    /// A cancelled wait leaves its place in the queue and holds nothing.
    pub async fn acquire_until<F>(&self, cancel: F) -> Result<Permit<'_>>
    where
        F: Future,
    {
        tokio::select! {
            biased;
            permit = self.acquire() => permit,
            _ = cancel => Err(AppError::Cancelled("permit wait cancelled".into())),
        }
    }

    pub async fn acquire_timeout(&self, timeout: Duration) -> Result<Permit<'_>> {
        match tokio::time::timeout(timeout, self.acquire()).await {
            Ok(permit) => permit,
            Err(_) => Err(AppError::Cancelled(format!(
                "no permit within {}ms",
                timeout.as_millis()
            ))),
        }
    }

    /// Takes a permit only if one is free right now and nobody is queued ahead.
    pub fn try_acquire(&self) -> Option<Permit<'_>> {
        let permit = self.semaphore.try_acquire().ok()?;
        permit.forget();
        Some(Permit::new(self))
    }

    /// Returns one permit to the pool, waking the oldest waiter if any.
    /// No-op when the pool is already full.
    pub fn release(&self) {
        let _guard = self.refill.lock();
        if self.semaphore.available_permits() < self.capacity {
            self.semaphore.add_permits(1);
        }
    }

    /// Sets the pool back to exactly `capacity` free permits and returns how
    /// many were restored. Calling it on a full pool restores nothing.
    pub fn reset_to_capacity(&self) -> usize {
        let _guard = self.refill.lock();
        if self.semaphore.is_closed() {
            return 0;
        }
        let deficit = self
            .capacity
            .saturating_sub(self.semaphore.available_permits());
        if deficit > 0 {
            self.semaphore.add_permits(deficit);
        }
        deficit
    }

    /// Fails every pending and future acquire with a cancellation error.
    pub fn close(&self) {
        self.semaphore.close();
    }
}

/// One unit of quota taken from a [`PermitPool`].
///
/// Settle it with [`Permit::commit`] once the request went out, or
/// [`Permit::release`] when it failed. A guard dropped unsettled is released.
#[must_use = "an unsettled permit is released on drop"]
#[derive(Debug)]
pub struct Permit<'a> {
    pool: &'a PermitPool,
    settled: bool,
}

impl<'a> Permit<'a> {
    fn new(pool: &'a PermitPool) -> Self {
        Self {
            pool,
            settled: false,
        }
    }

    /// Keeps the permit spent until the pool is next replenished.
    pub fn commit(mut self) {
        self.settled = true;
    }

    /// Hands the permit straight back to the pool.
    pub fn release(mut self) {
        self.settled = true;
        self.pool.release();
    }
}

impl Drop for Permit<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.pool.release();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tokio::sync::mpsc;

    #[test]
    fn test_commit_keeps_permit_spent() {
        let pool = PermitPool::new(2);
        pool.try_acquire().unwrap().commit();
        assert_eq!(pool.available(), 1);

        pool.try_acquire().unwrap().commit();
        assert_eq!(pool.available(), 0);
        assert!(pool.try_acquire().is_none());
    }

    #[test]
    fn test_release_and_drop_return_permit() {
        let pool = PermitPool::new(1);
        pool.try_acquire().unwrap().release();
        assert_eq!(pool.available(), 1);

        {
            let _permit = pool.try_acquire().unwrap();
            assert_eq!(pool.available(), 0);
        }
        assert_eq!(pool.available(), 1);
    }

    #[test]
    fn test_release_never_exceeds_capacity() {
        let pool = PermitPool::new(3);
        pool.release();
        pool.release();
        assert_eq!(pool.available(), 3);

        pool.try_acquire().unwrap().commit();
        pool.release();
        pool.release();
        assert_eq!(pool.available(), 3);
    }

    #[test]
    fn test_reset_sets_rather_than_adds() {
        let pool = PermitPool::new(4);
        assert_eq!(pool.reset_to_capacity(), 0);
        assert_eq!(pool.available(), 4);

        pool.try_acquire().unwrap().commit();
        pool.try_acquire().unwrap().commit();
        pool.try_acquire().unwrap().commit();
        assert_eq!(pool.reset_to_capacity(), 3);
        assert_eq!(pool.reset_to_capacity(), 0);
        assert_eq!(pool.available(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_waiters_served_in_arrival_order() {
        let pool = Arc::new(PermitPool::new(1));
        pool.acquire().await.unwrap().commit();

        let (tx, mut rx) = mpsc::unbounded_channel();
        for id in 1..=3 {
            let pool = pool.clone();
            let tx = tx.clone();
            tokio::spawn(async move {
                let permit = pool.acquire().await.unwrap();
                tx.send(id).unwrap();
                permit.commit();
            });
            // Lets the spawned waiter enqueue before the next one is created.
            tokio::time::sleep(Duration::from_millis(1)).await;
        }

        let mut order = Vec::new();
        for _ in 0..3 {
            pool.release();
            order.push(rx.recv().await.unwrap());
        }
        assert_eq!(order, vec![1, 2, 3]);
        assert_eq!(pool.available(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_wakes_exactly_the_restored_count() {
        let pool = Arc::new(PermitPool::new(2));
        pool.acquire().await.unwrap().commit();
        pool.acquire().await.unwrap().commit();

        let (tx, mut rx) = mpsc::unbounded_channel();
        for id in 0..3 {
            let pool = pool.clone();
            let tx = tx.clone();
            tokio::spawn(async move {
                pool.acquire().await.unwrap().commit();
                tx.send(id).unwrap();
            });
        }
        tokio::time::sleep(Duration::from_millis(1)).await;

        assert_eq!(pool.reset_to_capacity(), 2);
        tokio::time::sleep(Duration::from_millis(1)).await;

        let mut served = Vec::new();
        while let Ok(id) = rx.try_recv() {
            served.push(id);
        }
        assert_eq!(served, vec![0, 1]);
        assert_eq!(pool.available(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_and_cancel_hold_nothing() {
        let pool = PermitPool::new(1);
        pool.acquire().await.unwrap().commit();

        let err = pool
            .acquire_timeout(Duration::from_millis(20))
            .await
            .unwrap_err();
        assert!(err.is_cancellation());

        let err = pool
            .acquire_until(tokio::time::sleep(Duration::from_millis(5)))
            .await
            .unwrap_err();
        assert!(err.is_cancellation());

        pool.release();
        assert_eq!(pool.available(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_cancels_waiters() {
        let pool = Arc::new(PermitPool::new(1));
        pool.acquire().await.unwrap().commit();

        let waiter = {
            let pool = pool.clone();
            tokio::spawn(async move { pool.acquire().await.map(|p| p.commit()) })
        };
        tokio::time::sleep(Duration::from_millis(1)).await;

        pool.close();
        let err = waiter.await.unwrap().unwrap_err();
        assert!(err.is_cancellation());
        assert!(pool.is_closed());
        assert_eq!(pool.reset_to_capacity(), 0);
    }
}
