use std::sync::atomic::{AtomicU64, Ordering};
use tracing::info;

#[derive(Debug, Default)]
pub struct LimiterStats {
    pub sent: AtomicU64,
    pub dropped_preparation: AtomicU64,
    pub failed_transport: AtomicU64,
    pub cancelled: AtomicU64,
    pub replenishments: AtomicU64,

    // Last observed value only, gauge-like.
    pub last_permit_wait_ms: AtomicU64,
}

impl LimiterStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc_sent(&self) {
        self.sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_dropped_preparation(&self) {
        self.dropped_preparation.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_failed_transport(&self) {
        self.failed_transport.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_cancelled(&self) {
        self.cancelled.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_replenishments(&self) {
        self.replenishments.fetch_add(1, Ordering::Relaxed);
    }

    pub fn update_permit_wait(&self, ms: u64) {
        self.last_permit_wait_ms.store(ms, Ordering::Relaxed);
    }

    pub fn log_stats(&self) {
        let sent = self.sent.load(Ordering::Relaxed);
        let dropped = self.dropped_preparation.load(Ordering::Relaxed);
        let failed = self.failed_transport.load(Ordering::Relaxed);
        let cancelled = self.cancelled.load(Ordering::Relaxed);
        let windows = self.replenishments.load(Ordering::Relaxed);
        let wait = self.last_permit_wait_ms.load(Ordering::Relaxed);

        info!(
            "STATS: Sent {} | Dropped {} | Failed {} | Cancelled {} | Windows {} | Last wait {}ms",
            sent, dropped, failed, cancelled, windows, wait
        );
    }
}
