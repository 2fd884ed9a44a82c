use tokio::time::Instant;

// tokio's clock, so waits line up with the limiter's timers (and paused test time).
pub fn now_instant() -> Instant {
    Instant::now()
}

pub fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}
