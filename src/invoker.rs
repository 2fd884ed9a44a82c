use std::sync::Arc;
use tracing::{debug, warn};

use crate::analytics::stats::LimiterStats;
use crate::config::{ErrorPolicy, LimiterConfig};
use crate::document::{Document, Payload, Serializer};
use crate::error::Result;
use crate::limiter::RateLimiter;
use crate::security::SecureChannelBuilder;
use crate::transport::{Ack, Transport};

/// Sends documents through a [`RateLimiter`].
///
/// A call prepares its payload and channel first, then waits for a permit,
/// then sends. Preparation failures never touch the pool. A failed send
/// gives its permit back before returning; a successful one keeps it until
/// the window rolls over.
pub struct RateLimitedInvoker<S, B, T> {
    serializer: S,
    channels: B,
    transport: T,
    limiter: RateLimiter,
    policy: ErrorPolicy,
    stats: Arc<LimiterStats>,
}

impl<S, B, T> RateLimitedInvoker<S, B, T>
where
    S: Serializer,
    B: SecureChannelBuilder,
    B::Channel: 'static,
    T: Transport<B::Channel>,
{
    pub fn new(
        serializer: S,
        channels: B,
        transport: T,
        limits: LimiterConfig,
        policy: ErrorPolicy,
    ) -> Result<Self> {
        let stats = Arc::new(LimiterStats::new());
        let limiter = RateLimiter::new(limits, stats.clone())?;

        Ok(Self {
            serializer,
            channels,
            transport,
            limiter,
            policy,
            stats,
        })
    }

    /// Submits `document`, applying the configured [`ErrorPolicy`].
    ///
    /// Under `Silent`, preparation and transport failures are logged and
    /// `Ok(())` is returned. Anything else, cancellation included, is
    /// always returned as an error.
    pub async fn invoke(&self, document: &Document, credential: &str) -> Result<()> {
        match self.send(document, credential).await {
            Ok(_) => Ok(()),
            Err(e) => match self.policy {
                ErrorPolicy::Silent if e.is_preparation() => {
                    warn!("Document dropped before sending, no permit used: {}", e);
                    Ok(())
                }
                ErrorPolicy::Silent if e.is_transport() => {
                    warn!("Document send failed, permit returned: {}", e);
                    Ok(())
                }
                _ => Err(e),
            },
        }
    }

    /// Submits `document` and returns every failure to the caller.
    pub async fn send(&self, document: &Document, credential: &str) -> Result<Ack> {
        let (payload, channel) = match self.prepare(document, credential) {
            Ok(prepared) => prepared,
            Err(e) => {
                self.stats.inc_dropped_preparation();
                return Err(e);
            }
        };

        let permit = self.limiter.acquire().await?;

        match self.transport.send(payload, &channel).await {
            Ok(ack) => {
                permit.commit();
                self.stats.inc_sent();
                Ok(ack)
            }
            Err(e) => {
                permit.release();
                self.stats.inc_failed_transport();
                debug!("Send failed, permit returned: {}", e);
                Err(e)
            }
        }
    }

    fn prepare(&self, document: &Document, credential: &str) -> Result<(Payload, B::Channel)> {
        let payload = self.serializer.serialize(document)?;
        let channel = self.channels.build(credential)?;
        Ok((payload, channel))
    }

    pub fn available_permits(&self) -> usize {
        self.limiter.available()
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    pub fn policy(&self) -> ErrorPolicy {
        self.policy
    }

    pub fn stats(&self) -> Arc<LimiterStats> {
        self.stats.clone()
    }

    /// Stops replenishment and fails waiting and future calls with a cancellation.
    pub async fn shutdown(&self) {
        self.limiter.shutdown().await;
        self.stats.log_stats();
    }
}
