use std::sync::Arc;
use tracing::info;

use crate::analytics::stats::LimiterStats;
use crate::config::Config;
use crate::document::{Document, JsonSerializer};
use crate::error::Result;
use crate::invoker::RateLimitedInvoker;
use crate::security::CertificateChannelBuilder;
use crate::transport::{Ack, HttpTransport};

pub type DocumentInvoker =
    RateLimitedInvoker<JsonSerializer, CertificateChannelBuilder, HttpTransport>;

/// Client for the document registration API, throttled to the configured request rate.
pub struct CrptApi {
    invoker: DocumentInvoker,
}

impl CrptApi {
    pub fn new(config: &Config) -> Result<Self> {
        let limits = config.limiter()?;
        let transport = HttpTransport::new(&config.api_url)?;
        let channels = CertificateChannelBuilder::new(config.http_settings());

        let invoker = RateLimitedInvoker::new(
            JsonSerializer,
            channels,
            transport,
            limits,
            config.error_policy,
        )?;

        info!(
            "Document client ready: {} requests per {}ms to {}",
            limits.capacity(),
            limits.interval().as_millis(),
            config.api_url
        );

        Ok(Self { invoker })
    }

    /// 50 requests per minute against the default endpoint.
    pub fn with_defaults() -> Result<Self> {
        Self::new(&Config::default())
    }

    pub async fn create_document(&self, document: &Document, signature: &str) -> Result<()> {
        self.invoker.invoke(document, signature).await
    }

    pub async fn try_create_document(&self, document: &Document, signature: &str) -> Result<Ack> {
        self.invoker.send(document, signature).await
    }

    pub fn available_permits(&self) -> usize {
        self.invoker.available_permits()
    }

    pub fn stats(&self) -> Arc<LimiterStats> {
        self.invoker.stats()
    }

    pub async fn shutdown(&self) {
        self.invoker.shutdown().await;
    }
}
