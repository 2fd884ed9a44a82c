pub mod http;

use async_trait::async_trait;
use crate::document::Payload;
use crate::error::Result;

pub use http::HttpTransport;

/// Remote acknowledgement of a delivered payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ack {
    pub status: u16,
    pub body: String,
}

#[async_trait]
pub trait Transport<C>: Send + Sync
where
    C: Send + Sync + 'static,
{
    /// Deliver `payload` over an already prepared `channel`.
    async fn send(&self, payload: Payload, channel: &C) -> Result<Ack>;
}
