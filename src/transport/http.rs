use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use tracing::debug;
use url::Url;

use crate::document::Payload;
use crate::error::{AppError, Result};
use crate::security::SecureChannel;
use crate::transport::{Ack, Transport};

/// POSTs payloads to a single HTTPS endpoint.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    endpoint: Url,
}

impl HttpTransport {
    pub fn new(endpoint: &str) -> Result<Self> {
        let endpoint = Url::parse(endpoint)
            .map_err(|e| AppError::InvalidConfig(format!("Invalid API URL {}: {}", endpoint, e)))?;

        if endpoint.scheme() != "https" {
            return Err(AppError::InvalidConfig(format!(
                "API URL must use https, got {}",
                endpoint.scheme()
            )));
        }

        Ok(Self { endpoint })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl Transport<SecureChannel> for HttpTransport {
    async fn send(&self, payload: Payload, channel: &SecureChannel) -> Result<Ack> {
        let response = channel
            .client()
            .post(self.endpoint.clone())
            .header(CONTENT_TYPE, payload.content_type)
            .body(payload.body)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(AppError::Transport(format!("HTTP Error: {} {}", status, body)));
        }

        debug!("Document accepted with status {}", status);
        Ok(Ack {
            status: status.as_u16(),
            body,
        })
    }
}
