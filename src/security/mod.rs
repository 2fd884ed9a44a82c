use reqwest::{Certificate, Client};
use tracing::debug;

use crate::config::HttpSettings;
use crate::error::{AppError, Result};
use crate::http::pool::create_http_client;

const PEM_CERTIFICATE_HEADER: &str = "-----BEGIN CERTIFICATE-----";

/// Turns caller-supplied credential material into a channel a transport can send over.
pub trait SecureChannelBuilder: Send + Sync {
    type Channel: Send + Sync;

    fn build(&self, credential: &str) -> Result<Self::Channel>;
}

/// TLS client pinned to a single trusted certificate.
#[derive(Debug, Clone)]
pub struct SecureChannel {
    client: Client,
}

impl SecureChannel {
    pub fn client(&self) -> &Client {
        &self.client
    }
}

/// Treats the credential as a PEM X.509 certificate and makes it the only trust root.
#[derive(Debug, Clone, Default)]
pub struct CertificateChannelBuilder {
    settings: HttpSettings,
}

impl CertificateChannelBuilder {
    pub fn new(settings: HttpSettings) -> Self {
        Self { settings }
    }
}

impl SecureChannelBuilder for CertificateChannelBuilder {
    type Channel = SecureChannel;

    fn build(&self, credential: &str) -> Result<SecureChannel> {
        if !credential.contains(PEM_CERTIFICATE_HEADER) {
            return Err(AppError::Security(
                "credential is not a PEM encoded certificate".into(),
            ));
        }

        let certificate = Certificate::from_pem(credential.as_bytes())
            .map_err(|e| AppError::Security(format!("Invalid certificate: {}", e)))?;

        let client = create_http_client(certificate, &self.settings)
            .map_err(|e| AppError::Security(format!("Failed to build TLS context: {}", e)))?;

        debug!("Secure channel ready");
        Ok(SecureChannel { client })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_non_certificate_credential() {
        let builder = CertificateChannelBuilder::default();

        let err = builder.build("just a signature").unwrap_err();
        assert!(matches!(err, AppError::Security(_)));
        assert!(err.is_preparation());

        assert!(builder.build("").is_err());
    }
}
