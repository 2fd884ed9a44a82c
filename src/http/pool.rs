use reqwest::{Certificate, Client};
use std::time::Duration;
use crate::config::HttpSettings;
use crate::error::Result;

const POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(90);

/// HTTPS-only client that trusts `trust_anchor` and nothing else.
pub fn create_http_client(trust_anchor: Certificate, settings: &HttpSettings) -> Result<Client> {
    let client = Client::builder()
        .use_rustls_tls()
        .tls_built_in_root_certs(false)
        .add_root_certificate(trust_anchor)
        .https_only(true)
        .tcp_nodelay(true)
        .pool_idle_timeout(POOL_IDLE_TIMEOUT)
        .pool_max_idle_per_host(10)
        .connect_timeout(settings.connect_timeout)
        .timeout(settings.request_timeout)
        .build()?;

    Ok(client)
}
