use anyhow::Context;
use std::env;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crpt_api::config::{Config, LogFormat};
use crpt_api::document::Document;
use crpt_api::CrptApi;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load Config
    let config = Config::load()?;

    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.clone()));
    match config.log_format {
        LogFormat::Json => tracing_subscriber::fmt().json().with_env_filter(filter).init(),
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }

    let document_path = env::var("CRPT_DOCUMENT_PATH").context("CRPT_DOCUMENT_PATH must be set")?;
    let certificate_path =
        env::var("CRPT_CERTIFICATE_PATH").context("CRPT_CERTIFICATE_PATH must be set")?;

    let document: Document = serde_json::from_str(
        &std::fs::read_to_string(&document_path)
            .with_context(|| format!("reading document {}", document_path))?,
    )
    .with_context(|| format!("parsing document {}", document_path))?;
    let signature = std::fs::read_to_string(&certificate_path)
        .with_context(|| format!("reading certificate {}", certificate_path))?;

    let api = CrptApi::new(&config)?;

    let doc_id = document.doc_id.clone().unwrap_or_else(|| "<unnamed>".to_string());
    info!("Submitting document {}...", doc_id);
    let ack = api.try_create_document(&document, &signature).await?;
    info!("Document {} accepted: {} {}", doc_id, ack.status, ack.body);

    api.shutdown().await;
    Ok(())
}
