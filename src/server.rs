//! Webhook HTTPS server

use axum_server::tls_rustls::RustlsConfig;
use tracing::info;

use crate::config::ServerConfig;
use crate::webhook::webhook_router;
use crate::{Error, Result};

/// Load the TLS certificate and key named by the configuration
pub async fn load_tls(config: &ServerConfig) -> Result<RustlsConfig> {
    let cert_pem = tokio::fs::read(&config.cert_path).await.map_err(|e| {
        Error::config(format!(
            "failed to read TLS certificate {}: {}",
            config.cert_path.display(),
            e
        ))
    })?;
    let key_pem = tokio::fs::read(&config.key_path).await.map_err(|e| {
        Error::config(format!(
            "failed to read TLS key {}: {}",
            config.key_path.display(),
            e
        ))
    })?;

    RustlsConfig::from_pem(cert_pem, key_pem)
        .await
        .map_err(|e| Error::config(format!("TLS config error: {}", e)))
}

/// Start the webhook server and serve until the listener fails
pub async fn start_server(config: ServerConfig) -> Result<()> {
    let tls_config = load_tls(&config).await?;

    info!(addr = %config.addr, "Listening for admission reviews");

    axum_server::bind_rustls(config.addr, tls_config)
        .serve(webhook_router().into_make_service())
        .await
        .map_err(|e| Error::server(e.to_string()))
}
