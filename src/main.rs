//! Image Annotator - mutating admission webhook for container image annotations

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use image_annotator::config::{parse_log_level, ServerConfig};
use image_annotator::server::start_server;
use image_annotator::{
    DEFAULT_LOG_LEVEL, DEFAULT_TLS_CERT_PATH, DEFAULT_TLS_KEY_PATH, DEFAULT_WEBHOOK_PORT,
};

/// Image Annotator - records container images as workload annotations
#[derive(Parser, Debug)]
#[command(name = "image-annotator", version, about, long_about = None)]
struct Cli {
    /// Port for the HTTPS listener
    #[arg(long, env = "PORT", default_value_t = DEFAULT_WEBHOOK_PORT)]
    port: u16,

    /// TLS certificate (PEM)
    #[arg(long, env = "TLS_CERT_FILE", default_value = DEFAULT_TLS_CERT_PATH)]
    tls_cert: PathBuf,

    /// TLS private key (PEM)
    #[arg(long, env = "TLS_KEY_FILE", default_value = DEFAULT_TLS_KEY_PATH)]
    tls_key: PathBuf,

    /// Log level (trace, debug, info, warn, error); invalid values mean debug
    #[arg(long, env = "LOG_LEVEL", default_value = "debug")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Install crypto provider - FIPS-validated aws-lc-rs
    if let Err(e) = rustls::crypto::aws_lc_rs::default_provider().install_default() {
        eprintln!(
            "CRITICAL: Failed to install crypto provider: {:?}. \
             The webhook cannot serve TLS without it.",
            e
        );
        std::process::exit(1);
    }

    let cli = Cli::parse();
    let log_level = parse_log_level(&cli.log_level);

    let config = ServerConfig {
        cert_path: cli.tls_cert,
        key_path: cli.tls_key,
        log_level: log_level.unwrap_or(DEFAULT_LOG_LEVEL),
        ..ServerConfig::default()
    }
    .with_port(cli.port);

    let directives = std::env::var(EnvFilter::DEFAULT_ENV).unwrap_or_default();
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(config.log_filter(&directives))
        .init();

    if log_level.is_none() {
        tracing::warn!(
            log_level = %cli.log_level,
            "Unknown log level, falling back to {}",
            DEFAULT_LOG_LEVEL
        );
    }

    tokio::select! {
        result = start_server(config) => result?,
        _ = tokio::signal::ctrl_c() => tracing::info!("Shutting down"),
    }

    Ok(())
}
