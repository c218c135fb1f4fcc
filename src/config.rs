//! Process configuration
//!
//! Read once at startup and handed to the server; nothing here is global.

use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;

use tracing_subscriber::filter::{EnvFilter, LevelFilter};

use crate::{DEFAULT_LOG_LEVEL, DEFAULT_TLS_CERT_PATH, DEFAULT_TLS_KEY_PATH, DEFAULT_WEBHOOK_PORT};

/// Webhook server configuration
#[derive(Clone, Debug, PartialEq)]
pub struct ServerConfig {
    /// Address to bind the HTTPS listener
    pub addr: SocketAddr,
    /// TLS certificate chain (PEM)
    pub cert_path: PathBuf,
    /// TLS private key (PEM)
    pub key_path: PathBuf,
    /// Maximum log verbosity
    pub log_level: LevelFilter,
}

impl ServerConfig {
    /// Listen on all interfaces at the given port
    pub fn with_port(mut self, port: u16) -> Self {
        self.addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, port));
        self
    }

    /// Log filter with `log_level` as the default directive
    ///
    /// `directives` uses the `RUST_LOG` syntax and refines the default;
    /// invalid directives are skipped.
    pub fn log_filter(&self, directives: &str) -> EnvFilter {
        EnvFilter::builder()
            .with_default_directive(self.log_level.into())
            .parse_lossy(directives)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, DEFAULT_WEBHOOK_PORT)),
            cert_path: PathBuf::from(DEFAULT_TLS_CERT_PATH),
            key_path: PathBuf::from(DEFAULT_TLS_KEY_PATH),
            log_level: DEFAULT_LOG_LEVEL,
        }
    }
}

/// Parse a log level name
///
/// Accepts the `tracing` names plus `warning`, `fatal` and `panic`, which
/// older deployments of this webhook were configured with. Returns `None`
/// for anything else, including empty and numeric values.
pub fn parse_log_level(level: &str) -> Option<LevelFilter> {
    match level.trim().to_ascii_lowercase().as_str() {
        "trace" => Some(LevelFilter::TRACE),
        "debug" => Some(LevelFilter::DEBUG),
        "info" => Some(LevelFilter::INFO),
        "warn" | "warning" => Some(LevelFilter::WARN),
        "error" | "fatal" | "panic" => Some(LevelFilter::ERROR),
        "off" => Some(LevelFilter::OFF),
        _ => None,
    }
}
