//! Image Annotator - mutating admission webhook for container image annotations
//!
//! For every admitted workload that embeds a pod template, the webhook
//! records each container's image under `metadata.annotations`, keyed
//! `image.clabs.co/<container-name>`. Annotations that another mutator has
//! already pinned to a content digest are left untouched.
//!
//! # Modules
//!
//! - [`workload`] - Decodes admission objects and extracts their pod template
//! - [`annotation`] - Builds the JSON Patch for the image annotations
//! - [`webhook`] - Admission decisions and the `/mutate` HTTP handler
//! - [`server`] - HTTPS listener
//! - [`config`] - Process configuration
//! - [`error`] - Error types

#![deny(missing_docs)]

use tracing_subscriber::filter::LevelFilter;

pub mod annotation;
pub mod config;
pub mod error;
pub mod server;
pub mod webhook;
pub mod workload;

pub use error::Error;

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;

// =============================================================================
// Default Configuration Constants
// =============================================================================

/// Default port for the webhook HTTPS server
pub const DEFAULT_WEBHOOK_PORT: u16 = 8443;

/// Default TLS certificate path, as mounted from the webhook's Secret
pub const DEFAULT_TLS_CERT_PATH: &str = "/etc/image-annotator-webhook/tls/tls.crt";

/// Default TLS private key path, as mounted from the webhook's Secret
pub const DEFAULT_TLS_KEY_PATH: &str = "/etc/image-annotator-webhook/tls/tls.key";

/// Log level used when none is configured or the configured one is invalid
pub const DEFAULT_LOG_LEVEL: LevelFilter = LevelFilter::DEBUG;
