//! Error types for the image annotator

use thiserror::Error;

/// Main error type for image annotator operations
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The admitted object could not be decoded into a known type
    #[error("decode error: {0}")]
    Decode(String),

    /// The computed patch could not be encoded
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Invalid process configuration (TLS material, listen address)
    #[error("configuration error: {0}")]
    Config(String),

    /// The HTTPS listener failed
    #[error("server error: {0}")]
    Server(String),
}

impl Error {
    /// Create a decode error with the given message
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    /// Create a serialization error with the given message
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization(msg.into())
    }

    /// Create a configuration error with the given message
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a server error with the given message
    pub fn server(msg: impl Into<String>) -> Self {
        Self::Server(msg.into())
    }

    /// The underlying failure text, without the category prefix
    pub fn detail(&self) -> &str {
        match self {
            Error::Decode(msg)
            | Error::Serialization(msg)
            | Error::Config(msg)
            | Error::Server(msg) => msg,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
