//! Error types for gallery rendering, bundling and Swarm uploads

use thiserror::Error;

/// Result type alias for gallery operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while packaging or uploading artifacts
#[derive(Error, Debug)]
pub enum Error {
    /// The image payload is not valid base64
    #[error("Failed to decode base64 image: {0}")]
    Decode(String),

    /// The batch provider returned no usable postage batch
    #[error("No postage batch available")]
    NoBatchAvailable,

    /// The persistence collaborator rejected the upload
    #[error("Upload failed: {0}")]
    Persistence(String),

    /// Network error talking to the Bee node
    #[error("Network error: {0}")]
    Network(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Search index could not be built, loaded or queried
    #[error("Index error: {0}")]
    Index(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

#[cfg(feature = "bee")]
impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Network(err.to_string())
    }
}

impl From<base64::DecodeError> for Error {
    fn from(err: base64::DecodeError) -> Self {
        Error::Decode(err.to_string())
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Error::Config(err.to_string())
    }
}
