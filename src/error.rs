//! Error types for vidarray

use crate::types::PixelFormat;
use thiserror::Error;

/// Result type alias for vidarray operations
pub type Result<T> = std::result::Result<T, Error>;

/// vidarray error type
#[derive(Error, Debug)]
pub enum Error {
    // Conversion errors
    #[error("Unsupported pixel format: {0} (expected Bgra8888 or Bgrx8888)")]
    Format(PixelFormat),

    #[error("Invalid number of dimensions: expected 2 or 3, got {0}")]
    Dimension(usize),

    #[error("Invalid number of channels: expected 1 to 4, got {0}")]
    ChannelCount(usize),

    #[error("Shape error: {0}")]
    Shape(String),

    #[error("Invalid frame: {0}")]
    InvalidFrame(String),

    // Processing errors
    #[error("Transform failed: {0}")]
    Transform(String),

    #[error("Processor lifecycle error: {0}")]
    Lifecycle(String),

    #[error("Conformance check failed: {0}")]
    Conformance(String),

    // Source errors
    #[error("Frame source error: {0}")]
    Source(String),

    // General errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Check if this error only affects the current frame
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::Format(_) | Error::InvalidFrame(_) | Error::Transform(_) | Error::Source(_)
        )
    }

    /// Check if this error comes from a malformed array passed by the caller
    pub fn is_caller_bug(&self) -> bool {
        matches!(
            self,
            Error::Dimension(_) | Error::ChannelCount(_) | Error::Shape(_)
        )
    }
}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Error::Config(e.to_string())
    }
}
