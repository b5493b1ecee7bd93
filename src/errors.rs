// SPDX-License-Identifier: GPL-3.0-only

//! Error types for the scanner

use std::fmt;

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Top-level error for configuration, image loading and CLI commands
#[derive(Debug, Clone)]
pub enum AppError {
    /// Decoder errors surfaced outside the throttler (direct decode)
    Decode(DecodeError),
    /// Configuration errors
    Config(String),
    /// Storage/filesystem errors
    Storage(String),
    /// Image file could not be loaded
    Image(String),
    /// Generic error with message
    Other(String),
}

/// Failure reported by a decoder for a dispatched frame
///
/// The throttler absorbs these: they are logged and counted, never
/// forwarded to the sink or the camera pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Frame geometry does not match its pixel buffer
    InvalidFrame(String),
    /// Error reported by the decoding backend
    Backend(String),
    /// The decode worker panicked before completing
    WorkerPanicked(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Decode(e) => write!(f, "Decode error: {}", e),
            AppError::Config(msg) => write!(f, "Configuration error: {}", msg),
            AppError::Storage(msg) => write!(f, "Storage error: {}", msg),
            AppError::Image(msg) => write!(f, "Image error: {}", msg),
            AppError::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::InvalidFrame(msg) => write!(f, "Invalid frame: {}", msg),
            DecodeError::Backend(msg) => write!(f, "Decoder backend error: {}", msg),
            DecodeError::WorkerPanicked(msg) => write!(f, "Decode worker panicked: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}
impl std::error::Error for DecodeError {}

impl From<DecodeError> for AppError {
    fn from(err: DecodeError) -> Self {
        AppError::Decode(err)
    }
}

impl From<String> for AppError {
    fn from(msg: String) -> Self {
        AppError::Other(msg)
    }
}

impl From<&str> for AppError {
    fn from(msg: &str) -> Self {
        AppError::Other(msg.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Config(err.to_string())
    }
}

impl From<image::ImageError> for AppError {
    fn from(err: image::ImageError) -> Self {
        AppError::Image(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_error_wraps_into_app_error() {
        let err: AppError = DecodeError::Backend("bad grid".into()).into();
        assert_eq!(err.to_string(), "Decode error: Decoder backend error: bad grid");
    }

    #[test]
    fn test_io_error_maps_to_storage() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        assert!(matches!(AppError::from(io), AppError::Storage(_)));
    }
}
