//! Error types for the logo-compose-core library.
//!
//! Local validation failures, file read failures and remote service failures
//! each get their own variant so the session can report a precise message.

use thiserror::Error;

/// Errors that can occur within the logo-compose-core library.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors (missing keys, invalid values).
    #[error("Configuration error: {0}")]
    Config(String),

    /// A required environment variable was not found.
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    /// The candidate file is larger than the intake limit.
    #[error("File is too large: {size} bytes (limit is {limit} bytes)")]
    Oversize { size: u64, limit: u64 },

    /// The candidate's media type is not accepted by the selection source.
    #[error("Unsupported image type: {0}")]
    UnsupportedMediaType(String),

    /// A submission was attempted without both images and an instruction.
    #[error("Please upload both images and provide an instruction.")]
    MissingInput,

    /// Reading a local image file failed or returned fewer bytes than declared.
    #[error("Failed to read {path}: {reason}")]
    Read { path: String, reason: String },

    /// The remote generation call failed (transport, auth, quota, bad response).
    #[error("Gemini API error: {0}")]
    RemoteService(String),

    /// The remote call succeeded but no part carried inline image data.
    #[error("The model did not return an image. Try a different instruction.")]
    NoImageReturned,

    /// A string that should have been a base64 data URI was not one.
    #[error("Invalid data URI: {0}")]
    InvalidDataUri(String),

    /// Standard I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AppError {
    /// Creates a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates a read error for the given path.
    pub fn read(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Read {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Creates a remote service error with the given message.
    pub fn remote(msg: impl Into<String>) -> Self {
        Self::RemoteService(msg.into())
    }

    /// Returns true for errors detected locally before any remote call.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::Oversize { .. } | Self::UnsupportedMediaType(_) | Self::MissingInput
        )
    }
}

/// A convenient alias for Result with [`AppError`].
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_errors_are_grouped() {
        assert!(AppError::MissingInput.is_validation());
        assert!(AppError::Oversize { size: 5, limit: 4 }.is_validation());
        assert!(AppError::UnsupportedMediaType("image/gif".into()).is_validation());
        assert!(!AppError::NoImageReturned.is_validation());
        assert!(!AppError::remote("quota exceeded").is_validation());
    }

    #[test]
    fn remote_error_carries_underlying_message() {
        let err = AppError::remote("403 PERMISSION_DENIED");
        assert_eq!(err.to_string(), "Gemini API error: 403 PERMISSION_DENIED");
    }
}
