//! Error types for the upload pipeline

use std::fmt;
use thiserror::Error;

/// Result type alias for upload pipeline operations
pub type Result<T> = std::result::Result<T, StudioError>;

/// Why a candidate file was rejected by the validator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidFileKind {
    /// Declared MIME type is not one of the accepted image types
    UnsupportedType,
    /// File exceeds the configured size limit
    TooLarge,
    /// Descriptor is unusable: no name, no parsable MIME type, or zero bytes
    Malformed,
}

impl fmt::Display for InvalidFileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedType => write!(f, "unsupported type"),
            Self::TooLarge => write!(f, "too large"),
            Self::Malformed => write!(f, "malformed input"),
        }
    }
}

/// Comprehensive error types for upload pipeline operations
#[derive(Error, Debug)]
pub enum StudioError {
    /// The file was rejected before any work started
    #[error("{reason}")]
    InvalidFile {
        kind: InvalidFileKind,
        reason: String,
    },

    /// Reading the file bytes failed (I/O, permissions, truncated stream)
    #[error("Failed to read file: {0}")]
    ReadFailure(String),

    /// The background removal capability raised an error
    #[error("Background removal failed: {0}")]
    ProcessingFailure(String),

    /// The work was cancelled; never shown to the user
    #[error("Processing cancelled")]
    Cancelled,

    /// Invalid configuration or parameters
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Input/output errors outside the read path (saving downloads, config files)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl StudioError {
    /// Create a new invalid file error
    pub fn invalid_file<S: Into<String>>(kind: InvalidFileKind, reason: S) -> Self {
        Self::InvalidFile {
            kind,
            reason: reason.into(),
        }
    }

    /// Create a new read failure
    pub fn read_failure<S: Into<String>>(msg: S) -> Self {
        Self::ReadFailure(msg.into())
    }

    /// Create a new processing failure
    pub fn processing<S: Into<String>>(msg: S) -> Self {
        Self::ProcessingFailure(msg.into())
    }

    /// Create a new invalid configuration error
    pub fn invalid_config<S: Into<String>>(msg: S) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Create file I/O error with operation context
    pub fn file_io_error<P: AsRef<std::path::Path>>(
        operation: &str,
        path: P,
        error: &std::io::Error,
    ) -> Self {
        let path_display = path.as_ref().display();
        Self::Io(std::io::Error::new(
            error.kind(),
            format!("Failed to {} '{}': {}", operation, path_display, error),
        ))
    }

    /// Create configuration error with valid ranges
    pub fn config_value_error<T: fmt::Display>(
        parameter: &str,
        value: T,
        valid_range: &str,
        recommended: Option<T>,
    ) -> Self {
        let recommendation = match recommended {
            Some(rec) => format!(" Recommended: {}", rec),
            None => String::new(),
        };

        Self::InvalidConfig(format!(
            "Invalid {}: {} (valid range: {}).{}",
            parameter, value, valid_range, recommendation
        ))
    }

    /// The rejection kind, if this is an invalid file error
    #[must_use]
    pub fn invalid_file_kind(&self) -> Option<InvalidFileKind> {
        match self {
            Self::InvalidFile { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}
