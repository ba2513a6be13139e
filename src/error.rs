//! Error types for multipart composition and upload.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while composing, streaming or uploading a multipart body.
#[derive(Debug, Error)]
pub enum MultipartError {
    /// Base error carrying a free-form message.
    #[error("[Multipart Error]: {message}")]
    Base {
        /// Error message
        message: String,
    },

    /// A part cannot report its body length ahead of time.
    #[error("Content length of part '{part}' is unknown")]
    LengthUnknown {
        /// Name of the part
        part: String,
    },

    /// A part body ended before producing the number of bytes it declared.
    #[error("Part '{part}' declared {expected} bytes but produced {actual}")]
    LengthMismatch {
        /// Name of the part
        part: String,
        /// Declared body length
        expected: u64,
        /// Bytes actually produced
        actual: u64,
    },

    /// Failed to read the size of a file-backed part.
    #[error("Failed to get file size for {path:?}: {source}")]
    FileMetadata {
        /// Path of the file
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// Failed to open a file-backed part for reading.
    #[error("Failed to open file {path:?}: {source}")]
    FileOpen {
        /// Path of the file
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// Reading a part body failed.
    #[error("Failed to read body of part '{part}': {source}")]
    Io {
        /// Name of the part
        part: String,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// A stream-backed part was opened a second time.
    #[error("Stream of part '{part}' has already been consumed")]
    StreamConsumed {
        /// Name of the part
        part: String,
    },

    /// A part was constructed with invalid content.
    #[error("Invalid part: {0}")]
    InvalidPart(String),

    /// A boundary token is empty or too long.
    #[error("Invalid boundary: {0}")]
    InvalidBoundary(String),

    /// A charset label is not supported.
    #[error("Unsupported charset: {0}")]
    UnsupportedCharset(String),

    /// A configuration value could not be parsed.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Error occurred during an HTTP request.
    #[error("API request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    /// Error occurred when accessing environment variables.
    #[error("Environment variable not found: {0}")]
    EnvError(#[from] std::env::VarError),

    /// Error occurred when parsing JSON.
    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl MultipartError {
    /// Creates a new Base error with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self::Base {
            message: message.into(),
        }
    }

    /// Converts the error into an [`std::io::Error`], keeping the original I/O kind where there is one.
    pub fn into_io(self) -> std::io::Error {
        use std::io::{Error, ErrorKind};

        match self {
            Self::Io { source, .. }
            | Self::FileOpen { source, .. }
            | Self::FileMetadata { source, .. } => source,
            mismatch @ Self::LengthMismatch { .. } => Error::new(ErrorKind::UnexpectedEof, mismatch),
            other => Error::new(ErrorKind::Other, other),
        }
    }
}
