use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use crate::error::MultipartError;

/// Default number of bytes pulled from a body per read when streaming
pub const DEFAULT_CHUNK_SIZE: usize = 8192;
/// Default number of chunks buffered between the body reader and the transport
pub const DEFAULT_CHANNEL_BUFFER_SIZE: usize = 16;

/// Configuration for building and streaming multipart bodies
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TypedBuilder)]
#[builder(doc)]
pub struct ComposerConfig {
    /// Fixed boundary token; a random one is generated when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(strip_option, into))]
    pub boundary: Option<String>,

    /// Read size used when streaming a body to the transport
    #[serde(default = "default_chunk_size")]
    #[builder(default = DEFAULT_CHUNK_SIZE)]
    pub chunk_size: usize,

    /// Number of chunks buffered ahead of the transport
    #[serde(default = "default_channel_buffer")]
    #[builder(default = DEFAULT_CHANNEL_BUFFER_SIZE)]
    pub channel_buffer: usize,
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

fn default_channel_buffer() -> usize {
    DEFAULT_CHANNEL_BUFFER_SIZE
}

impl Default for ComposerConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl ComposerConfig {
    /// Creates a configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// * `MULTIPART_BOUNDARY` - Optional fixed boundary token
    /// * `MULTIPART_CHUNK_SIZE` - Optional streaming read size in bytes
    ///
    /// # Errors
    ///
    /// Returns an error if `MULTIPART_CHUNK_SIZE` is not a positive integer.
    pub fn from_env() -> Result<Self, MultipartError> {
        let chunk_size = match std::env::var("MULTIPART_CHUNK_SIZE") {
            Ok(value) => parse_chunk_size(&value)?,
            Err(_) => DEFAULT_CHUNK_SIZE,
        };
        Ok(Self {
            boundary: std::env::var("MULTIPART_BOUNDARY").ok(),
            chunk_size,
            ..Self::default()
        })
    }
}

fn parse_chunk_size(value: &str) -> Result<usize, MultipartError> {
    match value.trim().parse::<usize>() {
        Ok(0) | Err(_) => Err(MultipartError::Config(format!(
            "MULTIPART_CHUNK_SIZE must be a positive integer, got '{}'",
            value
        ))),
        Ok(size) => Ok(size),
    }
}
