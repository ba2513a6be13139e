use std::{fmt, io::Read};

use super::{
    part::{PartMeta, DEFAULT_BINARY_CONTENT_TYPE, DEFAULT_BINARY_TRANSFER_ENCODING},
    sealed::Sealed,
    PartBody,
};
use crate::error::MultipartError;

/// A part whose payload is pulled from an arbitrary reader.
///
/// The reader can be consumed once. Its length is unknown unless declared with
/// [`StreamPart::with_length`], in which case exactly that many bytes are sent.
pub struct StreamPart {
    pub(crate) meta: PartMeta,
    reader: Option<Box<dyn Read + Send>>,
    pub(crate) length: Option<u64>,
    pub(crate) file_name: Option<String>,
}

impl StreamPart {
    /// Creates a stream part of unknown length.
    pub fn new(name: impl Into<String>, reader: impl Read + Send + 'static) -> Self {
        Self {
            meta: PartMeta::new(
                name,
                DEFAULT_BINARY_CONTENT_TYPE,
                DEFAULT_BINARY_TRANSFER_ENCODING,
            ),
            reader: Some(Box::new(reader)),
            length: None,
            file_name: None,
        }
    }

    /// Declares the exact number of bytes the reader will produce.
    pub fn with_length(mut self, length: u64) -> Self {
        self.length = Some(length);
        self
    }

    /// Sets the `filename` attribute of the `Content-Disposition` header.
    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = Some(file_name.into());
        self
    }

    pub(crate) fn open(&mut self) -> Result<PartBody, MultipartError> {
        let reader = self
            .reader
            .take()
            .ok_or_else(|| MultipartError::StreamConsumed {
                part: self.meta.name.clone(),
            })?;
        Ok(PartBody::stream(&self.meta.name, reader, self.length))
    }
}

impl fmt::Debug for StreamPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamPart")
            .field("meta", &self.meta)
            .field("consumed", &self.reader.is_none())
            .field("length", &self.length)
            .field("file_name", &self.file_name)
            .finish()
    }
}

impl Sealed for StreamPart {
    fn meta_mut(&mut self) -> &mut PartMeta {
        &mut self.meta
    }
}
