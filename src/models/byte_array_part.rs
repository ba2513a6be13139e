use bytes::Bytes;

use super::{
    part::{PartMeta, DEFAULT_BINARY_CONTENT_TYPE, DEFAULT_BINARY_TRANSFER_ENCODING},
    sealed::Sealed,
};

/// A part whose payload is an immutable in-memory byte sequence.
#[derive(Debug, Clone)]
pub struct ByteArrayPart {
    pub(crate) meta: PartMeta,
    pub(crate) data: Bytes,
    pub(crate) file_name: Option<String>,
}

impl ByteArrayPart {
    /// Creates a byte-array part with the `application/octet-stream` content type.
    ///
    /// # Arguments
    ///
    /// * `name` - The form field name
    /// * `data` - The payload
    pub fn new(name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            meta: PartMeta::new(
                name,
                DEFAULT_BINARY_CONTENT_TYPE,
                DEFAULT_BINARY_TRANSFER_ENCODING,
            ),
            data: data.into(),
            file_name: None,
        }
    }

    /// Sets the `filename` attribute of the `Content-Disposition` header.
    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = Some(file_name.into());
        self
    }

    /// The payload.
    pub fn data(&self) -> &Bytes {
        &self.data
    }
}

impl Sealed for ByteArrayPart {
    fn meta_mut(&mut self) -> &mut PartMeta {
        &mut self.meta
    }
}
