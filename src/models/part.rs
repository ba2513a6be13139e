//! The closed set of part variants and their shared header model.

use bytes::Bytes;

use super::{
    sealed::Sealed, ByteArrayPart, Charset, FilePart, PartBody, StreamPart, StringPart,
};
use crate::{boundary::Boundary, error::MultipartError};

/// Content type used by binary and file parts unless overridden.
pub(crate) const DEFAULT_BINARY_CONTENT_TYPE: &str = "application/octet-stream";
/// Content type used by string parts unless overridden.
pub(crate) const DEFAULT_TEXT_CONTENT_TYPE: &str = "text/plain";
/// Transfer encoding used by binary and file parts unless overridden.
pub(crate) const DEFAULT_BINARY_TRANSFER_ENCODING: &str = "binary";
/// Transfer encoding used by string parts unless overridden.
pub(crate) const DEFAULT_TEXT_TRANSFER_ENCODING: &str = "8bit";

/// Header metadata shared by every part variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartMeta {
    pub(crate) name: String,
    pub(crate) content_type: String,
    pub(crate) charset: Option<Charset>,
    pub(crate) transfer_encoding: Option<String>,
    pub(crate) content_id: Option<String>,
    pub(crate) custom_headers: Vec<(String, String)>,
}

impl PartMeta {
    pub(crate) fn new(
        name: impl Into<String>,
        content_type: &str,
        transfer_encoding: &str,
    ) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.to_string(),
            charset: None,
            transfer_encoding: Some(transfer_encoding.to_string()),
            content_id: None,
            custom_headers: Vec::new(),
        }
    }

    /// Renders the header block of a part, from the boundary delimiter down to the blank line.
    pub(crate) fn render(&self, boundary: &Boundary, file_name: Option<&str>) -> Bytes {
        let mut header = boundary.delimiter();

        header.push_str("Content-Disposition: form-data; name=\"");
        header.push_str(&self.name);
        header.push('"');
        if let Some(file_name) = file_name {
            header.push_str("; filename=\"");
            header.push_str(file_name);
            header.push('"');
        }
        header.push_str("\r\n");

        header.push_str("Content-Type: ");
        header.push_str(&self.content_type);
        if let Some(charset) = self.charset {
            header.push_str("; charset=");
            header.push_str(charset.name());
        }
        header.push_str("\r\n");

        for (name, value) in &self.custom_headers {
            header.push_str(name);
            header.push_str(": ");
            header.push_str(value);
            header.push_str("\r\n");
        }

        if let Some(encoding) = &self.transfer_encoding {
            header.push_str("Content-Transfer-Encoding: ");
            header.push_str(encoding);
            header.push_str("\r\n");
        }

        if let Some(id) = &self.content_id {
            header.push_str("Content-ID: ");
            header.push_str(id);
            header.push_str("\r\n");
        }

        header.push_str("\r\n");
        Bytes::from(header)
    }
}

/// Chained setters for the header metadata every part variant carries.
pub trait PartOptions: Sealed + Sized {
    /// Overrides the content type.
    fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.meta_mut().content_type = content_type.into();
        self
    }

    /// Sets the charset emitted in the `Content-Type` header.
    ///
    /// For string parts this is also the encoding of the value.
    fn with_charset(mut self, charset: Charset) -> Self {
        self.set_charset(Some(charset));
        self
    }

    /// Removes the `charset` parameter from the `Content-Type` header.
    fn without_charset(mut self) -> Self {
        self.set_charset(None);
        self
    }

    /// Sets the `Content-Transfer-Encoding` header.
    fn with_transfer_encoding(mut self, encoding: impl Into<String>) -> Self {
        self.meta_mut().transfer_encoding = Some(encoding.into());
        self
    }

    /// Suppresses the `Content-Transfer-Encoding` header.
    fn without_transfer_encoding(mut self) -> Self {
        self.meta_mut().transfer_encoding = None;
        self
    }

    /// Sets the `Content-ID` header.
    fn with_content_id(mut self, id: impl Into<String>) -> Self {
        self.meta_mut().content_id = Some(id.into());
        self
    }

    /// Appends a custom header line, emitted after `Content-Type`.
    fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.meta_mut()
            .custom_headers
            .push((name.into(), value.into()));
        self
    }
}

impl<T: Sealed> PartOptions for T {}

/// One named field of a multipart body.
#[derive(Debug)]
pub enum Part {
    /// An in-memory byte payload
    Bytes(ByteArrayPart),
    /// A string payload encoded with a charset
    String(StringPart),
    /// A payload read from a file
    File(FilePart),
    /// A payload pulled from an arbitrary reader
    Stream(StreamPart),
}

impl Part {
    fn meta(&self) -> &PartMeta {
        match self {
            Self::Bytes(part) => &part.meta,
            Self::String(part) => &part.meta,
            Self::File(part) => &part.meta,
            Self::Stream(part) => &part.meta,
        }
    }

    /// Name of the form field.
    pub fn name(&self) -> &str {
        &self.meta().name
    }

    /// Content type of the payload.
    pub fn content_type(&self) -> &str {
        &self.meta().content_type
    }

    /// Charset emitted in the `Content-Type` header, if any.
    pub fn charset(&self) -> Option<Charset> {
        self.meta().charset
    }

    /// Value of the `Content-Transfer-Encoding` header, if any.
    pub fn transfer_encoding(&self) -> Option<&str> {
        self.meta().transfer_encoding.as_deref()
    }

    /// Value of the `Content-ID` header, if any.
    pub fn content_id(&self) -> Option<&str> {
        self.meta().content_id.as_deref()
    }

    /// Custom header lines in insertion order.
    pub fn custom_headers(&self) -> &[(String, String)] {
        &self.meta().custom_headers
    }

    /// The `filename` attribute of the `Content-Disposition` header, if any.
    pub fn file_name(&self) -> Option<&str> {
        match self {
            Self::Bytes(part) => part.file_name.as_deref(),
            Self::String(_) => None,
            Self::File(part) => part.file_name.as_deref(),
            Self::Stream(part) => part.file_name.as_deref(),
        }
    }

    /// Renders this part's header block for `boundary`.
    ///
    /// The result depends only on the part metadata and the boundary.
    pub fn header_bytes(&self, boundary: &Boundary) -> Bytes {
        self.meta().render(boundary, self.file_name())
    }

    /// Number of bytes [`Part::open_body`] will yield.
    ///
    /// # Errors
    ///
    /// Returns [`MultipartError::LengthUnknown`] for a stream part without a declared
    /// length, or [`MultipartError::FileMetadata`] if a file's size cannot be read.
    pub fn body_length(&self) -> Result<u64, MultipartError> {
        match self {
            Self::Bytes(part) => Ok(part.data.len() as u64),
            Self::String(part) => Ok(part.encoded.len() as u64),
            Self::File(part) => part.size(),
            Self::Stream(part) => part.length.ok_or_else(|| MultipartError::LengthUnknown {
                part: part.meta.name.clone(),
            }),
        }
    }

    /// Opens the payload of this part for a single pass.
    ///
    /// Memory-backed parts hand out a shared view of their bytes; file parts open a
    /// read handle that lives until the returned body is closed or dropped.
    pub fn open_body(&mut self) -> Result<PartBody, MultipartError> {
        match self {
            Self::Bytes(part) => Ok(PartBody::memory(&part.meta.name, part.data.clone())),
            Self::String(part) => Ok(PartBody::memory(&part.meta.name, part.encoded.clone())),
            Self::File(part) => part.open(),
            Self::Stream(part) => part.open(),
        }
    }
}

impl From<ByteArrayPart> for Part {
    fn from(part: ByteArrayPart) -> Self {
        Self::Bytes(part)
    }
}

impl From<StringPart> for Part {
    fn from(part: StringPart) -> Self {
        Self::String(part)
    }
}

impl From<FilePart> for Part {
    fn from(part: FilePart) -> Self {
        Self::File(part)
    }
}

impl From<StreamPart> for Part {
    fn from(part: StreamPart) -> Self {
        Self::Stream(part)
    }
}
