use bytes::Bytes;

use super::{
    part::{PartMeta, DEFAULT_TEXT_CONTENT_TYPE, DEFAULT_TEXT_TRANSFER_ENCODING},
    sealed::Sealed,
    Charset,
};
use crate::error::MultipartError;

/// A part whose payload is a string encoded with a charset.
///
/// The encoded bytes are computed once from the value and the charset, so the
/// reported length always matches what is streamed.
#[derive(Debug, Clone)]
pub struct StringPart {
    pub(crate) meta: PartMeta,
    value: String,
    pub(crate) encoded: Bytes,
}

impl StringPart {
    /// Creates a UTF-8 `text/plain` part.
    ///
    /// # Errors
    ///
    /// Returns [`MultipartError::InvalidPart`] if the value contains a NUL character.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Result<Self, MultipartError> {
        let value = value.into();
        let mut meta = PartMeta::new(
            name,
            DEFAULT_TEXT_CONTENT_TYPE,
            DEFAULT_TEXT_TRANSFER_ENCODING,
        );
        if value.contains('\0') {
            return Err(MultipartError::InvalidPart(format!(
                "string part '{}' contains a NUL character",
                meta.name
            )));
        }
        meta.charset = Some(Charset::Utf8);
        let encoded = Bytes::from(Charset::Utf8.encode(&value));

        Ok(Self {
            meta,
            value,
            encoded,
        })
    }

    /// The unencoded value.
    pub fn value(&self) -> &str {
        &self.value
    }
}

impl Sealed for StringPart {
    fn meta_mut(&mut self) -> &mut PartMeta {
        &mut self.meta
    }

    fn set_charset(&mut self, charset: Option<Charset>) {
        self.meta.charset = charset;
        // Without a declared charset the value is still written as UTF-8.
        self.encoded = Bytes::from(charset.unwrap_or(Charset::Utf8).encode(&self.value));
    }
}
