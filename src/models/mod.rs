//! Data structures describing the parts of a multipart body.

mod byte_array_part;
mod charset;
mod config;
mod file_part;
mod part;
mod part_body;
mod stream_part;
mod string_part;

pub use byte_array_part::ByteArrayPart;
pub use charset::Charset;
pub use config::{ComposerConfig, DEFAULT_CHANNEL_BUFFER_SIZE, DEFAULT_CHUNK_SIZE};
pub use file_part::FilePart;
pub use part::{Part, PartMeta, PartOptions};
pub use part_body::PartBody;
pub use stream_part::StreamPart;
pub use string_part::StringPart;

mod sealed {
    use super::{Charset, PartMeta};

    /// Restricts [`super::PartOptions`] to the part variants of this crate.
    pub trait Sealed {
        /// Mutable access to the shared header metadata.
        fn meta_mut(&mut self) -> &mut PartMeta;

        /// Replaces the charset; string parts re-encode their value here.
        fn set_charset(&mut self, charset: Option<Charset>) {
            self.meta_mut().charset = charset;
        }
    }
}
