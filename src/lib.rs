#![deny(missing_docs)]

//! A streaming `multipart/form-data` body composer.
//!
//! Parts held in memory, given as strings or read from files are laid out behind a
//! boundary so that the exact body length is known before the first byte is
//! produced. The body is then pulled chunk by chunk, opening at most one file at a
//! time, and always yields exactly the advertised number of bytes.
//!
//! ```no_run
//! use multipart_composer::{
//!     Body, BodyRead, ByteArrayPart, FilePart, MultipartComposer, PartOptions, StringPart,
//! };
//!
//! # fn main() -> Result<(), multipart_composer::MultipartError> {
//! let mut composer = MultipartComposer::new(vec![
//!     FilePart::new("filePart", "report.txt").into(),
//!     ByteArrayPart::new("baPart", "testMultiPart")
//!         .with_content_type("application/test")
//!         .with_file_name("fileName")
//!         .into(),
//!     StringPart::new("stringPart", "testString")?.into(),
//! ])?;
//!
//! let content_length = composer.content_length()?;
//! let mut buf = [0u8; 8192];
//! let mut total = 0;
//! while let BodyRead::Data(n) = composer.read(&mut buf)? {
//!     total += n as u64;
//! }
//! composer.close();
//! assert_eq!(total, content_length);
//! # Ok(())
//! # }
//! ```

pub mod body;
pub mod boundary;
pub mod client;
pub mod composer;
pub mod error;
pub mod models;
pub mod stream;

pub use body::{Body, BodyRead, BodyReader};
pub use boundary::Boundary;
pub use client::MultipartClient;
pub use composer::{compute_length, MultipartComposer};
pub use error::MultipartError;
pub use models::{
    ByteArrayPart, Charset, ComposerConfig, FilePart, Part, PartOptions, StreamPart, StringPart,
};
pub use stream::BodyStream;
