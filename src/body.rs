//! The streaming body capability handed to a transport.

use std::io;

use crate::error::MultipartError;

/// Outcome of a single [`Body::read`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyRead {
    /// This many bytes were written to the buffer.
    Data(usize),
    /// The body is complete; every later call returns `End` as well.
    End,
}

/// A pull-based request body with a declared length.
///
/// A body is driven by one consumer at a time: `read` is called repeatedly until
/// it returns [`BodyRead::End`], then `close` releases whatever is still held.
pub trait Body: Send {
    /// Value for the `Content-Type` header.
    fn content_type(&self) -> &str;

    /// Exact number of bytes the body produces, for the `Content-Length` header.
    fn content_length(&self) -> Result<u64, MultipartError>;

    /// Writes as many bytes as fit into `buf`.
    fn read(&mut self, buf: &mut [u8]) -> Result<BodyRead, MultipartError>;

    /// Releases any open resources. Reads after `close` return [`BodyRead::End`].
    fn close(&mut self);
}

/// Adapts a [`Body`] to [`std::io::Read`].
///
/// The body is closed once it reports its end and again when the reader is dropped.
#[derive(Debug)]
pub struct BodyReader<B: Body> {
    body: B,
}

impl<B: Body> BodyReader<B> {
    /// Wraps `body`.
    pub fn new(body: B) -> Self {
        Self { body }
    }

    /// Returns the wrapped body.
    pub fn get_ref(&self) -> &B {
        &self.body
    }
}

impl<B: Body> io::Read for BodyReader<B> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        match self.body.read(buf).map_err(MultipartError::into_io)? {
            BodyRead::Data(n) => Ok(n),
            BodyRead::End => {
                self.body.close();
                Ok(0)
            }
        }
    }
}

impl<B: Body> Drop for BodyReader<B> {
    fn drop(&mut self) {
        self.body.close();
    }
}
