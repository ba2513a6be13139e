//! Assembles parts into a `multipart/form-data` body with a precomputed length.

use bytes::Bytes;
use reqwest::header::{HeaderMap, CONTENT_TYPE};
use tracing::{debug, trace};

use crate::{
    body::{Body, BodyReader, BodyRead},
    boundary::Boundary,
    error::MultipartError,
    models::{ComposerConfig, Part, PartBody},
    stream::BodyStream,
};

/// Media type of the composed body
const MULTIPART_FORM_DATA: &str = "multipart/form-data";
/// Line break closing each part body
const CRLF: &[u8] = b"\r\n";

/// Computes the exact length of the body `parts` produce with `boundary`.
///
/// Each part contributes its header block, its payload and a trailing CRLF; the
/// closing delimiter follows the last part.
///
/// # Errors
///
/// Returns [`MultipartError::LengthUnknown`] as soon as a part cannot report its
/// length, or the metadata error of an unreadable file part.
pub fn compute_length(parts: &[Part], boundary: &Boundary) -> Result<u64, MultipartError> {
    let mut total = 0u64;
    for part in parts {
        total += part.header_bytes(boundary).len() as u64;
        total += part.body_length()?;
        total += CRLF.len() as u64;
    }
    Ok(total + boundary.closing().len() as u64)
}

/// Header bytes and body length of one part, captured when the composer is built.
#[derive(Debug)]
struct PartLayout {
    header: Bytes,
    body_len: Option<u64>,
}

/// Where the streaming cursor is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Header(usize),
    Body(usize),
    PartEnd(usize),
    Closing,
    Done,
}

/// Streams a fixed list of parts as one `multipart/form-data` body.
///
/// Everything but the cursor is fixed at construction: the boundary, the rendered
/// part headers and the body lengths. Driving the composer through [`Body::read`]
/// yields exactly [`Body::content_length`] bytes. At most one part body (and so at
/// most one file handle) is open at a time.
#[derive(Debug)]
pub struct MultipartComposer {
    parts: Vec<Part>,
    layout: Vec<PartLayout>,
    boundary: Boundary,
    content_type: String,
    content_length: Option<u64>,
    closing: Bytes,
    phase: Phase,
    offset: usize,
    current: Option<PartBody>,
    pending_error: Option<MultipartError>,
    emitted: u64,
}

impl MultipartComposer {
    /// Creates a composer with a freshly generated boundary.
    ///
    /// # Errors
    ///
    /// Returns an error if the size of a file part cannot be read.
    pub fn new(parts: Vec<Part>) -> Result<Self, MultipartError> {
        Self::with_boundary(parts, Boundary::generate())
    }

    /// Creates a composer using `boundary`.
    pub fn with_boundary(parts: Vec<Part>, boundary: Boundary) -> Result<Self, MultipartError> {
        let content_type = format!("{}; boundary={}", MULTIPART_FORM_DATA, boundary);
        Self::build(parts, boundary, content_type)
    }

    /// Creates a composer from a configuration, using its fixed boundary if set.
    pub fn with_config(parts: Vec<Part>, config: &ComposerConfig) -> Result<Self, MultipartError> {
        let boundary = match &config.boundary {
            Some(token) => Boundary::new(token.as_str())?,
            None => Boundary::generate(),
        };
        Self::with_boundary(parts, boundary)
    }

    /// Creates a composer that honours the `Content-Type` of an outgoing request.
    ///
    /// A boundary already present in that header is reused together with the header
    /// value itself; a multipart type without one gets a generated boundary appended.
    /// Without a `Content-Type` the body is `multipart/form-data`.
    pub fn from_request_headers(
        parts: Vec<Part>,
        headers: &HeaderMap,
    ) -> Result<Self, MultipartError> {
        let Some(value) = headers.get(CONTENT_TYPE) else {
            return Self::new(parts);
        };
        let value = value
            .to_str()
            .map_err(|e| MultipartError::new(format!("Invalid Content-Type header: {}", e)))?
            .trim()
            .to_string();

        match Boundary::from_content_type(&value)? {
            Some(boundary) => Self::build(parts, boundary, value),
            None => {
                let boundary = Boundary::generate();
                let content_type = format!("{}; boundary={}", value, boundary);
                Self::build(parts, boundary, content_type)
            }
        }
    }

    fn build(
        parts: Vec<Part>,
        boundary: Boundary,
        content_type: String,
    ) -> Result<Self, MultipartError> {
        let mut layout = Vec::with_capacity(parts.len());
        for part in &parts {
            let body_len = match part.body_length() {
                Ok(len) => Some(len),
                Err(MultipartError::LengthUnknown { .. }) => None,
                Err(e) => return Err(e),
            };
            layout.push(PartLayout {
                header: part.header_bytes(&boundary),
                body_len,
            });
        }

        let closing = boundary.closing();
        let content_length = layout.iter().try_fold(closing.len() as u64, |total, entry| {
            entry
                .body_len
                .map(|len| total + entry.header.len() as u64 + len + CRLF.len() as u64)
        });
        debug!(
            parts = parts.len(),
            boundary = %boundary,
            content_length = ?content_length,
            "built multipart composer"
        );

        let phase = start_phase(&layout);
        Ok(Self {
            parts,
            layout,
            boundary,
            content_type,
            content_length,
            closing,
            phase,
            offset: 0,
            current: None,
            pending_error: None,
            emitted: 0,
        })
    }

    fn next_phase(&self, index: usize) -> Phase {
        if index + 1 < self.parts.len() {
            Phase::Header(index + 1)
        } else {
            Phase::Closing
        }
    }

    /// The boundary separating parts.
    pub fn boundary(&self) -> &Boundary {
        &self.boundary
    }

    /// The parts in body order.
    pub fn parts(&self) -> &[Part] {
        &self.parts
    }

    /// Total bytes handed out by `read` so far.
    pub fn bytes_emitted(&self) -> u64 {
        self.emitted
    }

    /// Whether the end of the body has been reached or the composer was closed.
    pub fn is_done(&self) -> bool {
        self.phase == Phase::Done
    }

    /// Releases any open part body and rewinds to the start of the body.
    ///
    /// Stream parts cannot be replayed; a second pass over one fails with
    /// [`MultipartError::StreamConsumed`] when streaming reaches it.
    pub fn reset(&mut self) {
        self.release_current();
        self.phase = start_phase(&self.layout);
        self.offset = 0;
        self.pending_error = None;
        self.emitted = 0;
    }

    /// Wraps the composer in a [`std::io::Read`] adapter.
    pub fn into_reader(self) -> BodyReader<Self> {
        BodyReader::new(self)
    }

    /// Streams the composer on a blocking task, `chunk_size` bytes at a time.
    ///
    /// Must be called from within a tokio runtime.
    pub fn into_stream(self, config: &ComposerConfig) -> BodyStream {
        BodyStream::spawn(self, config.chunk_size, config.channel_buffer)
    }

    fn release_current(&mut self) {
        if let Some(body) = self.current.take() {
            body.close();
        }
    }

    fn unknown_part(&self) -> String {
        self.layout
            .iter()
            .zip(&self.parts)
            .find(|(entry, _)| entry.body_len.is_none())
            .map(|(_, part)| part.name().to_string())
            .unwrap_or_default()
    }

    /// Fills `buf` from the cursor onwards, counting copied bytes in `written`.
    fn fill(&mut self, buf: &mut [u8], written: &mut usize) -> Result<(), MultipartError> {
        while *written < buf.len() {
            match self.phase {
                Phase::Header(index) => {
                    let header = &self.layout[index].header;
                    *written += copy_from(header, &mut self.offset, &mut buf[*written..]);
                    if self.offset == header.len() {
                        self.offset = 0;
                        self.phase = Phase::Body(index);
                    }
                }
                Phase::Body(index) => {
                    if self.current.is_none() {
                        self.current = Some(self.open_part(index)?);
                    }
                    let read = match self.current.as_mut() {
                        Some(body) => body.read(&mut buf[*written..])?,
                        None => 0,
                    };
                    if read == 0 {
                        self.release_current();
                        self.phase = Phase::PartEnd(index);
                    }
                    *written += read;
                }
                Phase::PartEnd(index) => {
                    *written += copy_from(CRLF, &mut self.offset, &mut buf[*written..]);
                    if self.offset == CRLF.len() {
                        self.offset = 0;
                        self.phase = self.next_phase(index);
                    }
                }
                Phase::Closing => {
                    *written += copy_from(&self.closing, &mut self.offset, &mut buf[*written..]);
                    if self.offset == self.closing.len() {
                        self.offset = 0;
                        self.phase = Phase::Done;
                    }
                }
                Phase::Done => break,
            }
        }

        Ok(())
    }

    fn open_part(&mut self, index: usize) -> Result<PartBody, MultipartError> {
        let body = self.parts[index].open_body()?;
        debug!(part = self.parts[index].name(), index, "opened part body");
        Ok(match self.layout[index].body_len {
            Some(len) => body.expect_len(len),
            None => body,
        })
    }
}

fn start_phase(layout: &[PartLayout]) -> Phase {
    if layout.is_empty() {
        Phase::Closing
    } else {
        Phase::Header(0)
    }
}

fn copy_from(src: &[u8], offset: &mut usize, dst: &mut [u8]) -> usize {
    let n = (src.len() - *offset).min(dst.len());
    dst[..n].copy_from_slice(&src[*offset..*offset + n]);
    *offset += n;
    n
}

impl Body for MultipartComposer {
    fn content_type(&self) -> &str {
        &self.content_type
    }

    fn content_length(&self) -> Result<u64, MultipartError> {
        self.content_length
            .ok_or_else(|| MultipartError::LengthUnknown {
                part: self.unknown_part(),
            })
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<BodyRead, MultipartError> {
        if let Some(error) = self.pending_error.take() {
            return Err(error);
        }
        if self.phase == Phase::Done {
            return Ok(BodyRead::End);
        }

        let mut written = 0;
        if let Err(error) = self.fill(buf, &mut written) {
            if written == 0 {
                return Err(error);
            }
            // Bytes already copied in this call are handed out first.
            self.pending_error = Some(error);
        }
        self.emitted += written as u64;
        trace!(written, emitted = self.emitted, "read multipart body");

        if written == 0 && self.phase == Phase::Done {
            return Ok(BodyRead::End);
        }
        if self.phase == Phase::Done {
            if let Some(expected) = self.content_length {
                debug_assert_eq!(
                    self.emitted, expected,
                    "multipart body length differs from its declared content length"
                );
            }
        }
        Ok(BodyRead::Data(written))
    }

    fn close(&mut self) {
        // A deferred error is dropped with the rest of the body.
        self.pending_error = None;
        if self.phase == Phase::Done && self.current.is_none() {
            return;
        }
        self.release_current();
        self.phase = Phase::Done;
        debug!(emitted = self.emitted, "closed multipart composer");
    }
}

#[cfg(test)]
mod tests {
    use std::io::{self, Cursor, Read};

    use reqwest::header::HeaderValue;

    use super::*;
    use crate::models::{ByteArrayPart, PartOptions, StreamPart, StringPart};

    fn boundary() -> Boundary {
        Boundary::new("B").unwrap()
    }

    fn drain(composer: &mut MultipartComposer, capacity: usize) -> Vec<u8> {
        let mut buf = vec![0u8; capacity];
        let mut out = Vec::new();
        while let BodyRead::Data(n) = composer.read(&mut buf).unwrap() {
            assert!(n > 0);
            out.extend_from_slice(&buf[..n]);
        }
        out
    }

    struct FailingReader;

    impl Read for FailingReader {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::Other, "boom"))
        }
    }

    #[test]
    fn produces_exact_wire_format() {
        let parts = vec![
            StringPart::new("a", "xy").unwrap().into(),
            ByteArrayPart::new("b", "123")
                .with_file_name("f.bin")
                .without_transfer_encoding()
                .into(),
        ];
        let mut composer = MultipartComposer::with_boundary(parts, boundary()).unwrap();

        let expected = "--B\r\n\
                        Content-Disposition: form-data; name=\"a\"\r\n\
                        Content-Type: text/plain; charset=UTF-8\r\n\
                        Content-Transfer-Encoding: 8bit\r\n\
                        \r\n\
                        xy\r\n\
                        --B\r\n\
                        Content-Disposition: form-data; name=\"b\"; filename=\"f.bin\"\r\n\
                        Content-Type: application/octet-stream\r\n\
                        \r\n\
                        123\r\n\
                        --B--\r\n";

        assert_eq!(composer.content_type(), "multipart/form-data; boundary=B");
        assert_eq!(composer.content_length().unwrap(), expected.len() as u64);
        assert_eq!(drain(&mut composer, 7), expected.as_bytes());
        assert_eq!(composer.bytes_emitted(), expected.len() as u64);
    }

    #[test]
    fn empty_part_list_is_only_the_closing_delimiter() {
        let mut composer = MultipartComposer::with_boundary(Vec::new(), boundary()).unwrap();
        assert_eq!(composer.content_length().unwrap(), 7);
        assert_eq!(compute_length(&[], &boundary()).unwrap(), 7);
        assert_eq!(drain(&mut composer, 1), b"--B--\r\n");
    }

    #[test]
    fn end_of_body_is_terminal() {
        let parts = vec![StringPart::new("a", "b").unwrap().into()];
        let mut composer = MultipartComposer::with_boundary(parts, boundary()).unwrap();
        drain(&mut composer, 4096);

        let mut buf = [0u8; 16];
        for _ in 0..3 {
            assert_eq!(composer.read(&mut buf).unwrap(), BodyRead::End);
        }
        assert!(composer.is_done());
    }

    #[test]
    fn close_before_reading_ends_the_body() {
        let parts = vec![StringPart::new("a", "b").unwrap().into()];
        let mut composer = MultipartComposer::with_boundary(parts, boundary()).unwrap();
        composer.close();
        composer.close();

        let mut buf = [0u8; 16];
        assert_eq!(composer.read(&mut buf).unwrap(), BodyRead::End);
        assert_eq!(composer.bytes_emitted(), 0);
    }

    #[test]
    fn close_mid_part_releases_the_open_body() {
        let parts = vec![ByteArrayPart::new("a", vec![7u8; 100]).into()];
        let mut composer = MultipartComposer::with_boundary(parts, boundary()).unwrap();
        let header_len = composer.layout[0].header.len();

        let mut buf = vec![0u8; header_len + 10];
        assert_eq!(composer.read(&mut buf).unwrap(), BodyRead::Data(header_len + 10));
        assert!(composer.current.is_some());

        composer.close();
        assert!(composer.current.is_none());
        assert_eq!(composer.read(&mut buf).unwrap(), BodyRead::End);
    }

    #[test]
    fn zero_capacity_buffer_makes_no_progress() {
        let parts = vec![StringPart::new("a", "b").unwrap().into()];
        let mut composer = MultipartComposer::with_boundary(parts, boundary()).unwrap();
        let mut empty: [u8; 0] = [];
        assert_eq!(composer.read(&mut empty).unwrap(), BodyRead::Data(0));
        assert_eq!(composer.bytes_emitted(), 0);
    }

    #[test]
    fn reset_replays_memory_parts() {
        let parts = vec![
            StringPart::new("a", "b").unwrap().into(),
            ByteArrayPart::new("c", "d").into(),
        ];
        let mut composer = MultipartComposer::with_boundary(parts, boundary()).unwrap();
        let first = drain(&mut composer, 3);
        composer.reset();
        let second = drain(&mut composer, 64);
        assert_eq!(first, second);
    }

    #[test]
    fn reset_cannot_replay_a_stream_part() {
        let parts = vec![StreamPart::new("s", Cursor::new(b"abc".to_vec()))
            .with_length(3)
            .into()];
        let mut composer = MultipartComposer::with_boundary(parts, boundary()).unwrap();
        drain(&mut composer, 64);
        composer.reset();

        let mut buf = [0u8; 4096];
        // The header comes out first, the failure to reopen the stream on the next call.
        assert!(matches!(composer.read(&mut buf), Ok(BodyRead::Data(n)) if n > 0));
        assert!(matches!(
            composer.read(&mut buf),
            Err(MultipartError::StreamConsumed { .. })
        ));
    }

    #[test]
    fn unknown_length_part_streams_but_has_no_content_length() {
        let parts = vec![
            StringPart::new("a", "b").unwrap().into(),
            StreamPart::new("s", Cursor::new(b"payload".to_vec())).into(),
        ];
        let mut composer = MultipartComposer::with_boundary(parts, boundary()).unwrap();

        assert!(matches!(
            composer.content_length(),
            Err(MultipartError::LengthUnknown { part }) if part == "s"
        ));
        assert!(matches!(
            compute_length(composer.parts(), &boundary()),
            Err(MultipartError::LengthUnknown { .. })
        ));

        let body = drain(&mut composer, 5);
        let text = String::from_utf8(body).unwrap();
        assert!(text.contains("\r\n\r\npayload\r\n--B--\r\n"));
    }

    #[test]
    fn io_error_is_reported_after_the_bytes_already_copied() {
        let parts = vec![StreamPart::new("s", FailingReader).with_length(5).into()];
        let mut composer = MultipartComposer::with_boundary(parts, boundary()).unwrap();
        let header_len = composer.layout[0].header.len();

        let mut buf = [0u8; 4096];
        assert_eq!(composer.read(&mut buf).unwrap(), BodyRead::Data(header_len));
        assert!(matches!(
            composer.read(&mut buf),
            Err(MultipartError::Io { part, .. }) if part == "s"
        ));

        composer.close();
        assert_eq!(composer.read(&mut buf).unwrap(), BodyRead::End);
    }

    #[test]
    fn close_discards_a_deferred_error() {
        let parts = vec![StreamPart::new("s", FailingReader).with_length(5).into()];
        let mut composer = MultipartComposer::with_boundary(parts, boundary()).unwrap();
        let header_len = composer.layout[0].header.len();

        let mut buf = [0u8; 4096];
        assert_eq!(composer.read(&mut buf).unwrap(), BodyRead::Data(header_len));
        assert!(composer.pending_error.is_some());

        composer.close();
        assert!(composer.pending_error.is_none());
        assert_eq!(composer.read(&mut buf).unwrap(), BodyRead::End);
        assert_eq!(composer.read(&mut buf).unwrap(), BodyRead::End);
    }

    #[test]
    fn reuses_boundary_from_request_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("multipart/form-data; boundary=fromHeader"),
        );
        let composer = MultipartComposer::from_request_headers(Vec::new(), &headers).unwrap();
        assert_eq!(composer.boundary().as_str(), "fromHeader");
        assert_eq!(
            composer.content_type(),
            "multipart/form-data; boundary=fromHeader"
        );
    }

    #[test]
    fn appends_boundary_to_request_content_type() {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("multipart/related"));
        let composer = MultipartComposer::from_request_headers(Vec::new(), &headers).unwrap();
        assert_eq!(
            composer.content_type(),
            format!("multipart/related; boundary={}", composer.boundary())
        );

        let composer = MultipartComposer::from_request_headers(Vec::new(), &HeaderMap::new())
            .unwrap();
        assert!(composer
            .content_type()
            .starts_with("multipart/form-data; boundary="));
    }

    #[test]
    fn config_boundary_is_validated() {
        let config = ComposerConfig::builder().boundary("").build();
        assert!(matches!(
            MultipartComposer::with_config(Vec::new(), &config),
            Err(MultipartError::InvalidBoundary(_))
        ));

        let config = ComposerConfig::builder().boundary("cfg").build();
        let composer = MultipartComposer::with_config(Vec::new(), &config).unwrap();
        assert_eq!(composer.boundary().as_str(), "cfg");
    }
}
