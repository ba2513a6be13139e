use std::{
    fmt,
    fs::File,
    io::{self, Read},
};

use bytes::Bytes;
use tracing::debug;

use crate::error::MultipartError;

enum Source {
    Memory(Bytes),
    File(File),
    Stream(Box<dyn Read + Send>),
}

/// An opened, single-pass view of one part's payload.
///
/// When the expected length is known, reads stop exactly there and a source that
/// ends early is reported as [`MultipartError::LengthMismatch`].
pub struct PartBody {
    part: String,
    source: Source,
    expected: Option<u64>,
    produced: u64,
}

impl PartBody {
    pub(crate) fn memory(part: &str, data: Bytes) -> Self {
        let expected = Some(data.len() as u64);
        Self::new(part, Source::Memory(data), expected)
    }

    pub(crate) fn file(part: &str, file: File, len: u64) -> Self {
        Self::new(part, Source::File(file), Some(len))
    }

    pub(crate) fn stream(part: &str, reader: Box<dyn Read + Send>, len: Option<u64>) -> Self {
        Self::new(part, Source::Stream(reader), len)
    }

    fn new(part: &str, source: Source, expected: Option<u64>) -> Self {
        Self {
            part: part.to_string(),
            source,
            expected,
            produced: 0,
        }
    }

    /// Pins the number of bytes this body will yield.
    pub(crate) fn expect_len(mut self, len: u64) -> Self {
        self.expected = Some(len);
        self
    }

    /// Bytes produced so far.
    pub fn produced(&self) -> u64 {
        self.produced
    }

    /// Bytes still to come, if the length is known.
    pub fn remaining(&self) -> Option<u64> {
        self.expected.map(|expected| expected - self.produced)
    }

    /// Copies the next bytes of the payload into `buf`.
    ///
    /// Returns `Ok(0)` once the payload is exhausted.
    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize, MultipartError> {
        let limit = match self.remaining() {
            Some(remaining) => buf.len().min(usize::try_from(remaining).unwrap_or(usize::MAX)),
            None => buf.len(),
        };
        if limit == 0 {
            return Ok(0);
        }

        let read = match &mut self.source {
            Source::Memory(data) => {
                let start = usize::try_from(self.produced).unwrap_or(usize::MAX).min(data.len());
                let end = (start + limit).min(data.len());
                buf[..end - start].copy_from_slice(&data[start..end]);
                Ok(end - start)
            }
            Source::File(file) => read_retrying(file, &mut buf[..limit]),
            Source::Stream(reader) => read_retrying(reader, &mut buf[..limit]),
        }
        .map_err(|source| MultipartError::Io {
            part: self.part.clone(),
            source,
        })?;

        if read == 0 {
            if let Some(expected) = self.expected {
                return Err(MultipartError::LengthMismatch {
                    part: self.part.clone(),
                    expected,
                    actual: self.produced,
                });
            }
        }

        self.produced += read as u64;
        Ok(read)
    }

    /// Releases the underlying handle.
    pub fn close(self) {
        let kind = match self.source {
            Source::Memory(_) => "memory",
            Source::File(_) => "file",
            Source::Stream(_) => "stream",
        };
        debug!(part = %self.part, kind, produced = self.produced, "closing part body");
    }
}

fn read_retrying(reader: &mut (impl Read + ?Sized), buf: &mut [u8]) -> io::Result<usize> {
    loop {
        match reader.read(buf) {
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            other => return other,
        }
    }
}

impl fmt::Debug for PartBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PartBody")
            .field("part", &self.part)
            .field("expected", &self.expected)
            .field("produced", &self.produced)
            .finish()
    }
}
