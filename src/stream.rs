//! Async adapter turning a [`Body`] into a stream of byte chunks.

use std::{
    pin::Pin,
    task::{Context, Poll},
};

use bytes::Bytes;
use futures::Stream;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, warn};

use crate::{
    body::{Body, BodyRead},
    error::MultipartError,
};

/// A stream of body chunks produced on a blocking task.
///
/// Reads happen off the async runtime since part bodies may block on file I/O.
/// Dropping the stream stops the producer, which then closes the body.
pub struct BodyStream {
    receiver: ReceiverStream<Result<Bytes, MultipartError>>,
    content_length: Option<u64>,
}

impl BodyStream {
    /// Spawns the producer for `body` on the current tokio runtime.
    pub(crate) fn spawn<B: Body + 'static>(mut body: B, chunk_size: usize, buffer: usize) -> Self {
        let content_length = body.content_length().ok();
        let (tx, rx) = mpsc::channel(buffer.max(1));
        let chunk_size = chunk_size.max(1);

        tokio::task::spawn_blocking(move || {
            let mut chunk = vec![0u8; chunk_size];
            loop {
                match body.read(&mut chunk) {
                    Ok(BodyRead::Data(n)) => {
                        let bytes = Bytes::copy_from_slice(&chunk[..n]);
                        if tx.blocking_send(Ok(bytes)).is_err() {
                            debug!("body stream dropped before the end of the body");
                            break;
                        }
                    }
                    Ok(BodyRead::End) => break,
                    Err(e) => {
                        if let Err(e) = tx.blocking_send(Err(e)) {
                            warn!("Error sending body error: {}", e);
                        }
                        break;
                    }
                }
            }
            body.close();
        });

        Self {
            receiver: ReceiverStream::new(rx),
            content_length,
        }
    }

    /// Length of the streamed body, if known.
    pub fn content_length(&self) -> Option<u64> {
        self.content_length
    }
}

impl Stream for BodyStream {
    type Item = Result<Bytes, MultipartError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.get_mut().receiver).poll_next(cx)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc,
    };

    use futures::StreamExt;

    use super::*;

    /// Produces `remaining` bytes of `x`, recording reads and closes.
    struct CountingBody {
        remaining: usize,
        reads: Arc<AtomicUsize>,
        closed: Arc<AtomicBool>,
    }

    impl Body for CountingBody {
        fn content_type(&self) -> &str {
            "application/x-test"
        }

        fn content_length(&self) -> Result<u64, MultipartError> {
            Ok(self.remaining as u64)
        }

        fn read(&mut self, buf: &mut [u8]) -> Result<BodyRead, MultipartError> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            if self.remaining == 0 {
                return Ok(BodyRead::End);
            }
            let n = buf.len().min(self.remaining);
            buf[..n].fill(b'x');
            self.remaining -= n;
            Ok(BodyRead::Data(n))
        }

        fn close(&mut self) {
            self.closed.store(true, Ordering::SeqCst);
        }
    }

    fn counting_body(len: usize) -> (CountingBody, Arc<AtomicUsize>, Arc<AtomicBool>) {
        let reads = Arc::new(AtomicUsize::new(0));
        let closed = Arc::new(AtomicBool::new(false));
        let body = CountingBody {
            remaining: len,
            reads: reads.clone(),
            closed: closed.clone(),
        };
        (body, reads, closed)
    }

    #[tokio::test]
    async fn streams_every_byte_in_chunks() {
        let (body, _, closed) = counting_body(100);
        let mut stream = BodyStream::spawn(body, 30, 4);
        assert_eq!(stream.content_length(), Some(100));

        let mut sizes = Vec::new();
        while let Some(chunk) = stream.next().await {
            sizes.push(chunk.unwrap().len());
        }

        assert_eq!(sizes, vec![30, 30, 30, 10]);
        for _ in 0..100 {
            if closed.load(Ordering::SeqCst) {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
        assert!(closed.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn dropping_the_stream_closes_the_body() {
        let (body, reads, closed) = counting_body(1 << 20);
        let mut stream = BodyStream::spawn(body, 1, 1);
        assert!(stream.next().await.is_some());
        drop(stream);

        for _ in 0..200 {
            if closed.load(Ordering::SeqCst) {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
        assert!(closed.load(Ordering::SeqCst));
        assert!(reads.load(Ordering::SeqCst) < 1 << 20);
    }
}
