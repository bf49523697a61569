use bytes::Bytes;
use futures::Stream;
use std::future::Future;
use std::io::{self, Read};
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::task::JoinHandle;

use crate::executor::Executor;

/// The byte stream handed out by every blob container.
pub type ByteStream = Box<dyn Stream<Item = Result<Bytes, io::Error>> + Send + Unpin + 'static>;

type Reader = Box<dyn Read + Send + 'static>;
type ReadOutcome = io::Result<(Reader, Option<Bytes>)>;

enum State {
    Idle(Reader),
    Reading(JoinHandle<ReadOutcome>),
    Done,
}

/// Streams a blocking reader in chunks of at most `buffer_size` bytes.
///
/// Reads are lazy: a chunk is only scheduled on the executor when the
/// consumer polls for it, and at most one read is in flight at a time. The
/// stream ends after EOF or the first error. Dropping it hands the reader
/// back to the pool to be closed there; a read already in flight runs to
/// completion and closes the reader itself.
pub struct BlockingReadStream {
    executor: Executor,
    buffer_size: usize,
    state: State,
}

impl BlockingReadStream {
    /// Wraps `reader`; nothing is read until the stream is first polled.
    ///
    /// Panics when `buffer_size` is zero. Backends resolve it with
    /// [`buffer_size_from`](crate::settings::buffer_size_from), which
    /// rejects zero as a configuration error.
    pub fn new(executor: Executor, reader: impl Read + Send + 'static, buffer_size: usize) -> Self {
        assert!(buffer_size > 0, "buffer_size must be greater than zero");
        Self {
            executor,
            buffer_size,
            state: State::Idle(Box::new(reader)),
        }
    }

    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    fn schedule(&self, mut reader: Reader) -> JoinHandle<ReadOutcome> {
        let buffer_size = self.buffer_size;
        self.executor.handle().spawn_blocking(move || {
            let mut buf = vec![0u8; buffer_size];
            let n = loop {
                match reader.read(&mut buf) {
                    Ok(n) => break n,
                    Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                    Err(e) => return Err(e),
                }
            };
            if n == 0 {
                return Ok((reader, None));
            }
            buf.truncate(n);
            Ok((reader, Some(Bytes::from(buf))))
        })
    }
}

impl Stream for BlockingReadStream {
    type Item = io::Result<Bytes>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        loop {
            match std::mem::replace(&mut this.state, State::Done) {
                State::Idle(reader) => {
                    this.state = State::Reading(this.schedule(reader));
                }
                State::Reading(mut task) => match Pin::new(&mut task).poll(cx) {
                    Poll::Pending => {
                        this.state = State::Reading(task);
                        return Poll::Pending;
                    }
                    Poll::Ready(Ok(Ok((reader, Some(chunk))))) => {
                        this.state = State::Idle(reader);
                        return Poll::Ready(Some(Ok(chunk)));
                    }
                    Poll::Ready(Ok(Ok((reader, None)))) => {
                        this.executor.release(reader);
                        return Poll::Ready(None);
                    }
                    Poll::Ready(Ok(Err(e))) => return Poll::Ready(Some(Err(e))),
                    Poll::Ready(Err(e)) => {
                        return Poll::Ready(Some(Err(io::Error::other(format!(
                            "blocking read failed: {e}"
                        )))));
                    }
                },
                State::Done => return Poll::Ready(None),
            }
        }
    }
}

impl Drop for BlockingReadStream {
    fn drop(&mut self) {
        if let State::Idle(reader) = std::mem::replace(&mut self.state, State::Done) {
            self.executor.release(reader);
        }
    }
}

impl std::fmt::Debug for BlockingReadStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match self.state {
            State::Idle(_) => "idle",
            State::Reading(_) => "reading",
            State::Done => "done",
        };
        f.debug_struct("BlockingReadStream")
            .field("buffer_size", &self.buffer_size)
            .field("state", &state)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    /// Counts reads and records whether it was dropped.
    struct Probe {
        data: io::Cursor<Vec<u8>>,
        reads: Arc<AtomicUsize>,
        closed: Arc<AtomicBool>,
    }

    impl Read for Probe {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            self.data.read(buf)
        }
    }

    impl Drop for Probe {
        fn drop(&mut self) {
            self.closed.store(true, Ordering::SeqCst);
        }
    }

    fn probe(data: Vec<u8>) -> (Probe, Arc<AtomicUsize>, Arc<AtomicBool>) {
        let reads = Arc::new(AtomicUsize::new(0));
        let closed = Arc::new(AtomicBool::new(false));
        let probe = Probe {
            data: io::Cursor::new(data),
            reads: reads.clone(),
            closed: closed.clone(),
        };
        (probe, reads, closed)
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn chunks_are_bounded_and_in_order() {
        let data: Vec<u8> = (0..=255u8).cycle().take(10_000).collect();
        let stream = BlockingReadStream::new(Executor::current(), io::Cursor::new(data.clone()), 4096);

        let chunks: Vec<Bytes> = stream.map(|c| c.unwrap()).collect().await;
        assert!(chunks.iter().all(|c| c.len() <= 4096));
        assert_eq!(chunks.concat(), data);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn reads_are_lazy() {
        let (reader, reads, _) = probe(vec![1; 100]);
        let mut stream = BlockingReadStream::new(Executor::current(), reader, 10);
        assert_eq!(reads.load(Ordering::SeqCst), 0);

        stream.next().await.unwrap().unwrap();
        assert_eq!(reads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn drop_releases_reader() {
        let (reader, reads, closed) = probe(vec![1; 100]);
        let mut stream = BlockingReadStream::new(Executor::current(), reader, 10);
        stream.next().await.unwrap().unwrap();
        drop(stream);

        for _ in 0..100 {
            if closed.load(Ordering::SeqCst) {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert!(closed.load(Ordering::SeqCst), "reader should be closed");
        assert_eq!(reads.load(Ordering::SeqCst), 1, "no read after drop");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn error_ends_the_stream() {
        struct Broken;
        impl Read for Broken {
            fn read(&mut self, _: &mut [u8]) -> io::Result<usize> {
                Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset"))
            }
        }

        let mut stream = BlockingReadStream::new(Executor::current(), Broken, 16);
        let err = stream.next().await.unwrap().unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::ConnectionReset);
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    #[should_panic(expected = "buffer_size must be greater than zero")]
    async fn zero_buffer_size_panics() {
        BlockingReadStream::new(Executor::current(), io::empty(), 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn empty_reader_yields_nothing() {
        let mut stream = BlockingReadStream::new(Executor::current(), io::empty(), 16);
        assert!(stream.next().await.is_none());
        assert!(stream.next().await.is_none());
    }
}
