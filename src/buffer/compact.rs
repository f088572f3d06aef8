//! Buffer Compaction
//!
//! Converts a write-cursor-positioned buffer into a payload of exactly the
//! written length. The cursor of a `BytesMut` is its `len()`: bytes between
//! `len()` and `capacity()` are uninitialized or stale and are never copied.

use bytes::{BufMut, Bytes, BytesMut};
use std::io;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::net::TcpStream;
use tracing::trace;

/// Default bound for a connection's read buffer (8 KB)
pub const DEFAULT_READ_BUFFER_SIZE: usize = 8 * 1024;

/// Copies the written region of `buffer` into a new, exactly-sized payload
/// and resets the buffer to position 0.
///
/// The buffer keeps its allocation so the next read can reuse it. A buffer
/// with nothing written yields an empty payload, meaning "no data produced
/// this cycle".
///
/// # Example
/// ```
/// use bytes::{BufMut, BytesMut};
/// use tcp_native::buffer::compact;
///
/// let mut buffer = BytesMut::with_capacity(1024);
/// buffer.put_slice(b"PING");
///
/// let payload = compact(&mut buffer);
/// assert_eq!(payload.len(), 4);
/// assert!(buffer.is_empty());
/// assert!(buffer.capacity() >= 1024);
/// ```
pub fn compact(buffer: &mut BytesMut) -> Bytes {
    let payload = Bytes::copy_from_slice(&buffer[..]);
    buffer.clear();
    payload
}

/// A bounded-capacity append buffer that tracks its own write cursor.
///
/// Reads into the buffer never exceed the bound, and the only way to get
/// data out is [`take_written`](ReadBuffer::take_written), which returns
/// exactly the written region and resets the cursor.
///
/// Not meant to be shared: one reader and one writer per buffer.
#[derive(Debug)]
pub struct ReadBuffer {
    inner: BytesMut,
    capacity: usize,
}

impl ReadBuffer {
    /// Creates a buffer that holds at most `capacity` bytes between drains.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: BytesMut::with_capacity(capacity),
            capacity,
        }
    }

    /// Bytes written since the last drain.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// The bound this buffer was created with.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Space left before the buffer must be drained.
    pub fn remaining(&self) -> usize {
        self.capacity - self.inner.len()
    }

    pub fn is_full(&self) -> bool {
        self.remaining() == 0
    }

    /// The written region, without draining it.
    pub fn written(&self) -> &[u8] {
        &self.inner[..]
    }

    /// Appends as much of `src` as fits and returns how many bytes were
    /// accepted.
    pub fn write(&mut self, src: &[u8]) -> usize {
        let n = src.len().min(self.remaining());
        self.inner.extend_from_slice(&src[..n]);
        n
    }

    /// Returns exactly the written bytes and resets the buffer for the next
    /// read cycle.
    pub fn take_written(&mut self) -> Bytes {
        let payload = compact(&mut self.inner);
        trace!(bytes = payload.len(), "Drained read buffer");
        payload
    }

    /// Reads once from `reader` into the free space of the buffer.
    ///
    /// Returns the number of bytes read; `Ok(0)` means end of stream. Fails
    /// without reading if the buffer is already full.
    pub async fn fill_from<R>(&mut self, reader: &mut R) -> io::Result<usize>
    where
        R: AsyncRead + Unpin + ?Sized,
    {
        let remaining = self.check_space()?;
        let mut limited = (&mut self.inner).limit(remaining);
        let n = reader.read_buf(&mut limited).await?;
        trace!(bytes = n, buffered = self.inner.len(), "Read data");
        Ok(n)
    }

    /// Non-blocking variant of [`fill_from`](ReadBuffer::fill_from) for a
    /// shared TCP stream. Returns `WouldBlock` when no data is ready.
    pub fn try_fill_from(&mut self, stream: &TcpStream) -> io::Result<usize> {
        let remaining = self.check_space()?;
        let mut limited = (&mut self.inner).limit(remaining);
        let n = stream.try_read_buf(&mut limited)?;
        trace!(bytes = n, buffered = self.inner.len(), "Read data");
        Ok(n)
    }

    fn check_space(&self) -> io::Result<usize> {
        match self.remaining() {
            0 => Err(io::Error::other(format!(
                "read buffer is full ({} bytes)",
                self.capacity
            ))),
            n => Ok(n),
        }
    }
}

impl Default for ReadBuffer {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_READ_BUFFER_SIZE)
    }
}
