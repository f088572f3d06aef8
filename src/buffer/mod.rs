//! Read Buffer Module
//!
//! Every completed read hands the service layer a payload that contains
//! exactly the bytes that were written, and nothing past the write cursor.
//!
//! ## Drain Cycle
//!
//! ```text
//!   capacity ──────────────────────────────────────────┐
//!   ┌──────────────────────────┬───────────────────────┐
//!   │   written (0..cursor)    │   unwritten / stale   │
//!   └──────────────────────────┴───────────────────────┘
//!                │
//!                │ take_written()
//!                ▼
//!   ┌──────────────────────────┐   buffer is reset and
//!   │  Bytes (len == cursor)   │   ready for the next
//!   └──────────────────────────┘   write at position 0
//! ```
//!
//! ## Example
//!
//! ```
//! use tcp_native::buffer::ReadBuffer;
//!
//! let mut buffer = ReadBuffer::with_capacity(16);
//! buffer.write(b"hello");
//!
//! let payload = buffer.take_written();
//! assert_eq!(&payload[..], b"hello");
//! assert!(buffer.is_empty());
//! ```

pub mod compact;

// Re-export commonly used types
pub use compact::{compact, ReadBuffer, DEFAULT_READ_BUFFER_SIZE};
