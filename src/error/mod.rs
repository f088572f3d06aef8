//! Error Taxonomy Module
//!
//! Every failure this crate (or a layer built on it) surfaces to the end user
//! of a TCP service is a [`TcpError`]: a kind taken from the closed
//! [`ErrorKind`] set plus a human-readable message.
//!
//! ## Why Kinds?
//!
//! Callers branch on *what went wrong*, not on message text:
//!
//! ```text
//! match err.kind() {
//!     ErrorKind::ReadTimedOut     => retry_later(),
//!     ErrorKind::ConnectionClosed => drop_session(),
//!     _                           => log_and_fail(),
//! }
//! ```
//!
//! Kinds are scoped to the [`MODULE`] namespace (`tcp`), so a
//! `tcp:GenericError` never collides with a generic error from some other
//! subsystem.
//!
//! ## Example
//!
//! ```
//! use tcp_native::error::{make_error, ErrorKind, TcpError};
//!
//! let generic = make_error(None, "bind failed");
//! let closed = TcpError::new(ErrorKind::ConnectionClosed, "bind failed");
//!
//! assert_eq!(generic.kind(), ErrorKind::Generic);
//! assert_ne!(generic, closed);
//! ```

pub mod types;

// Re-export commonly used types
pub use types::{make_error, ErrorKind, TcpError, TcpResult, MODULE};
