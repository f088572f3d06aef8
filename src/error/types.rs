//! TCP Error Types
//!
//! This module defines the closed error taxonomy and the value type that
//! carries it.

use std::fmt;
use std::io;
use thiserror::Error;

/// The namespace every [`ErrorKind`] belongs to.
pub const MODULE: &str = "tcp";

/// The closed set of error categories recognized by the `tcp` module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ErrorKind {
    /// Catch-all for conditions not otherwise categorized
    #[default]
    Generic,

    /// The peer closed or reset the connection
    ConnectionClosed,

    /// A read did not complete within its deadline
    ReadTimedOut,

    /// Work was submitted to a worker pool that no longer accepts it
    Rejected,
}

impl ErrorKind {
    /// All kinds, in declaration order.
    pub const ALL: [ErrorKind; 4] = [
        ErrorKind::Generic,
        ErrorKind::ConnectionClosed,
        ErrorKind::ReadTimedOut,
        ErrorKind::Rejected,
    ];

    /// Returns the stable type name of this kind within the module.
    pub const fn type_name(self) -> &'static str {
        match self {
            ErrorKind::Generic => "GenericError",
            ErrorKind::ConnectionClosed => "ConnectionClosedError",
            ErrorKind::ReadTimedOut => "ReadTimedOutError",
            ErrorKind::Rejected => "RejectedError",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}

/// An immutable, module-scoped error value.
///
/// Two values compare equal only when both kind and message match, so values
/// of different kinds are never conflated even when their messages are
/// identical.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Error)]
#[error("{kind}: {message}")]
pub struct TcpError {
    kind: ErrorKind,
    message: String,
}

/// Result type for operations that fail with a [`TcpError`].
pub type TcpResult<T> = Result<T, TcpError>;

impl TcpError {
    /// Creates an error of the given kind.
    ///
    /// # Example
    /// ```
    /// use tcp_native::error::{ErrorKind, TcpError};
    /// let err = TcpError::new(ErrorKind::ReadTimedOut, "no data within 5s");
    /// assert!(err.is(ErrorKind::ReadTimedOut));
    /// ```
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Creates an error of the [`ErrorKind::Generic`] kind.
    pub fn generic(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Generic, message)
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns true if this error is of the given kind.
    pub fn is(&self, kind: ErrorKind) -> bool {
        self.kind == kind
    }

    /// The namespace this error belongs to.
    pub fn module(&self) -> &'static str {
        MODULE
    }

    /// The kind's type name qualified by the module, e.g. `tcp:GenericError`.
    pub fn qualified_name(&self) -> String {
        format!("{}:{}", MODULE, self.kind.type_name())
    }
}

/// Creates an error, defaulting to the generic kind when none is given.
///
/// The message is carried verbatim. Construction cannot fail.
pub fn make_error(kind: Option<ErrorKind>, message: impl Into<String>) -> TcpError {
    TcpError::new(kind.unwrap_or_default(), message)
}

impl From<io::Error> for TcpError {
    fn from(err: io::Error) -> Self {
        let kind = match err.kind() {
            io::ErrorKind::TimedOut => ErrorKind::ReadTimedOut,
            io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::BrokenPipe
            | io::ErrorKind::NotConnected
            | io::ErrorKind::UnexpectedEof => ErrorKind::ConnectionClosed,
            _ => ErrorKind::Generic,
        };
        TcpError::new(kind, err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_make_error_defaults_to_generic() {
        let err = make_error(None, "something broke");
        assert_eq!(err.kind(), ErrorKind::Generic);
        assert_eq!(err.message(), "something broke");
    }

    #[test]
    fn test_make_error_with_kind() {
        let err = make_error(Some(ErrorKind::ReadTimedOut), "read timed out");
        assert_eq!(err.kind(), ErrorKind::ReadTimedOut);
        assert!(err.is(ErrorKind::ReadTimedOut));
        assert!(!err.is(ErrorKind::Generic));
    }

    #[test]
    fn test_same_message_different_kinds_are_distinct() {
        for a in ErrorKind::ALL {
            for b in ErrorKind::ALL {
                let x = TcpError::new(a, "same message");
                let y = TcpError::new(b, "same message");
                assert_eq!(x == y, a == b, "{a} vs {b}");
                assert_eq!(x.is(b), a == b);
            }
        }
    }

    #[test]
    fn test_type_names_are_unique() {
        let mut names: Vec<_> = ErrorKind::ALL.iter().map(|k| k.type_name()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), ErrorKind::ALL.len());
    }

    #[test]
    fn test_display_and_scope() {
        let err = TcpError::generic("bind failed");
        assert_eq!(err.to_string(), "GenericError: bind failed");
        assert_eq!(err.module(), "tcp");
        assert_eq!(err.qualified_name(), "tcp:GenericError");

        let err = TcpError::new(ErrorKind::Rejected, "pool is shut down");
        assert_eq!(err.qualified_name(), "tcp:RejectedError");
    }

    #[test]
    fn test_message_is_verbatim() {
        let msg = "  line one\nline two  ";
        assert_eq!(TcpError::generic(msg).message(), msg);
        assert_eq!(TcpError::generic("").message(), "");
    }

    #[test]
    fn test_from_io_error() {
        let err: TcpError = io::Error::new(io::ErrorKind::TimedOut, "slow").into();
        assert_eq!(err.kind(), ErrorKind::ReadTimedOut);

        let err: TcpError = io::Error::from(io::ErrorKind::ConnectionReset).into();
        assert_eq!(err.kind(), ErrorKind::ConnectionClosed);

        let err: TcpError = io::Error::from(io::ErrorKind::UnexpectedEof).into();
        assert_eq!(err.kind(), ErrorKind::ConnectionClosed);

        let err: TcpError = io::Error::new(io::ErrorKind::Other, "odd").into();
        assert_eq!(err.kind(), ErrorKind::Generic);
        assert!(err.message().contains("odd"));
    }
}
