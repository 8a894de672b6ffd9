//! Error types for the burrow storage engine.

use thiserror::Error;

/// The result type used throughout burrow.
pub type Result<T> = std::result::Result<T, Error>;

/// The error type for store operations.
#[derive(Debug, Error)]
pub enum Error {
    /// An underlying filesystem or network failure, propagated verbatim.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed or truncated bytes were encountered while decoding a record.
    #[error("data corruption: {0}")]
    Corruption(String),

    /// The requested key is absent from the index, or its latest record
    /// turned out to be a tombstone or expired at read time.
    #[error("key not found")]
    KeyNotFound,

    /// An invalid argument was provided.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A malformed client request at the wire-protocol layer.
    #[error("protocol error: {0}")]
    Protocol(String),
}

impl Error {
    /// Creates a new corruption error.
    pub fn corruption(msg: impl Into<String>) -> Self {
        Error::Corruption(msg.into())
    }

    /// Creates a new invalid argument error.
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Error::InvalidArgument(msg.into())
    }

    /// Creates a new protocol error.
    pub fn protocol(msg: impl Into<String>) -> Self {
        Error::Protocol(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_error_display() {
        let err = Error::corruption("bad header");
        assert_eq!(err.to_string(), "data corruption: bad header");

        let err = Error::KeyNotFound;
        assert_eq!(err.to_string(), "key not found");
    }

    #[test]
    fn test_error_from_io() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }
}
