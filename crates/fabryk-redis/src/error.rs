//! Error types for fabryk-redis

use thiserror::Error;

/// Result type alias for fabryk-redis operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by a key-value engine.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Error reported by the Redis client (connection loss, protocol, EXEC abort).
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// A command addressed a key holding a different structure.
    #[error("Wrong type for key '{key}': expected {expected}")]
    WrongType {
        /// Key that was addressed
        key: String,
        /// Structure the command expected
        expected: &'static str,
    },

    /// A SCAN pattern could not be compiled.
    #[error("Invalid key pattern '{pattern}': {message}")]
    InvalidPattern {
        /// The offending pattern
        pattern: String,
        /// Why it was rejected
        message: String,
    },

    /// A SCAN cursor was not issued by this engine or was already used.
    #[error("Invalid scan cursor {cursor}")]
    InvalidCursor {
        /// The rejected cursor
        cursor: u64,
    },

    /// The engine could not be reached or configured.
    #[error("Connection error: {message}")]
    Connection {
        /// What went wrong
        message: String,
    },
}

impl Error {
    /// Creates a wrong-type error.
    pub fn wrong_type(key: impl Into<String>, expected: &'static str) -> Self {
        Error::WrongType {
            key: key.into(),
            expected,
        }
    }

    /// Creates a connection error.
    pub fn connection<S: Into<String>>(message: S) -> Self {
        Error::Connection {
            message: message.into(),
        }
    }

    /// Returns whether the failure is transient.
    ///
    /// Nothing in this crate retries; the classification is for callers.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Redis(e) => e.is_io_error() || e.is_timeout() || e.is_connection_dropped(),
            Error::Connection { .. } => true,
            Error::WrongType { .. } => false,
            Error::InvalidPattern { .. } | Error::InvalidCursor { .. } => false,
        }
    }
}
