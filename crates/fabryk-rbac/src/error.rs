//! Error types for fabryk-rbac

use crate::types::EntityKind;

/// Errors raised by RBAC storage operations.
///
/// Lookups never fail for an unknown name: they return `None` or an empty
/// collection. `NotFound` is reserved for mutations addressing an entity
/// that does not exist.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// An add or rename targeted a name that is already bound.
    #[error("{kind} '{name}' already defined")]
    DuplicateKey {
        /// Entity kind whose mapping holds the name
        kind: EntityKind,
        /// The conflicting name
        name: String,
    },

    /// A required parameter is missing or a structural rule forbids the call.
    #[error("Invalid parameter: {message}")]
    InvalidParameter {
        /// What is wrong
        message: String,
    },

    /// Adding the edge would close a cycle in the item hierarchy.
    #[error("Cannot add '{child}' as a child of '{parent}'. A loop has been detected.")]
    LoopDetected {
        /// Prospective parent name
        parent: String,
        /// Prospective child name
        child: String,
    },

    /// A mutation addressed a name with no mapping.
    #[error("{kind} '{name}' not found")]
    NotFound {
        /// Entity kind that was looked up
        kind: EntityKind,
        /// The unbound name
        name: String,
    },

    /// Configuration is unreadable or inconsistent.
    #[error("Configuration error: {message}")]
    Config {
        /// What configuration is problematic
        message: String,
    },

    /// I/O error while reading configuration.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The key-value engine failed (connection loss, aborted batch, ...).
    #[error("Storage error: {0}")]
    Storage(#[from] fabryk_redis::Error),
}

/// Result type alias for fabryk-rbac operations
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Creates a duplicate-key error.
    pub fn duplicate(kind: EntityKind, name: impl Into<String>) -> Self {
        Error::DuplicateKey {
            kind,
            name: name.into(),
        }
    }

    /// Creates an invalid-parameter error.
    pub fn invalid_parameter<S: Into<String>>(message: S) -> Self {
        Error::InvalidParameter {
            message: message.into(),
        }
    }

    /// Creates a not-found error.
    pub fn not_found(kind: EntityKind, name: impl Into<String>) -> Self {
        Error::NotFound {
            kind,
            name: name.into(),
        }
    }

    /// Creates a configuration error.
    pub fn config<S: Into<String>>(message: S) -> Self {
        Error::Config {
            message: message.into(),
        }
    }

    /// Returns whether retrying the same call could succeed.
    ///
    /// Only engine faults qualify; every other variant needs different input.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Storage(e) => e.is_retryable(),
            Error::Io(_) => true,
            Error::DuplicateKey { .. }
            | Error::InvalidParameter { .. }
            | Error::LoopDetected { .. }
            | Error::NotFound { .. }
            | Error::Config { .. } => false,
        }
    }
}
