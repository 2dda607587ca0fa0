//! Error types for the hostsync system
//!
//! This module defines all error types used throughout the crate.

use thiserror::Error;

/// Result type alias for hostsync operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the hostsync system
#[derive(Error, Debug)]
pub enum Error {
    /// Host source file unreadable
    #[error("host source error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(String),

    /// Remote record store errors
    #[error("record store error ({store}): {message}")]
    Store {
        /// Record store name
        store: String,
        /// Error message
        message: String,
    },

    /// Zone or record not found
    #[error("not found: {0}")]
    NotFound(String),

    /// Filesystem watch errors
    #[error("file watch error: {0}")]
    Watch(String),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a record store error
    pub fn store(store: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Store {
            store: store.into(),
            message: message.into(),
        }
    }

    /// Create a "not found" error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a file watch error
    pub fn watch(msg: impl Into<String>) -> Self {
        Self::Watch(msg.into())
    }

    /// Create a generic error
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}
