//! Error types for dnswatch
//!
//! Provider API failures have their own closed code set in
//! [`crate::traits::dns_provider::ProviderError`]; this module covers
//! everything else the core can fail on.

use thiserror::Error;

/// Result type alias for core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed input rejected at construction (domain, record type, server, interval)
    #[error("Invalid input: {0}")]
    Validation(String),

    /// Task store errors
    #[error("Task store error: {0}")]
    Store(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Public IP discovery failed for every source
    #[error("IP discovery failed: {0}")]
    Discovery(String),

    /// An operation was applied in a state that does not allow it
    #[error("Invalid state: {0}")]
    InvalidState(String),
}

impl Error {
    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a task store error
    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a discovery error
    pub fn discovery(msg: impl Into<String>) -> Self {
        Self::Discovery(msg.into())
    }

    /// Create an invalid state error
    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }
}

