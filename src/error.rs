//! Error handling module for lhaudit
//!
//! Provides centralized error types using thiserror. Per-audit and per-file
//! failures are not errors at this level: they are logged and rendered as
//! missing results. These variants cover what can stop a whole command.

use thiserror::Error;

/// Main error type for lhaudit
#[derive(Error, Debug)]
pub enum AuditError {
    /// IO errors (output directory, config file)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration errors (loading, validation)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Page registry errors (duplicate names, bad paths, unknown filters)
    #[error("Page registry error: {0}")]
    Registry(String),
}

/// Result type alias for lhaudit operations
pub type Result<T> = std::result::Result<T, AuditError>;

impl AuditError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a page registry error
    pub fn registry(msg: impl Into<String>) -> Self {
        Self::Registry(msg.into())
    }
}
