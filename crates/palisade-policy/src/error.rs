//! Policy loading error types.
//!
//! These errors are internal to the loader: the public [`crate::load_policy`]
//! entry point never propagates them, it logs a warning and falls back to
//! the built-in defaults (the firewall must always come up with a policy).

use thiserror::Error;

/// Errors that can occur while reading or parsing a policy file.
#[derive(Debug, Error)]
pub enum PolicyError {
    /// The override file could not be read.
    #[error("failed to read policy file {path}: {source}")]
    ReadError {
        /// Path of the file.
        path: String,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The override file is not valid YAML (or has the wrong shape).
    #[error("failed to parse policy file {path}: {source}")]
    ParseError {
        /// Path of the file.
        path: String,
        /// Underlying parse error.
        #[source]
        source: serde_yaml::Error,
    },

    /// The override file exceeds the size cap.
    #[error("policy file {path} is {size} bytes, exceeding the {limit} byte limit")]
    TooLarge {
        /// Path of the file.
        path: String,
        /// Actual size.
        size: u64,
        /// Maximum allowed size.
        limit: u64,
    },
}

/// Result type for policy file operations.
pub type PolicyResult<T> = Result<T, PolicyError>;
