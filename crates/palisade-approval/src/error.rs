//! Approval store error types.

use thiserror::Error;

/// Errors that can occur while persisting approval state.
///
/// Read-side failures never surface here: a missing or unparseable store
/// file is treated as the empty store. Write failures do surface, are
/// logged by callers, and never change the decision already computed for
/// the in-flight call.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Filesystem error while writing state.
    #[error("failed to write {path}: {source}")]
    WriteError {
        /// Path of the file.
        path: String,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Serialization error while encoding state.
    #[error("failed to encode approval state: {0}")]
    EncodeError(String),
}

/// Result type for approval store operations.
pub type StoreResult<T> = Result<T, StoreError>;
