//! Audit error types.

use thiserror::Error;

/// Errors that can occur while writing receipts.
///
/// Receipt failures are logged by callers and never change the decision
/// returned for the current call.
#[derive(Debug, Error)]
pub enum AuditError {
    /// Filesystem error while appending or rewriting a receipt file.
    #[error("failed to write {path}: {source}")]
    WriteError {
        /// Path of the file.
        path: String,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Serialization error while encoding a receipt.
    #[error("failed to encode receipt: {0}")]
    EncodeError(String),
}

/// Result type for audit operations.
pub type AuditResult<T> = Result<T, AuditError>;
