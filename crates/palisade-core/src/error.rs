//! Core error types.

use thiserror::Error;

/// Errors produced by the core serialization and hashing layer.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A structured value was nested beyond [`crate::stable::MAX_VALUE_DEPTH`].
    ///
    /// Callers that hash values treat this as the unserializable-params
    /// case: they substitute a fixed literal so hashing stays total and
    /// deterministic.
    #[error("value nesting exceeds the maximum depth of {max_depth}")]
    DepthLimitExceeded {
        /// The depth limit that was exceeded.
        max_depth: usize,
    },
}

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;
