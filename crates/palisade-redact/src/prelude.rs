//! Prelude module - commonly used types for convenient import.

pub use crate::engine::{RedactionMode, redact_text, redact_value};
pub use crate::report::{MatchEntry, RedactionReport};
