//! Prelude module - commonly used types for convenient import.
//!
//! Use `use palisade_core::prelude::*;` to import all essential types.

pub use crate::error::{CoreError, CoreResult};
pub use crate::hash::{ParamsHash, sha256_hex, sha256_hex_prefix};
pub use crate::stable::{stable_bytes, stable_string};
pub use crate::types::{CallContext, Decision, Risk, Timestamp, ToolCall};
