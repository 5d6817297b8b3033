//! Prelude module - commonly used types for convenient import.

pub use crate::path::{GuardOverride, check_paths, extract_candidates};
pub use crate::rate::{RateLimitEntry, RateLimiter, RateScope};
pub use crate::resolver::{NativeResolver, PathResolver};
