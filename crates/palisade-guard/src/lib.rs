//! Palisade Guard - Mutating guards composed over the decision engine.
//!
//! This crate provides:
//! - [`PathResolver`], the injected filesystem capability, and its
//!   native implementation
//! - The path guard: extracts path arguments per tool and matches them
//!   against a rule's allowlist
//! - The sliding-window [`RateLimiter`] counting per (tool, scope)
//!
//! Both guards produce *overrides*: a decision plus a reason that the
//! pre-call pipeline composes monotonically (a guard can only make the
//! outcome more restrictive, never less).

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

pub mod path;
pub mod rate;
pub mod resolver;

pub use path::{GuardOverride, check_paths, extract_candidates};
pub use rate::{RateLimitEntry, RateLimiter, RateScope};
pub use resolver::{NativeResolver, PathResolver};
