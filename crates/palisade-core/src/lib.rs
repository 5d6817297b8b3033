//! Palisade Core - Foundation types for the Palisade tool-call firewall.
//!
//! This crate provides:
//! - The [`Decision`] and [`Risk`] axes of the policy model
//! - [`ToolCall`] and [`CallContext`], the firewall's view of an invocation
//! - Stable (canonical) serialization of structured values for hashing
//! - SHA-256 hashing helpers and the [`ParamsHash`] invocation fingerprint
//!
//! Everything here is pure and deterministic: given equal inputs, every
//! function in this crate produces byte-equal outputs across runs and
//! processes. That property underpins restart-safe approval matching and
//! receipt IDs in the crates above.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

pub mod error;
pub mod hash;
pub mod stable;
pub mod types;

pub use error::{CoreError, CoreResult};
pub use hash::{ParamsHash, sha256_hex, sha256_hex_prefix};
pub use stable::{MAX_VALUE_DEPTH, stable_bytes, stable_string};
pub use types::{CallContext, Decision, Risk, Timestamp, ToolCall};
