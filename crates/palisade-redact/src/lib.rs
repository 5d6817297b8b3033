//! Palisade Redact - Secret detection and deep redaction.
//!
//! This crate provides:
//! - A library of regex-based detectors for secrets, identifiers, and
//!   crypto artifacts ([`detectors`])
//! - A deep, structure-walking redaction engine over JSON values
//!   ([`engine`])
//! - [`RedactionReport`], the structural summary of detector hits
//!
//! Redaction is idempotent: replacement tokens have the form
//! `[REDACTED:<type>:<hash8>]` and are never re-matched on a second pass,
//! even in strict mode where generic long-token detectors are active.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

pub mod detectors;
pub mod engine;
pub mod report;

pub use engine::{RedactionMode, redact_text, redact_value};
pub use report::{MatchEntry, RedactionReport};
