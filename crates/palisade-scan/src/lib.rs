//! Palisade Scan - Rule-based prompt-injection scanning of tool output.
//!
//! Tool results can carry content from external sources (web pages,
//! emails, files) that may embed instructions aimed at the agent. The
//! scanner runs a fixed rule set over the text and produces
//! severity-tagged findings. It never mutates the input: what to do with
//! a flagged result (shadow, alert, block) is the output pipeline's
//! decision.
//!
//! The scanner is a pure function of its input text: equal input yields
//! equal findings, byte for byte.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod rules;
mod scanner;

pub use rules::{InjectionRule, Severity, rules};
pub use scanner::{InjectionFinding, InjectionMode, ScanOutcome, scan_text};
