//! Palisade Audit - Redacted audit receipts.
//!
//! Every firewall decision and every processed tool result emits one
//! [`Receipt`]. Receipts are append-only (`receipts.jsonl`, one JSON
//! line each) and the most recent one is mirrored to
//! `last-decision.json` for the `explain` command.
//!
//! Receipts never carry raw parameter or result content: previews are
//! redacted upstream and secrets appear only as detector hash digests.
//! Receipt IDs are truncated SHA-256 over the receipt's own stable
//! serialization, so identical receipts get identical IDs in every
//! process.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

pub mod error;
pub mod receipt;
pub mod writer;

pub use error::{AuditError, AuditResult};
pub use receipt::{InjectionReceipt, Receipt};
pub use writer::ReceiptWriter;
