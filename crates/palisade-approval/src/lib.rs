//! Palisade Approval - The persistent approval ledger.
//!
//! An approval converts an ASK decision into an ALLOW for a specific
//! invocation fingerprint. The ledger owns that lifecycle:
//!
//! - [`ApprovalRecord`]s are created `pending`, flipped to `approved` or
//!   `denied` by chat command, and (for `once` scope) consumed on first
//!   use
//! - Session-scope approvals spawn a [`SessionApproval`] membership row
//!   that covers all identical calls within the session
//! - Approved transitions append to an append-only history file and bump
//!   the `tool:risk` rollup counters
//!
//! Request IDs are deterministic truncated SHA-256 over
//! `(tool, session key, params hash, risk)`, so two processes sharing a
//! state directory agree on them without coordination.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

pub mod error;
pub mod ledger;
pub mod record;

pub use error::{StoreError, StoreResult};
pub use ledger::{ApprovalLedger, AskRequest, AskResolution};
pub use record::{
    ApprovalRecord, ApprovalRollup, ApprovalScope, ApprovalStatus, ApprovalStore, HistoryEvent,
    SessionApproval, approval_id,
};
