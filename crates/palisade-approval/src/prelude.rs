//! Prelude module - commonly used types for convenient import.

pub use crate::error::{StoreError, StoreResult};
pub use crate::ledger::{ApprovalLedger, AskRequest, AskResolution};
pub use crate::record::{
    ApprovalRecord, ApprovalRollup, ApprovalScope, ApprovalStatus, ApprovalStore, HistoryEvent,
    SessionApproval, approval_id,
};
