//! Approval record types and the deterministic request ID.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use palisade_core::{ParamsHash, Risk, Timestamp, sha256_hex_prefix};

/// Current on-disk store format version.
pub const STORE_VERSION: u32 = 1;

/// Hex length of an approval request ID.
const APPROVAL_ID_LEN: usize = 16;

/// Compute the deterministic request ID for an invocation fingerprint.
///
/// `sha256(tool ":" session_key ":" params_hash ":" risk)` truncated to
/// 16 hex chars. Depends only on its four inputs, so it is stable across
/// processes and restarts.
#[must_use]
pub fn approval_id(
    tool_name: &str,
    session_key: Option<&str>,
    params_hash: &ParamsHash,
    risk: Risk,
) -> String {
    let input = format!(
        "{tool_name}:{}:{}:{risk}",
        session_key.unwrap_or(""),
        params_hash.as_str()
    );
    sha256_hex_prefix(input.as_bytes(), APPROVAL_ID_LEN)
}

/// Lifecycle state of an approval request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    /// Waiting for a human decision.
    Pending,
    /// Approved (scope says for how long).
    Approved,
    /// Denied.
    Denied,
}

impl fmt::Display for ApprovalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Approved => write!(f, "approved"),
            Self::Denied => write!(f, "denied"),
        }
    }
}

/// Lifetime of an approval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalScope {
    /// Consumed by the first matching call.
    Once,
    /// Covers all identical calls within the session.
    Session,
}

impl ApprovalScope {
    /// Parse a scope string case-insensitively, `None` for unknown values.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "once" => Some(Self::Once),
            "session" => Some(Self::Session),
            _ => None,
        }
    }
}

impl fmt::Display for ApprovalScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Once => write!(f, "once"),
            Self::Session => write!(f, "session"),
        }
    }
}

/// One approval request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalRecord {
    /// Deterministic request ID (see [`approval_id`]).
    pub id: String,
    /// Tool the request covers.
    pub tool_name: String,
    /// Invocation fingerprint.
    pub params_hash: ParamsHash,
    /// Redacted preview of the params, or the literal `[redacted]` when
    /// the policy's log mode is safe.
    pub params_preview: String,
    /// Risk band of the call.
    pub risk: Risk,
    /// Lifecycle state.
    pub status: ApprovalStatus,
    /// Approval lifetime; set when the request is approved.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<ApprovalScope>,
    /// When the request was created.
    pub created_at: Timestamp,
    /// When the request last changed state.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<Timestamp>,
    /// For once-scope approvals: whether the approval has been consumed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub used: Option<bool>,
    /// The decision reason that raised the request.
    pub reason: String,
    /// Session the request belongs to, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_key: Option<String>,
    /// Agent that issued the call, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
}

/// Membership row for a session-scope approval: its presence is the
/// grant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionApproval {
    /// Request ID the grant came from.
    pub id: String,
    /// Tool covered.
    pub tool_name: String,
    /// Invocation fingerprint covered.
    pub params_hash: ParamsHash,
    /// Session the grant is valid in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_key: Option<String>,
    /// When the grant was created.
    pub approved_at: Timestamp,
}

impl SessionApproval {
    /// Whether this grant covers the given invocation.
    #[must_use]
    pub fn covers(
        &self,
        id: &str,
        tool_name: &str,
        params_hash: &ParamsHash,
        session_key: Option<&str>,
    ) -> bool {
        self.id == id
            && self.tool_name == tool_name
            && &self.params_hash == params_hash
            && self.session_key.as_deref() == session_key
    }
}

/// Point-in-time approval store, persisted as `approvals.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalStore {
    /// Store format version.
    pub version: u32,
    /// All requests, in creation order.
    pub requests: Vec<ApprovalRecord>,
    /// Active session grants.
    pub session_approvals: Vec<SessionApproval>,
}

impl Default for ApprovalStore {
    fn default() -> Self {
        Self {
            version: STORE_VERSION,
            requests: Vec::new(),
            session_approvals: Vec::new(),
        }
    }
}

/// Append-only history record, one JSON line per approved event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEvent {
    /// Request ID that was approved.
    pub id: String,
    /// Tool covered.
    pub tool_name: String,
    /// Risk band of the request.
    pub risk: Risk,
    /// Scope granted.
    pub scope: ApprovalScope,
    /// When the approval happened.
    pub approved_at: Timestamp,
}

/// Rollup of approval counts per `tool:risk`, persisted as
/// `approvals.rollup.json`.
///
/// Rebuildable from history: counting approved events commutes, so the
/// rollup equals a fold over the history file in any order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalRollup {
    /// `"{tool}:{risk}"` → approval count.
    pub counts: BTreeMap<String, u64>,
    /// Last time a counter changed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<Timestamp>,
}

impl ApprovalRollup {
    /// Count one approved event.
    pub fn bump(&mut self, tool_name: &str, risk: Risk, at: Timestamp) {
        let key = format!("{tool_name}:{risk}");
        *self.counts.entry(key).or_insert(0) += 1;
        self.updated_at = Some(at);
    }

    /// Rebuild a rollup from history events.
    #[must_use]
    pub fn rebuild(events: &[HistoryEvent]) -> Self {
        let mut rollup = Self::default();
        for event in events {
            rollup.bump(&event.tool_name, event.risk, event.approved_at);
        }
        rollup
    }
}
