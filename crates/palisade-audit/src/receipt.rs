//! The receipt record.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use palisade_core::{Decision, Risk, Timestamp, sha256_hex_prefix, stable_bytes};
use palisade_redact::RedactionReport;
use palisade_scan::{InjectionFinding, InjectionMode};

/// Hex length of a receipt ID.
const RECEIPT_ID_LEN: usize = 16;

/// Injection scan results attached to a receipt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InjectionReceipt {
    /// Mode the pipeline ran in.
    pub mode: InjectionMode,
    /// The findings.
    pub findings: Vec<InjectionFinding>,
}

/// One audit record: a decision or a processed tool result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    /// Content-derived ID (truncated SHA-256 of the receipt body).
    pub id: String,
    /// When the receipt was written.
    pub timestamp: Timestamp,
    /// Tool the event concerns.
    pub tool_name: String,
    /// Decision, for pre-call receipts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decision: Option<Decision>,
    /// Risk band, if resolved.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk: Option<Risk>,
    /// Decision reason, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Session the event belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_key: Option<String>,
    /// Agent that issued the call.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
    /// What redaction replaced (types, counts, digests only).
    pub redaction: RedactionReport,
    /// Injection scan results, for post-result receipts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub injection: Option<InjectionReceipt>,
    /// Free-form metadata (policy source, params hash, guard details).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl Receipt {
    /// Start a receipt for a tool event. The ID is derived when the
    /// receipt is [sealed](Self::seal).
    #[must_use]
    pub fn new(tool_name: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            timestamp: Timestamp::now(),
            tool_name: tool_name.into(),
            decision: None,
            risk: None,
            reason: None,
            session_key: None,
            agent_id: None,
            redaction: RedactionReport::empty(),
            injection: None,
            metadata: BTreeMap::new(),
        }
    }

    /// Attach the decision triple.
    #[must_use]
    pub fn with_decision(mut self, decision: Decision, risk: Risk, reason: impl Into<String>) -> Self {
        self.decision = Some(decision);
        self.risk = Some(risk);
        self.reason = Some(reason.into());
        self
    }

    /// Attach caller context.
    #[must_use]
    pub fn with_context(mut self, session_key: Option<&str>, agent_id: Option<&str>) -> Self {
        self.session_key = session_key.map(ToString::to_string);
        self.agent_id = agent_id.map(ToString::to_string);
        self
    }

    /// Attach the redaction report.
    #[must_use]
    pub fn with_redaction(mut self, report: RedactionReport) -> Self {
        self.redaction = report;
        self
    }

    /// Attach injection scan results.
    #[must_use]
    pub fn with_injection(mut self, mode: InjectionMode, findings: Vec<InjectionFinding>) -> Self {
        self.injection = Some(InjectionReceipt { mode, findings });
        self
    }

    /// Add one metadata entry.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Derive the content-based ID and return the finished receipt.
    ///
    /// The ID is the truncated SHA-256 of the receipt's stable
    /// serialization (with the ID field empty), so equal content yields
    /// equal IDs across processes.
    #[must_use]
    pub fn seal(mut self) -> Self {
        self.id = String::new();
        let id = serde_json::to_value(&self)
            .ok()
            .and_then(|v| stable_bytes(&v).ok())
            .map_or_else(
                || sha256_hex_prefix(self.tool_name.as_bytes(), RECEIPT_ID_LEN),
                |bytes| sha256_hex_prefix(&bytes, RECEIPT_ID_LEN),
            );
        self.id = id;
        self
    }
}
