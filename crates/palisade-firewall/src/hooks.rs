//! Host hook contract types.
//!
//! The host runtime invokes the firewall at two points: before a tool
//! call is forwarded to the executor, and before a tool result is
//! persisted. These types mirror the host's wire shapes: the pre-call
//! return value replaces the forwarded arguments, and the post-result
//! return value (when present) replaces the persisted message.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Pre-call hook input: the tool invocation as the host sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCallEvent {
    /// Tool name as reported by the host.
    pub tool_name: String,
    /// Structured call parameters.
    pub params: Value,
}

/// Context accompanying either hook.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HookContext {
    /// Agent issuing the call.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
    /// Session the call belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_key: Option<String>,
    /// Tool name, when the host provides it on the context.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
    /// Tool call identifier, for result events.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl HookContext {
    /// Context carrying only a session key.
    #[must_use]
    pub fn for_session(session_key: impl Into<String>) -> Self {
        Self {
            session_key: Some(session_key.into()),
            ..Self::default()
        }
    }
}

/// Pre-call hook output: pass the call through or block it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PreCallOutcome {
    /// The call is blocked; `block_reason` is shown to the user.
    Block {
        /// Always `true`.
        block: bool,
        /// Why the call was blocked (templated, redacted).
        #[serde(rename = "blockReason")]
        block_reason: String,
    },
    /// The call proceeds with these (unchanged) parameters.
    Passthrough {
        /// The forwarded parameters.
        params: Value,
    },
}

impl PreCallOutcome {
    /// Build a passthrough outcome.
    #[must_use]
    pub fn passthrough(params: Value) -> Self {
        Self::Passthrough { params }
    }

    /// Build a block outcome.
    #[must_use]
    pub fn block(reason: impl Into<String>) -> Self {
        Self::Block {
            block: true,
            block_reason: reason.into(),
        }
    }

    /// Whether this outcome blocks the call.
    #[must_use]
    pub fn is_blocked(&self) -> bool {
        matches!(self, Self::Block { .. })
    }

    /// The block reason, if blocked.
    #[must_use]
    pub fn block_reason(&self) -> Option<&str> {
        match self {
            Self::Block { block_reason, .. } => Some(block_reason),
            Self::Passthrough { .. } => None,
        }
    }
}

/// Post-result hook input: the tool result about to be persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolResultEvent {
    /// Tool that produced the result.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
    /// Identifier of the originating call.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    /// The result message: a plain string or a structured tool result.
    pub message: Value,
    /// Set for host-synthesized messages.
    #[serde(default)]
    pub is_synthetic: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn block_outcome_serializes_to_host_shape() {
        let outcome = PreCallOutcome::block("Firewall denied exec. nope");
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(
            json,
            json!({"block": true, "blockReason": "Firewall denied exec. nope"})
        );
    }

    #[test]
    fn passthrough_outcome_carries_params() {
        let outcome = PreCallOutcome::passthrough(json!({"path": "/tmp/a"}));
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json, json!({"params": {"path": "/tmp/a"}}));
        assert!(!outcome.is_blocked());
    }

    #[test]
    fn result_event_accepts_host_shape() {
        let event: ToolResultEvent = serde_json::from_value(json!({
            "toolName": "web_fetch",
            "toolCallId": "call-7",
            "message": "hello",
        }))
        .unwrap();
        assert_eq!(event.tool_call_id.as_deref(), Some("call-7"));
        assert!(!event.is_synthetic);
    }
}
