//! The decision engine: pure evaluation of a tool call against a policy.
//!
//! Given equal inputs the engine produces byte-equal outputs, including
//! the reason string. Guards (path, rate) and the approval gate compose
//! on top of this in the pre-call pipeline; the engine itself never
//! consults state.

use serde::{Deserialize, Serialize};

use palisade_core::{Decision, Risk, ToolCall};

use crate::policy::Policy;
use crate::rule::NormalizedToolRule;

/// What the pipelines should redact for this call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedactionPlan {
    /// Redact parameters before previews and hashing.
    pub params: bool,
    /// Redact the result message before persistence.
    pub result: bool,
}

/// The engine's verdict on one tool call. Immutable downstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirewallDecision {
    /// The composed decision so far.
    pub decision: Decision,
    /// Human-readable reason, templated and deterministic.
    pub reason: String,
    /// Risk band of the call.
    pub risk: Risk,
    /// Redaction plan for params and result.
    pub redaction: RedactionPlan,
    /// Scan the result for prompt injection.
    pub scan_injection: bool,
    /// Delegate `exec` ASKs to the host's own approval flow.
    pub use_exec_approvals: bool,
    /// The matched rule, if the tool is known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_rule: Option<NormalizedToolRule>,
}

/// Evaluate a tool call against a policy.
///
/// Known tools take their rule's decision, risk, and flags. Unknown
/// tools route through `defaults.unknown_tool_action` when
/// `deny_unknown_tools` is set, otherwise through the `unknown` risk
/// mapping; their flags default to the safe side (redact and scan).
#[must_use]
pub fn evaluate(policy: &Policy, call: &ToolCall) -> FirewallDecision {
    let name = Policy::normalize_name(&call.tool_name);

    if let Some(rule) = policy.find_tool(&name) {
        return FirewallDecision {
            decision: rule.action,
            reason: format!(
                "Tool \"{name}\" ({risk}) resolved to {decision}.",
                risk = rule.risk,
                decision = rule.action
            ),
            risk: rule.risk,
            redaction: RedactionPlan {
                params: rule.redact_params,
                result: rule.redact_result,
            },
            scan_injection: rule.scan_injection,
            use_exec_approvals: rule.use_exec_approvals,
            tool_rule: Some(rule.clone()),
        };
    }

    let decision = if policy.defaults.deny_unknown_tools {
        policy.defaults.unknown_tool_action
    } else {
        policy.risk.unknown
    };
    let reason = if decision == Decision::Deny {
        format!("Unknown tool \"{name}\" denied by default policy.")
    } else {
        format!("Unknown tool \"{name}\" resolved to {decision} by default policy.")
    };

    FirewallDecision {
        decision,
        reason,
        risk: Risk::Unknown,
        redaction: RedactionPlan {
            params: true,
            result: true,
        },
        scan_injection: true,
        use_exec_approvals: false,
        tool_rule: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::load_policy;
    use serde_json::json;

    fn standard() -> Policy {
        load_policy(None, None)
    }

    // -----------------------------------------------------------------------
    // Known tools
    // -----------------------------------------------------------------------

    #[test]
    fn known_tool_uses_rule_and_exact_reason() {
        let policy = standard();
        let call = ToolCall::new("read", json!({}));
        let verdict = evaluate(&policy, &call);
        assert_eq!(verdict.decision, Decision::Allow);
        assert_eq!(verdict.risk, Risk::Read);
        assert_eq!(verdict.reason, "Tool \"read\" (read) resolved to ALLOW.");
        assert!(verdict.tool_rule.is_some());
    }

    #[test]
    fn tool_name_is_normalized_for_lookup() {
        let policy = standard();
        let verdict = evaluate(&policy, &ToolCall::new("  WRITE ", json!({})));
        assert_eq!(verdict.reason, "Tool \"write\" (write) resolved to ASK.");
    }

    #[test]
    fn exec_carries_the_delegation_flag() {
        let policy = standard();
        let verdict = evaluate(&policy, &ToolCall::new("exec", json!({})));
        assert_eq!(verdict.decision, Decision::Ask);
        assert!(verdict.use_exec_approvals);
    }

    // -----------------------------------------------------------------------
    // Unknown tools
    // -----------------------------------------------------------------------

    #[test]
    fn unknown_tool_denied_by_default_policy() {
        let policy = standard();
        let verdict = evaluate(&policy, &ToolCall::new("mystery_tool", json!({})));
        assert_eq!(verdict.decision, Decision::Deny);
        assert_eq!(
            verdict.reason,
            "Unknown tool \"mystery_tool\" denied by default policy."
        );
        assert_eq!(verdict.risk, Risk::Unknown);
        assert!(verdict.tool_rule.is_none());
        // Unknown tools get the safe flags.
        assert!(verdict.redaction.params);
        assert!(verdict.scan_injection);
    }

    #[test]
    fn unknown_tool_with_non_deny_action_uses_other_template() {
        let mut policy = standard();
        policy.defaults.unknown_tool_action = Decision::Ask;
        let verdict = evaluate(&policy, &ToolCall::new("mystery_tool", json!({})));
        assert_eq!(
            verdict.reason,
            "Unknown tool \"mystery_tool\" resolved to ASK by default policy."
        );
    }

    #[test]
    fn unknown_tool_without_deny_flag_uses_risk_mapping() {
        let mut policy = standard();
        policy.defaults.deny_unknown_tools = false;
        policy.risk.unknown = Decision::Allow;
        let verdict = evaluate(&policy, &ToolCall::new("mystery_tool", json!({})));
        assert_eq!(verdict.decision, Decision::Allow);
        assert_eq!(
            verdict.reason,
            "Unknown tool \"mystery_tool\" resolved to ALLOW by default policy."
        );
    }

    // -----------------------------------------------------------------------
    // Determinism
    // -----------------------------------------------------------------------

    #[test]
    fn evaluation_is_byte_deterministic() {
        let policy = standard();
        let call = ToolCall::new("browser", json!({"url": "https://example.com"}));
        let a = evaluate(&policy, &call);
        let b = evaluate(&policy, &call);
        assert_eq!(a, b);
        assert_eq!(
            serde_json::to_vec(&a).unwrap(),
            serde_json::to_vec(&b).unwrap()
        );
    }
}
