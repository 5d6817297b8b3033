//! The [`Firewall`]: subsystems wired into the two host entry points.

use serde_json::{Value, json};
use std::sync::Arc;
use tracing::{debug, info, warn};

use palisade_approval::{ApprovalLedger, AskRequest, AskResolution, approval_id};
use palisade_audit::{Receipt, ReceiptWriter};
use palisade_core::hash::UNSERIALIZABLE_PARAMS;
use palisade_core::{CallContext, Decision, ParamsHash, ToolCall, stable_string};
use palisade_guard::{NativeResolver, PathResolver, RateLimiter, check_paths};
use palisade_policy::{FirewallDecision, LogMode, Policy, evaluate, load_policy};
use palisade_redact::{RedactionMode, RedactionReport, redact_value};
use palisade_scan::{InjectionMode, ScanOutcome, scan_text};

use crate::config::{FirewallConfig, SizeGuardAction};
use crate::hooks::{HookContext, PreCallOutcome, ToolCallEvent, ToolResultEvent};
use crate::output;

/// Preview cap in characters (a trailing `...` marks the cut).
const PREVIEW_MAX_CHARS: usize = 500;

/// The tool-call firewall.
///
/// Construct once per host instance; the policy is loaded at
/// construction and immutable afterwards. Entry points are safe to call
/// concurrently: the approval ledger and rate-limiter buckets are the
/// only mutable state, each behind its own lock.
pub struct Firewall {
    pub(crate) policy: Policy,
    pub(crate) policy_source: String,
    pub(crate) config: FirewallConfig,
    pub(crate) ledger: ApprovalLedger,
    pub(crate) receipts: ReceiptWriter,
    pub(crate) rate_limiter: RateLimiter,
    resolver: Arc<dyn PathResolver>,
}

impl Firewall {
    /// Build a firewall with the native filesystem resolver.
    #[must_use]
    pub fn new(config: FirewallConfig) -> Self {
        Self::with_resolver(config, Arc::new(NativeResolver))
    }

    /// Build a firewall with an injected path resolver.
    #[must_use]
    pub fn with_resolver(config: FirewallConfig, resolver: Arc<dyn PathResolver>) -> Self {
        let policy = load_policy(config.preset.as_deref(), config.policy_path.as_deref());
        let policy_source = config.policy_path.as_ref().map_or_else(
            || format!("preset:{}", config.preset.as_deref().unwrap_or("standard")),
            |p| p.display().to_string(),
        );

        if config.audit_on_start {
            info!(
                mode = %policy.mode,
                source = %policy_source,
                tools = policy.tools.len(),
                deny_unknown_tools = policy.defaults.deny_unknown_tools,
                log = %policy.defaults.log,
                redaction = %policy.defaults.redaction,
                injection = %policy.defaults.injection_mode,
                "firewall policy loaded"
            );
        }

        let ledger = ApprovalLedger::open(&config.state_dir);
        let receipts = ReceiptWriter::new(&config.state_dir);
        let rate_limiter = RateLimiter::new(config.rate_limits.clone());

        Self {
            policy,
            policy_source,
            config,
            ledger,
            receipts,
            rate_limiter,
            resolver,
        }
    }

    /// The effective policy.
    #[must_use]
    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    /// The approval ledger.
    #[must_use]
    pub fn ledger(&self) -> &ApprovalLedger {
        &self.ledger
    }

    /// The receipt writer.
    #[must_use]
    pub fn receipts(&self) -> &ReceiptWriter {
        &self.receipts
    }

    /// Pre-call hook: decide, guard, and resolve approvals for one tool
    /// invocation. Never errors toward the host: the result is either a
    /// passthrough or a well-formed block.
    pub async fn before_tool_call(
        &self,
        event: &ToolCallEvent,
        ctx: &HookContext,
    ) -> PreCallOutcome {
        let name = Policy::normalize_name(&event.tool_name);
        let call = ToolCall {
            tool_name: event.tool_name.clone(),
            params: event.params.clone(),
            context: CallContext {
                agent_id: ctx.agent_id.clone(),
                session_key: ctx.session_key.clone(),
            },
        };

        let mut verdict = evaluate(&self.policy, &call);
        let mut path_guard_reason: Option<String> = None;
        let mut rate_limit_reason: Option<String> = None;

        // Path guard.
        if let Some(rule) = verdict.tool_rule.clone()
            && let Some(hit) = check_paths(&rule, &call.params, self.resolver.as_ref())
        {
            path_guard_reason = Some(hit.reason.clone());
            apply_override(&mut verdict, hit.action, hit.reason);
        }

        // Rate limiter: a denied call is not counted.
        if verdict.decision != Decision::Deny
            && let Some(hit) = self
                .rate_limiter
                .evaluate(&name, ctx.session_key.as_deref())
        {
            rate_limit_reason = Some(hit.reason.clone());
            apply_override(&mut verdict, hit.action, hit.reason);
        }

        // Exec delegation: only when the composed decision is still ASK.
        if verdict.decision == Decision::Ask && verdict.use_exec_approvals && name == "exec" {
            verdict.decision = Decision::Allow;
            verdict.reason = "Exec approval delegated to OpenClaw.".to_string();
        }

        // Param preview and invocation fingerprint. The hash covers the
        // redacted value when redaction applies, the raw value otherwise.
        let redact_params = verdict.redaction.params
            && self.policy.defaults.redaction != RedactionMode::Off;
        let (preview_value, report) = if redact_params {
            redact_value(&call.params, self.policy.defaults.redaction)
        } else {
            (call.params.clone(), RedactionReport::empty())
        };
        let params_hash = ParamsHash::of_value(&preview_value);
        let preview = preview_string(&preview_value);

        // Approval resolution.
        let mut request_id: Option<String> = None;
        if verdict.decision == Decision::Ask {
            let stored_preview = if self.policy.defaults.log == LogMode::Debug {
                preview.clone()
            } else {
                "[redacted]".to_string()
            };
            let request = AskRequest {
                tool_name: name.clone(),
                params_hash: params_hash.clone(),
                params_preview: stored_preview,
                risk: verdict.risk,
                reason: verdict.reason.clone(),
                session_key: ctx.session_key.clone(),
                agent_id: ctx.agent_id.clone(),
            };
            match self.ledger.resolve_ask(request).await {
                Ok(AskResolution::Allowed) => {
                    verdict.decision = Decision::Allow;
                    verdict.reason = "Tool call approved by firewall.".to_string();
                },
                Ok(AskResolution::Blocked { id }) => request_id = Some(id),
                Err(err) => {
                    // The store failed to record state; the call keeps
                    // its computed decision.
                    warn!(tool = %name, error = %err, "approval store write failed");
                    request_id = Some(approval_id(
                        &name,
                        ctx.session_key.as_deref(),
                        &params_hash,
                        verdict.risk,
                    ));
                },
            }
        }

        let outcome = match verdict.decision {
            Decision::Allow => PreCallOutcome::passthrough(call.params.clone()),
            Decision::Deny => {
                PreCallOutcome::block(format!("Firewall denied {name}. {}", verdict.reason))
            },
            Decision::Ask => {
                let id = request_id.clone().unwrap_or_default();
                PreCallOutcome::block(format!(
                    "Firewall approval required for {name}.\n\
                     Reason: {reason}\n\
                     Request ID: {id}\n\
                     Args (redacted): {preview}\n\
                     Approve: /firewall approve {id} once|session\n\
                     Deny: /firewall deny {id}",
                    reason = verdict.reason,
                ))
            },
        };

        debug!(tool = %name, decision = %verdict.decision, "pre-call decision");
        self.write_pre_call_receipt(
            &name,
            ctx,
            &verdict,
            report,
            &params_hash,
            &preview,
            path_guard_reason,
            rate_limit_reason,
            request_id,
        );

        outcome
    }

    /// Post-result hook: redact, size-guard, scan, and transform a tool
    /// result. Returns the replacement message, or `None` to keep the
    /// original.
    pub async fn on_tool_result(
        &self,
        event: &ToolResultEvent,
        ctx: &HookContext,
    ) -> Option<Value> {
        let tool_label = event.tool_name.as_deref().or(ctx.tool_name.as_deref());
        let tool_call_id = event.tool_call_id.as_deref().or(ctx.tool_call_id.as_deref());
        let name = tool_label.map(Policy::normalize_name).unwrap_or_default();
        let rule = if name.is_empty() {
            None
        } else {
            self.policy.find_tool(&name)
        };
        // Unknown tools get the safe flags.
        let redact_result = rule.is_none_or(|r| r.redact_result);
        let scan_result = rule.is_none_or(|r| r.scan_injection);

        let mut message = event.message.clone();
        let mut changed = false;

        // 1. Deep redaction.
        let mut report = RedactionReport::empty();
        if redact_result && self.policy.defaults.redaction != RedactionMode::Off {
            let (redacted, r) = redact_value(&message, self.policy.defaults.redaction);
            if r.redacted {
                message = redacted;
                changed = true;
            }
            report = r;
        }

        // 2. Size guard.
        let mut blocked = false;
        let mut size_guard_meta: Option<Value> = None;
        let mut scannable: Option<String> = None;

        if let Some((text, shape)) = output::extract_text(&message) {
            let limit = self.config.max_result_chars;
            let length = text.chars().count();
            if limit > 0 && length > limit {
                size_guard_meta = Some(json!({
                    "action": self.config.max_result_action.to_string(),
                    "limit": limit,
                    "length": length,
                }));
                match self.config.max_result_action {
                    SizeGuardAction::Block => {
                        message = output::error_result(
                            tool_call_id,
                            tool_label,
                            &format!(
                                "[firewall] Tool output blocked because it exceeded {limit} characters (got {length})."
                            ),
                        );
                        blocked = true;
                        changed = true;
                    },
                    SizeGuardAction::Truncate => {
                        let kept: String = text.chars().take(limit).collect();
                        let new_text = format!(
                            "{kept}\n[firewall] Output truncated to {limit} characters."
                        );
                        message = output::replace_text(&message, shape, &new_text);
                        scannable = Some(new_text);
                        changed = true;
                    },
                }
            } else {
                scannable = Some(text);
            }
        }

        // 3. Injection scan.
        let mut findings: Option<ScanOutcome> = None;
        if scan_result
            && !blocked
            && let Some(text) = &scannable
        {
            let outcome = scan_text(text);
            if outcome.flagged {
                match self.policy.defaults.injection_mode {
                    InjectionMode::Shadow => {},
                    InjectionMode::Alert => {
                        if let Some((_, shape)) = output::extract_text(&message) {
                            message = output::append_warning(
                                &message,
                                shape,
                                &format!(
                                    "[firewall] Potential prompt injection detected: {}",
                                    outcome.summary()
                                ),
                            );
                            changed = true;
                        }
                    },
                    InjectionMode::Block => {
                        message = output::error_result(
                            tool_call_id,
                            tool_label,
                            &format!(
                                "[firewall] Tool output blocked due to potential prompt injection. Findings: {}",
                                outcome.summary()
                            ),
                        );
                        changed = true;
                    },
                }
                findings = Some(outcome);
            }
        }

        // 4. Receipt.
        let mut receipt = Receipt::new(tool_label.unwrap_or("unknown"))
            .with_context(ctx.session_key.as_deref(), ctx.agent_id.as_deref())
            .with_redaction(report)
            .with_metadata("event", json!("tool_result"));
        if let Some(meta) = size_guard_meta {
            receipt = receipt.with_metadata("sizeGuard", meta);
        }
        if let Some(id) = tool_call_id {
            receipt = receipt.with_metadata("toolCallId", json!(id));
        }
        if let Some(outcome) = &findings {
            receipt = receipt
                .with_injection(self.policy.defaults.injection_mode, outcome.findings.clone());
        }
        self.write_receipt(receipt.seal());

        changed.then_some(message)
    }

    #[allow(clippy::too_many_arguments)]
    fn write_pre_call_receipt(
        &self,
        name: &str,
        ctx: &HookContext,
        verdict: &FirewallDecision,
        report: RedactionReport,
        params_hash: &ParamsHash,
        preview: &str,
        path_guard_reason: Option<String>,
        rate_limit_reason: Option<String>,
        request_id: Option<String>,
    ) {
        let mut receipt = Receipt::new(name)
            .with_decision(verdict.decision, verdict.risk, verdict.reason.clone())
            .with_context(ctx.session_key.as_deref(), ctx.agent_id.as_deref())
            .with_redaction(report)
            .with_metadata("policySource", json!(self.policy_source))
            .with_metadata("paramsHash", json!(params_hash.as_str()));
        if let Some(reason) = path_guard_reason {
            receipt = receipt.with_metadata("pathGuard", json!(reason));
        }
        if let Some(reason) = rate_limit_reason {
            receipt = receipt.with_metadata("rateLimit", json!(reason));
        }
        if let Some(id) = request_id {
            receipt = receipt.with_metadata("requestId", json!(id));
        }
        if self.policy.defaults.log == LogMode::Debug {
            receipt = receipt.with_metadata("paramsPreview", json!(preview));
        }
        self.write_receipt(receipt.seal());
    }

    pub(crate) fn write_receipt(&self, receipt: Receipt) {
        if let Err(err) = self.receipts.append(&receipt) {
            warn!(error = %err, "failed to write receipt");
        }
    }
}

impl std::fmt::Debug for Firewall {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Firewall")
            .field("mode", &self.policy.mode)
            .field("policy_source", &self.policy_source)
            .finish_non_exhaustive()
    }
}

/// Monotonic guard composition: an override applies only when it is more
/// restrictive than the current decision; its reason then replaces the
/// decision reason.
fn apply_override(verdict: &mut FirewallDecision, action: Decision, reason: String) {
    if action.rank() > verdict.decision.rank() {
        verdict.decision = action;
        verdict.reason = reason;
    }
}

/// Stable-serialized preview, capped at [`PREVIEW_MAX_CHARS`].
fn preview_string(value: &Value) -> String {
    match stable_string(value) {
        Ok(s) => {
            if s.chars().count() > PREVIEW_MAX_CHARS {
                let kept: String = s.chars().take(PREVIEW_MAX_CHARS).collect();
                format!("{kept}...")
            } else {
                s
            }
        },
        Err(_) => UNSERIALIZABLE_PARAMS.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use palisade_core::Risk;
    use palisade_policy::RedactionPlan;
    use serde_json::json;

    fn verdict(decision: Decision) -> FirewallDecision {
        FirewallDecision {
            decision,
            reason: "base reason".to_string(),
            risk: Risk::Read,
            redaction: RedactionPlan {
                params: true,
                result: true,
            },
            scan_injection: true,
            use_exec_approvals: false,
            tool_rule: None,
        }
    }

    // -----------------------------------------------------------------------
    // Override composition
    // -----------------------------------------------------------------------

    #[test]
    fn override_only_upgrades() {
        let mut v = verdict(Decision::Allow);
        apply_override(&mut v, Decision::Ask, "upgraded".to_string());
        assert_eq!(v.decision, Decision::Ask);
        assert_eq!(v.reason, "upgraded");

        // A weaker override does not downgrade.
        apply_override(&mut v, Decision::Allow, "weaker".to_string());
        assert_eq!(v.decision, Decision::Ask);
        assert_eq!(v.reason, "upgraded");
    }

    #[test]
    fn equal_rank_override_is_a_noop() {
        let mut v = verdict(Decision::Ask);
        apply_override(&mut v, Decision::Ask, "other ask".to_string());
        assert_eq!(v.reason, "base reason");
    }

    #[test]
    fn composition_is_max_rank_over_all_overrides() {
        let overrides = [Decision::Ask, Decision::Deny, Decision::Ask];
        let mut v = verdict(Decision::Allow);
        for (i, o) in overrides.iter().enumerate() {
            apply_override(&mut v, *o, format!("override {i}"));
        }
        assert_eq!(v.decision, Decision::Deny);
    }

    // -----------------------------------------------------------------------
    // Previews
    // -----------------------------------------------------------------------

    #[test]
    fn preview_is_stable_and_capped() {
        let small = preview_string(&json!({"b": 1, "a": 2}));
        assert_eq!(small, r#"{"a":2,"b":1}"#);

        let big = preview_string(&json!({"data": "x".repeat(2000)}));
        assert!(big.ends_with("..."));
        assert_eq!(big.chars().count(), PREVIEW_MAX_CHARS + 3);
    }
}
