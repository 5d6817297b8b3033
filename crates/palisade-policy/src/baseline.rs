//! The baseline tool set.
//!
//! Every policy carries these rules after normalization; user entries
//! override them by normalized name (field-wise). Baseline defaults:
//! `redactParams`, `redactResult`, and `scanInjection` all on, and `exec`
//! delegates its ASKs to the host's own approval flow.

use crate::rule::ToolRule;

/// Build one baseline rule.
fn tool(name: &str, risk: &str) -> ToolRule {
    ToolRule {
        name: Some(name.to_string()),
        risk: Some(risk.to_string()),
        redact_params: Some(true),
        redact_result: Some(true),
        scan_injection: Some(true),
        ..ToolRule::default()
    }
}

/// The baseline rules, in splice order.
#[must_use]
pub fn baseline_rules() -> Vec<ToolRule> {
    vec![
        tool("read", "read"),
        tool("write", "write"),
        tool("edit", "write"),
        tool("apply_patch", "write"),
        ToolRule {
            use_exec_approvals: Some(true),
            ..tool("exec", "critical")
        },
        tool("process", "critical"),
        tool("agents_list", "read"),
        tool("browser", "write"),
        tool("canvas", "read"),
        tool("cron", "write"),
        tool("gateway", "critical"),
        tool("image", "read"),
        tool("message", "write"),
        tool("nodes", "critical"),
        tool("session_status", "read"),
        tool("sessions_history", "read"),
        tool("sessions_list", "read"),
        tool("sessions_send", "write"),
        tool("sessions_spawn", "critical"),
        tool("tts", "read"),
        tool("web_fetch", "read"),
        tool("web_search", "read"),
        tool("memory_search", "read"),
        tool("memory_get", "read"),
    ]
}
