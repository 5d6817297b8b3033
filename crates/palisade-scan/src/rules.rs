//! The fixed injection rule set.
//!
//! Rules are identified by a stable id and carry a severity band. The
//! set is deliberately small and deterministic: the scanner's job is to
//! flag the obvious instruction-shaped content in untrusted output, not
//! to be a classifier.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

/// Severity band of an injection rule.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Suspicious phrasing, often benign.
    Low,
    /// Content that targets credentials or roles.
    Medium,
    /// Direct instruction override or tool coercion.
    High,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
        }
    }
}

/// One scanner rule.
pub struct InjectionRule {
    /// Stable rule id, e.g. `ignore_instructions`.
    pub id: &'static str,
    /// Severity attached to findings of this rule.
    pub severity: Severity,
    /// Human-readable description attached to findings.
    pub message: &'static str,
    pub(crate) regex: Regex,
}

impl InjectionRule {
    fn new(id: &'static str, severity: Severity, message: &'static str, pattern: &str) -> Self {
        Self {
            id,
            severity,
            message,
            regex: Regex::new(pattern).expect("invalid injection rule pattern"),
        }
    }
}

static RULES: LazyLock<Vec<InjectionRule>> = LazyLock::new(|| {
    vec![
        InjectionRule::new(
            "ignore_instructions",
            Severity::High,
            "Attempts to override prior instructions",
            r"(?i)\bignore\s+(?:all|previous|above)\s+instructions\b",
        ),
        InjectionRule::new(
            "system_prompt",
            Severity::High,
            "References the system prompt or impersonates the assistant",
            r"(?i)\bsystem\s+prompt\b|\byou\s+are\s+chatgpt\b",
        ),
        InjectionRule::new(
            "tool_call_coercion",
            Severity::High,
            "Coerces the agent into making tool calls",
            r"(?i)\bcall\s+the\s+tool\b|\binvoke\s+tool\b|\bexecute\s+tool\b",
        ),
        InjectionRule::new(
            "credential_theft",
            Severity::Medium,
            "Solicits credentials or key material",
            r"(?i)\bapi\s+key\b|\bpassword\b|\bseed\s+phrase\b|\bprivate\s+key\b",
        ),
        InjectionRule::new(
            "role_impersonation",
            Severity::Medium,
            "Impersonates a privileged conversation role",
            r"(?i)\b(?:system|developer)\s*:",
        ),
        InjectionRule::new(
            "data_exfiltration",
            Severity::Medium,
            "Directs data to an external destination",
            r"(?i)\bexfiltrate\b|\bupload\s+to\b|\bsend\s+(?:all|everything)\b",
        ),
        InjectionRule::new(
            "overrides",
            Severity::Low,
            "Pressure phrasing aimed at compliance",
            r"(?i)\bdo\s+not\s+refuse\b|\boverride\b|\bmust\s+comply\b",
        ),
    ]
});

/// The full rule set, in scan order.
#[must_use]
pub fn rules() -> &'static [InjectionRule] {
    &RULES
}
