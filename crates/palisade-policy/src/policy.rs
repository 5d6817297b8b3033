//! The canonical [`Policy`]: what a firewall instance actually runs.
//!
//! Built once at load time by [`crate::load_policy`], immutable
//! thereafter. Invariants: every default decision field is populated, all
//! four risk entries are populated, `tools` carries no duplicate
//! normalized names, and the baseline tool set is always present.

use serde::{Deserialize, Serialize};
use std::fmt;

use palisade_core::{Decision, Risk};
use palisade_redact::RedactionMode;
use palisade_scan::InjectionMode;

use crate::rule::NormalizedToolRule;

/// How much detail receipts and approval previews carry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogMode {
    /// Previews are stored as the literal `[redacted]`.
    #[default]
    Safe,
    /// Redacted previews are stored verbatim.
    Debug,
}

impl LogMode {
    /// Parse a mode string case-insensitively, `None` for unknown values.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "safe" => Some(Self::Safe),
            "debug" => Some(Self::Debug),
            _ => None,
        }
    }
}

impl fmt::Display for LogMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Safe => write!(f, "safe"),
            Self::Debug => write!(f, "debug"),
        }
    }
}

/// Policy-wide defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyDefaults {
    /// Route unknown tools through `unknown_tool_action` instead of the
    /// risk mapping.
    pub deny_unknown_tools: bool,
    /// Decision for unknown tools when `deny_unknown_tools` is set.
    pub unknown_tool_action: Decision,
    /// Preview verbosity.
    pub log: LogMode,
    /// Redaction mode for params and results.
    pub redaction: RedactionMode,
    /// What the output pipeline does with flagged results.
    pub injection_mode: InjectionMode,
}

/// Decision per risk band, used when a rule has no explicit action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskActions {
    /// Decision for `read` risk.
    pub read: Decision,
    /// Decision for `write` risk.
    pub write: Decision,
    /// Decision for `critical` risk.
    pub critical: Decision,
    /// Decision for `unknown` risk.
    pub unknown: Decision,
}

impl RiskActions {
    /// Look up the decision for a risk band.
    #[must_use]
    pub const fn for_risk(&self, risk: Risk) -> Decision {
        match risk {
            Risk::Read => self.read,
            Risk::Write => self.write,
            Risk::Critical => self.critical,
            Risk::Unknown => self.unknown,
        }
    }
}

/// The canonical policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    /// Mode label (preset name or override's `mode` field).
    pub mode: String,
    /// Policy-wide defaults.
    pub defaults: PolicyDefaults,
    /// Risk-band fallback decisions.
    pub risk: RiskActions,
    /// Normalized tool rules, no duplicate names, baseline included.
    pub tools: Vec<NormalizedToolRule>,
}

impl Policy {
    /// Look up a rule by normalized tool name.
    #[must_use]
    pub fn find_tool(&self, normalized_name: &str) -> Option<&NormalizedToolRule> {
        self.tools.iter().find(|t| t.name == normalized_name)
    }

    /// Normalize a host-reported tool name for lookup.
    #[must_use]
    pub fn normalize_name(name: &str) -> String {
        name.trim().to_ascii_lowercase()
    }
}
