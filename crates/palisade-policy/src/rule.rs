//! Tool rules: the raw, permissive shape read from policy files and the
//! normalized projection the engine runs on.
//!
//! The two are distinct record types linked by [`normalize_rule`], a pure
//! function. Raw rules keep decisions and risks as strings so that an
//! unknown enum value in one field degrades that field (with a warning)
//! instead of failing the whole policy file.

use serde::{Deserialize, Serialize};
use tracing::warn;

use palisade_core::{Decision, Risk};

use crate::policy::RiskActions;

/// Legacy `allow` alias on tool rules: `true`, `false`, `"ask"`, `"deny"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AllowAlias {
    /// Boolean form: `true` allows, `false` denies.
    Flag(bool),
    /// String form: `"ask"` or `"deny"`.
    Named(String),
}

impl AllowAlias {
    /// Resolve the alias to a decision. Unknown strings warn and resolve
    /// to `None` so the next resolution step applies.
    fn decision(&self, rule_name: &str) -> Option<Decision> {
        match self {
            Self::Flag(true) => Some(Decision::Allow),
            Self::Flag(false) => Some(Decision::Deny),
            Self::Named(s) => match s.trim().to_ascii_lowercase().as_str() {
                "ask" => Some(Decision::Ask),
                "deny" => Some(Decision::Deny),
                other => {
                    warn!(rule = rule_name, value = other, "unknown allow alias, ignoring");
                    None
                },
            },
        }
    }
}

/// A tool rule as written in a policy file (or in the baseline table).
///
/// Every field is optional; later rules for the same normalized name
/// merge field-wise over earlier ones.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolRule {
    /// Tool name. A rule without one is skipped with a warning.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Risk band (`read`/`write`/`critical`/`unknown`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk: Option<String>,
    /// Explicit decision (`ALLOW`/`DENY`/`ASK`, case-insensitive).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    /// Legacy alias: `true`/`false`/`"ask"`/`"deny"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow: Option<AllowAlias>,
    /// Ordered path prefixes the tool may touch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_paths: Option<Vec<String>>,
    /// Decision applied when a path falls outside the allowlist.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path_action: Option<String>,
    /// Redact parameters before previews and hashing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redact_params: Option<bool>,
    /// Redact the tool result before persistence.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redact_result: Option<bool>,
    /// Scan the tool result for prompt injection.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scan_injection: Option<bool>,
    /// Delegate ASK decisions for `exec` to the host's own approval flow.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_exec_approvals: Option<bool>,
}

impl ToolRule {
    /// Convenience constructor for baseline and test rules.
    #[must_use]
    pub fn named(name: &str) -> Self {
        Self {
            name: Some(name.to_string()),
            ..Self::default()
        }
    }

    /// The normalized lookup key for this rule, if it has a usable name.
    #[must_use]
    pub fn normalized_name(&self) -> Option<String> {
        let name = self.name.as_deref()?.trim().to_ascii_lowercase();
        if name.is_empty() { None } else { Some(name) }
    }

    /// Merge `over` into `self` field-wise: set fields of the later rule
    /// win, unset fields keep the earlier value.
    pub fn merge_from(&mut self, over: ToolRule) {
        if over.risk.is_some() {
            self.risk = over.risk;
        }
        if over.action.is_some() {
            self.action = over.action;
        }
        if over.allow.is_some() {
            self.allow = over.allow;
        }
        if over.allow_paths.is_some() {
            self.allow_paths = over.allow_paths;
        }
        if over.path_action.is_some() {
            self.path_action = over.path_action;
        }
        if over.redact_params.is_some() {
            self.redact_params = over.redact_params;
        }
        if over.redact_result.is_some() {
            self.redact_result = over.redact_result;
        }
        if over.scan_injection.is_some() {
            self.scan_injection = over.scan_injection;
        }
        if over.use_exec_approvals.is_some() {
            self.use_exec_approvals = over.use_exec_approvals;
        }
    }
}

/// Deterministic projection of a [`ToolRule`] the engine runs on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedToolRule {
    /// Lowercased, trimmed tool name.
    pub name: String,
    /// Risk band, `unknown` if unset or unparseable.
    pub risk: Risk,
    /// Resolved decision for the tool.
    pub action: Decision,
    /// Path prefixes, present only if non-empty after filtering.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_paths: Option<Vec<String>>,
    /// Decision when a path is outside the allowlist.
    pub path_action: Decision,
    /// Redact parameters for previews and hashing.
    pub redact_params: bool,
    /// Redact the result message.
    pub redact_result: bool,
    /// Scan the result for injection.
    pub scan_injection: bool,
    /// Delegate `exec` ASKs to the host.
    pub use_exec_approvals: bool,
}

/// Normalize one raw rule against the policy's risk mapping.
///
/// Returns `None` (with a warning) for rules missing a usable name.
/// Decision resolution order: explicit `action`, then the legacy `allow`
/// alias, then the risk mapping for the rule's (defaulted) risk.
#[must_use]
pub fn normalize_rule(raw: &ToolRule, risk_actions: &RiskActions) -> Option<NormalizedToolRule> {
    let Some(name) = raw.normalized_name() else {
        warn!("tool rule without a name, skipping");
        return None;
    };

    let risk = match raw.risk.as_deref() {
        None => Risk::Unknown,
        Some(s) => Risk::parse(s).unwrap_or_else(|| {
            warn!(rule = %name, value = s, "unknown risk, defaulting to unknown");
            Risk::Unknown
        }),
    };

    let action = raw
        .action
        .as_deref()
        .and_then(|s| {
            let parsed = Decision::parse(s);
            if parsed.is_none() {
                warn!(rule = %name, value = s, "unknown action, falling back");
            }
            parsed
        })
        .or_else(|| raw.allow.as_ref().and_then(|a| a.decision(&name)))
        .unwrap_or_else(|| risk_actions.for_risk(risk));

    let allow_paths = raw.allow_paths.as_ref().and_then(|paths| {
        let filtered: Vec<String> = paths.iter().filter(|p| !p.is_empty()).cloned().collect();
        if filtered.is_empty() { None } else { Some(filtered) }
    });

    let path_action = match raw.path_action.as_deref() {
        None => Decision::Ask,
        Some(s) => Decision::parse(s).unwrap_or_else(|| {
            warn!(rule = %name, value = s, "unknown pathAction, defaulting to ASK");
            Decision::Ask
        }),
    };

    Some(NormalizedToolRule {
        name,
        risk,
        action,
        allow_paths,
        path_action,
        redact_params: raw.redact_params.unwrap_or(true),
        redact_result: raw.redact_result.unwrap_or(true),
        scan_injection: raw.scan_injection.unwrap_or(true),
        use_exec_approvals: raw.use_exec_approvals.unwrap_or(false),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::RiskActions;

    fn risk_actions() -> RiskActions {
        RiskActions {
            read: Decision::Allow,
            write: Decision::Ask,
            critical: Decision::Ask,
            unknown: Decision::Deny,
        }
    }

    // -----------------------------------------------------------------------
    // Normalization
    // -----------------------------------------------------------------------

    #[test]
    fn name_is_lowercased_and_trimmed() {
        let raw = ToolRule::named("  Write ");
        let rule = normalize_rule(&raw, &risk_actions()).unwrap();
        assert_eq!(rule.name, "write");
    }

    #[test]
    fn missing_name_is_skipped() {
        assert!(normalize_rule(&ToolRule::default(), &risk_actions()).is_none());
        let blank = ToolRule {
            name: Some("   ".into()),
            ..ToolRule::default()
        };
        assert!(normalize_rule(&blank, &risk_actions()).is_none());
    }

    #[test]
    fn explicit_action_wins() {
        let raw = ToolRule {
            action: Some("deny".into()),
            allow: Some(AllowAlias::Flag(true)),
            risk: Some("read".into()),
            ..ToolRule::named("t")
        };
        let rule = normalize_rule(&raw, &risk_actions()).unwrap();
        assert_eq!(rule.action, Decision::Deny);
    }

    #[test]
    fn allow_alias_forms() {
        for (alias, expected) in [
            (AllowAlias::Flag(true), Decision::Allow),
            (AllowAlias::Flag(false), Decision::Deny),
            (AllowAlias::Named("ask".into()), Decision::Ask),
            (AllowAlias::Named("deny".into()), Decision::Deny),
        ] {
            let raw = ToolRule {
                allow: Some(alias),
                ..ToolRule::named("t")
            };
            assert_eq!(
                normalize_rule(&raw, &risk_actions()).unwrap().action,
                expected
            );
        }
    }

    #[test]
    fn risk_mapping_is_the_fallback() {
        let raw = ToolRule {
            risk: Some("read".into()),
            ..ToolRule::named("t")
        };
        assert_eq!(
            normalize_rule(&raw, &risk_actions()).unwrap().action,
            Decision::Allow
        );

        // No risk at all: defaults to unknown.
        let raw = ToolRule::named("t");
        let rule = normalize_rule(&raw, &risk_actions()).unwrap();
        assert_eq!(rule.risk, Risk::Unknown);
        assert_eq!(rule.action, Decision::Deny);
    }

    #[test]
    fn unknown_action_string_falls_back_to_risk() {
        let raw = ToolRule {
            action: Some("maybe".into()),
            risk: Some("read".into()),
            ..ToolRule::named("t")
        };
        assert_eq!(
            normalize_rule(&raw, &risk_actions()).unwrap().action,
            Decision::Allow
        );
    }

    #[test]
    fn allow_paths_filtering() {
        let raw = ToolRule {
            allow_paths: Some(vec![String::new(), "/tmp".into()]),
            ..ToolRule::named("t")
        };
        let rule = normalize_rule(&raw, &risk_actions()).unwrap();
        assert_eq!(rule.allow_paths, Some(vec!["/tmp".to_string()]));

        let raw = ToolRule {
            allow_paths: Some(vec![String::new()]),
            ..ToolRule::named("t")
        };
        assert_eq!(normalize_rule(&raw, &risk_actions()).unwrap().allow_paths, None);
    }

    #[test]
    fn flag_defaults() {
        let rule = normalize_rule(&ToolRule::named("t"), &risk_actions()).unwrap();
        assert!(rule.redact_params);
        assert!(rule.redact_result);
        assert!(rule.scan_injection);
        assert!(!rule.use_exec_approvals);
        assert_eq!(rule.path_action, Decision::Ask);
    }

    // -----------------------------------------------------------------------
    // Field-wise merge
    // -----------------------------------------------------------------------

    #[test]
    fn merge_later_set_fields_win() {
        let mut base = ToolRule {
            risk: Some("write".into()),
            action: Some("ask".into()),
            redact_params: Some(true),
            ..ToolRule::named("write")
        };
        base.merge_from(ToolRule {
            action: Some("allow".into()),
            ..ToolRule::named("write")
        });
        assert_eq!(base.action.as_deref(), Some("allow"));
        // Unset fields keep the earlier value.
        assert_eq!(base.risk.as_deref(), Some("write"));
        assert_eq!(base.redact_params, Some(true));
    }
}
