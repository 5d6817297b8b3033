//! Built-in policy presets.
//!
//! Presets are hard-coded variants of the DEFAULT policy: deterministic,
//! no file IO. The loader merges an optional override file on top of the
//! selected preset.

use std::fmt;

use palisade_core::Decision;
use palisade_redact::RedactionMode;
use palisade_scan::InjectionMode;

use crate::policy::{LogMode, Policy, PolicyDefaults, RiskActions};

/// The built-in presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Preset {
    /// Tight defaults: strict redaction, injection blocking, critical
    /// tools denied.
    Strict,
    /// The DEFAULT policy.
    Standard,
    /// Loose defaults for local development: unknown tools allowed to
    /// ask, debug previews.
    Dev,
}

impl Preset {
    /// Parse a preset name case-insensitively, `None` for unknown values.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" => Some(Self::Strict),
            "standard" => Some(Self::Standard),
            "dev" => Some(Self::Dev),
            _ => None,
        }
    }

    /// Materialize the preset as a base policy (no tools yet; the loader
    /// splices the baseline set and user entries afterwards).
    #[must_use]
    pub fn base_policy(self) -> Policy {
        match self {
            Self::Standard => default_policy(),
            Self::Strict => Policy {
                mode: "strict".to_string(),
                defaults: PolicyDefaults {
                    redaction: RedactionMode::Strict,
                    injection_mode: InjectionMode::Block,
                    ..default_policy().defaults
                },
                risk: RiskActions {
                    read: Decision::Allow,
                    write: Decision::Ask,
                    critical: Decision::Deny,
                    unknown: Decision::Deny,
                },
                tools: Vec::new(),
            },
            Self::Dev => Policy {
                mode: "dev".to_string(),
                defaults: PolicyDefaults {
                    deny_unknown_tools: false,
                    unknown_tool_action: Decision::Ask,
                    log: LogMode::Debug,
                    redaction: RedactionMode::Standard,
                    injection_mode: InjectionMode::Alert,
                },
                risk: RiskActions {
                    read: Decision::Allow,
                    write: Decision::Allow,
                    critical: Decision::Ask,
                    unknown: Decision::Allow,
                },
                tools: Vec::new(),
            },
        }
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Strict => write!(f, "strict"),
            Self::Standard => write!(f, "standard"),
            Self::Dev => write!(f, "dev"),
        }
    }
}

/// The hard-coded DEFAULT policy every load starts from.
#[must_use]
pub fn default_policy() -> Policy {
    Policy {
        mode: "standard".to_string(),
        defaults: PolicyDefaults {
            deny_unknown_tools: true,
            unknown_tool_action: Decision::Deny,
            log: LogMode::Safe,
            redaction: RedactionMode::Standard,
            injection_mode: InjectionMode::Alert,
        },
        risk: RiskActions {
            read: Decision::Allow,
            write: Decision::Ask,
            critical: Decision::Ask,
            unknown: Decision::Ask,
        },
        tools: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preset_parsing() {
        assert_eq!(Preset::parse("STRICT"), Some(Preset::Strict));
        assert_eq!(Preset::parse(" dev "), Some(Preset::Dev));
        assert_eq!(Preset::parse("paranoid"), None);
    }

    #[test]
    fn standard_is_the_default_policy() {
        assert_eq!(Preset::Standard.base_policy(), default_policy());
    }

    #[test]
    fn strict_tightens_without_loosening() {
        let standard = default_policy();
        let strict = Preset::Strict.base_policy();
        assert!(strict.risk.critical.rank() >= standard.risk.critical.rank());
        assert!(strict.risk.unknown.rank() >= standard.risk.unknown.rank());
        assert_eq!(strict.defaults.redaction, RedactionMode::Strict);
        assert_eq!(strict.defaults.injection_mode, InjectionMode::Block);
    }

    #[test]
    fn dev_allows_unknown_tools_to_proceed() {
        let dev = Preset::Dev.base_policy();
        assert!(!dev.defaults.deny_unknown_tools);
        assert_eq!(dev.defaults.log, LogMode::Debug);
    }
}
