//! Policy loading: DEFAULT ← preset ← override file, then the baseline
//! splice and user-rule fold.
//!
//! The loader never fails. A missing or malformed override file, an
//! unknown preset name, or a bad enum value inside an otherwise valid
//! file all degrade with a warning; the affected layer keeps its base
//! value. The firewall must always come up with a usable policy.

use serde::Deserialize;
use std::path::Path;
use tracing::{debug, warn};

use palisade_core::Decision;
use palisade_redact::RedactionMode;
use palisade_scan::InjectionMode;

use crate::baseline::baseline_rules;
use crate::error::{PolicyError, PolicyResult};
use crate::policy::{LogMode, Policy};
use crate::preset::Preset;
use crate::rule::{ToolRule, normalize_rule};

/// Maximum allowed policy file size (1 MB).
const MAX_POLICY_FILE_SIZE: u64 = 1_048_576;

/// Raw shape of a policy override file. Decisions and modes stay strings
/// so one bad value degrades one field, not the whole file.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PolicyFile {
    mode: Option<String>,
    defaults: Option<RawDefaults>,
    risk: Option<RawRisk>,
    tools: Option<Vec<ToolRule>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawDefaults {
    deny_unknown_tools: Option<bool>,
    unknown_tool_action: Option<String>,
    log: Option<String>,
    redaction: Option<String>,
    injection: Option<RawInjection>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawInjection {
    mode: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawRisk {
    read: Option<String>,
    write: Option<String>,
    critical: Option<String>,
    unknown: Option<String>,
}

/// Load the canonical policy.
///
/// `preset` selects one of `strict`/`standard`/`dev` (unknown names warn
/// and fall back to `standard`); `override_path` points at an optional
/// YAML override file merged on top.
#[must_use]
pub fn load_policy(preset: Option<&str>, override_path: Option<&Path>) -> Policy {
    let preset = match preset {
        None => Preset::Standard,
        Some(name) => Preset::parse(name).unwrap_or_else(|| {
            warn!(preset = name, "unknown preset, falling back to standard");
            Preset::Standard
        }),
    };
    let mut policy = preset.base_policy();

    let mut override_tools = Vec::new();
    if let Some(path) = override_path {
        match read_policy_file(path) {
            Ok(file) => {
                debug!(path = %path.display(), "loaded policy override");
                override_tools = file.tools.clone().unwrap_or_default();
                apply_override(&mut policy, file);
            },
            Err(err) => {
                warn!(path = %path.display(), error = %err, "policy override unusable, continuing with preset");
            },
        }
    }

    // Baseline splice, then user entries folded over it by normalized
    // name (field-wise merge, later entries win).
    let mut folded: Vec<(String, ToolRule)> = Vec::new();
    for raw in baseline_rules().into_iter().chain(override_tools) {
        let Some(key) = raw.normalized_name() else {
            warn!("tool rule without a name, skipping");
            continue;
        };
        if let Some((_, existing)) = folded.iter_mut().find(|(k, _)| *k == key) {
            existing.merge_from(raw);
        } else {
            folded.push((key, raw));
        }
    }

    policy.tools = folded
        .iter()
        .filter_map(|(_, raw)| normalize_rule(raw, &policy.risk))
        .collect();

    policy
}

/// Read and parse an override file, enforcing the size cap.
fn read_policy_file(path: &Path) -> PolicyResult<PolicyFile> {
    let content = std::fs::read_to_string(path).map_err(|e| PolicyError::ReadError {
        path: path.display().to_string(),
        source: e,
    })?;

    if content.len() as u64 > MAX_POLICY_FILE_SIZE {
        return Err(PolicyError::TooLarge {
            path: path.display().to_string(),
            size: content.len() as u64,
            limit: MAX_POLICY_FILE_SIZE,
        });
    }

    serde_yaml::from_str(&content).map_err(|e| PolicyError::ParseError {
        path: path.display().to_string(),
        source: e,
    })
}

/// Merge an override file over the base policy, field-wise, warning on
/// unknown enum values and keeping the base value for them.
fn apply_override(policy: &mut Policy, file: PolicyFile) {
    if let Some(mode) = file.mode
        && !mode.trim().is_empty()
    {
        policy.mode = mode.trim().to_string();
    }

    if let Some(defaults) = file.defaults {
        if let Some(flag) = defaults.deny_unknown_tools {
            policy.defaults.deny_unknown_tools = flag;
        }
        merge_decision(
            &mut policy.defaults.unknown_tool_action,
            defaults.unknown_tool_action.as_deref(),
            "defaults.unknownToolAction",
        );
        if let Some(log) = defaults.log.as_deref() {
            match LogMode::parse(log) {
                Some(mode) => policy.defaults.log = mode,
                None => warn!(value = log, "unknown log mode, keeping base value"),
            }
        }
        if let Some(redaction) = defaults.redaction.as_deref() {
            match RedactionMode::parse(redaction) {
                Some(mode) => policy.defaults.redaction = mode,
                None => warn!(value = redaction, "unknown redaction mode, keeping base value"),
            }
        }
        if let Some(mode) = defaults.injection.and_then(|i| i.mode) {
            match InjectionMode::parse(&mode) {
                Some(parsed) => policy.defaults.injection_mode = parsed,
                None => warn!(value = %mode, "unknown injection mode, keeping base value"),
            }
        }
    }

    if let Some(risk) = file.risk {
        merge_decision(&mut policy.risk.read, risk.read.as_deref(), "risk.read");
        merge_decision(&mut policy.risk.write, risk.write.as_deref(), "risk.write");
        merge_decision(
            &mut policy.risk.critical,
            risk.critical.as_deref(),
            "risk.critical",
        );
        merge_decision(
            &mut policy.risk.unknown,
            risk.unknown.as_deref(),
            "risk.unknown",
        );
    }
}

fn merge_decision(slot: &mut Decision, value: Option<&str>, field: &str) {
    if let Some(s) = value {
        match Decision::parse(s) {
            Some(decision) => *slot = decision,
            None => warn!(field, value = s, "unknown decision, keeping base value"),
        }
    }
}
