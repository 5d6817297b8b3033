//! The path guard: extract path arguments per tool and match them
//! against the rule's allowlist.

use serde_json::Value;
use std::path::PathBuf;
use tracing::debug;

use palisade_core::Decision;
use palisade_policy::NormalizedToolRule;

use crate::resolver::PathResolver;

/// Reason when a tool with an allowlist supplied no path argument.
const NO_PATH_REASON: &str = "No path argument found for path allowlist enforcement.";

/// Reason when a candidate falls outside the allowlist.
const OUTSIDE_REASON: &str = "Path guard: Path is outside the allowed path list.";

/// A guard override: upgrade the decision to `action` with `reason`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardOverride {
    /// The decision the guard wants (composed by rank upstream).
    pub action: Decision,
    /// Why.
    pub reason: String,
}

/// Singular path keys, probed in order.
const PATH_KEYS: [&str; 3] = ["path", "file_path", "filePath"];

/// Array path keys, all merged.
const PATH_LIST_KEYS: [&str; 3] = ["paths", "file_paths", "filePaths"];

/// Markers that introduce a path in an `apply_patch` input.
const PATCH_MARKERS: [&str; 4] = [
    "*** Add File: ",
    "*** Update File: ",
    "*** Delete File: ",
    "*** Move to: ",
];

/// Extract candidate path strings from tool parameters.
///
/// `apply_patch` scans its `input` string line-by-line for file markers;
/// every other tool reads the first present singular key
/// (`path`/`file_path`/`filePath`) and merges any of the array keys
/// (`paths`/`file_paths`/`filePaths`). Candidates are de-duplicated with
/// order preserved.
#[must_use]
pub fn extract_candidates(tool_name: &str, params: &Value) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    let mut push = |candidate: &str| {
        if !candidate.is_empty() && !out.iter().any(|c| c == candidate) {
            out.push(candidate.to_string());
        }
    };

    if tool_name == "apply_patch" {
        if let Some(input) = params.get("input").and_then(Value::as_str) {
            for line in input.lines() {
                for marker in PATCH_MARKERS {
                    if let Some(rest) = line.strip_prefix(marker) {
                        push(rest.trim());
                    }
                }
            }
        }
        return out;
    }

    for key in PATH_KEYS {
        if let Some(path) = params.get(key).and_then(Value::as_str) {
            push(path);
            break;
        }
    }
    for key in PATH_LIST_KEYS {
        if let Some(items) = params.get(key).and_then(Value::as_array) {
            for item in items {
                if let Some(path) = item.as_str() {
                    push(path);
                }
            }
        }
    }
    out
}

/// Check a call's paths against the rule's allowlist.
///
/// Returns `None` when the rule has no allowlist or every candidate is
/// covered. Candidates and prefixes both go through the resolver and are
/// absolutized; resolver failures drop the affected entry.
#[must_use]
pub fn check_paths(
    rule: &NormalizedToolRule,
    params: &Value,
    resolver: &dyn PathResolver,
) -> Option<GuardOverride> {
    let prefixes = rule.allow_paths.as_ref()?;

    let allowed: Vec<PathBuf> = prefixes
        .iter()
        .filter_map(|p| resolve(resolver, p))
        .collect();

    let candidates: Vec<PathBuf> = extract_candidates(&rule.name, params)
        .iter()
        .filter_map(|c| resolve(resolver, c))
        .collect();

    if candidates.is_empty() {
        return Some(GuardOverride {
            action: rule.path_action,
            reason: NO_PATH_REASON.to_string(),
        });
    }

    let all_covered = candidates
        .iter()
        .all(|candidate| allowed.iter().any(|prefix| candidate.starts_with(prefix)));

    if all_covered {
        None
    } else {
        Some(GuardOverride {
            action: rule.path_action,
            reason: OUTSIDE_REASON.to_string(),
        })
    }
}

fn resolve(resolver: &dyn PathResolver, raw: &str) -> Option<PathBuf> {
    match resolver.resolve(raw) {
        Ok(path) => {
            if path.is_absolute() {
                Some(path)
            } else {
                std::path::absolute(&path).ok()
            }
        },
        Err(err) => {
            debug!(path = raw, error = %err, "path resolver failed, dropping entry");
            None
        },
    }
}
