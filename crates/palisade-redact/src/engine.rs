//! The deep redaction engine.
//!
//! Strings run through the detector library; mappings are recursed per
//! entry, ordered sequences per index, and other scalars pass through
//! unchanged. Child reports merge by type into a single
//! [`RedactionReport`].

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use palisade_core::hash::{UNSERIALIZABLE_PARAMS, sha256_hex_prefix};
use palisade_core::stable::MAX_VALUE_DEPTH;

use crate::detectors::{self, TOKEN_RE};
use crate::report::RedactionReport;

/// How aggressively the engine redacts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RedactionMode {
    /// No redaction; the report is always empty.
    Off,
    /// The standard detector set.
    #[default]
    Standard,
    /// Standard plus generic long-token, base64, and hex recognizers.
    Strict,
}

impl RedactionMode {
    /// Parse a mode string case-insensitively, `None` for unknown values.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "off" => Some(Self::Off),
            "standard" => Some(Self::Standard),
            "strict" => Some(Self::Strict),
            _ => None,
        }
    }
}

impl fmt::Display for RedactionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Off => write!(f, "off"),
            Self::Standard => write!(f, "standard"),
            Self::Strict => write!(f, "strict"),
        }
    }
}

/// Redact a single string.
///
/// Returns the rewritten text and a report of what was replaced. Existing
/// replacement tokens are protected, so the operation is idempotent.
#[must_use]
pub fn redact_text(text: &str, mode: RedactionMode) -> (String, RedactionReport) {
    if mode == RedactionMode::Off {
        return (text.to_string(), RedactionReport::empty());
    }

    let mut out = text.to_string();
    let mut report = RedactionReport::empty();

    for detector in detectors::standard() {
        apply_detector(detector, &mut out, &mut report);
    }
    if mode == RedactionMode::Strict {
        for detector in detectors::strict_extras() {
            apply_detector(detector, &mut out, &mut report);
        }
    }

    (out, report)
}

fn apply_detector(
    detector: &detectors::Detector,
    text: &mut String,
    report: &mut RedactionReport,
) {
    // Spans of tokens already present (from earlier detectors or an
    // earlier full pass) are off-limits.
    let protected: Vec<_> = TOKEN_RE.find_iter(text).map(|m| m.range()).collect();
    let targets = detector.targets(text, &protected);
    if targets.is_empty() {
        return;
    }

    // Record in match order, then rewrite back-to-front so earlier spans
    // stay valid.
    let mut replacements = Vec::with_capacity(targets.len());
    for range in &targets {
        let matched = &text[range.clone()];
        let hash8 = sha256_hex_prefix(matched.as_bytes(), 8);
        report.record(detector.kind, hash8.clone());
        replacements.push((range.clone(), format!("[REDACTED:{}:{hash8}]", detector.kind)));
    }
    for (range, token) in replacements.into_iter().rev() {
        text.replace_range(range, &token);
    }
}

/// Deep-redact a structured value.
///
/// Subtrees nested beyond the stable serializer's depth cap are replaced
/// by the fixed unserializable-params literal (see `palisade-core`),
/// keeping traversal total without contributing to the report.
#[must_use]
pub fn redact_value(value: &Value, mode: RedactionMode) -> (Value, RedactionReport) {
    if mode == RedactionMode::Off {
        return (value.clone(), RedactionReport::empty());
    }
    walk(value, mode, 0)
}

fn walk(value: &Value, mode: RedactionMode, depth: usize) -> (Value, RedactionReport) {
    if depth > MAX_VALUE_DEPTH {
        return (
            Value::String(UNSERIALIZABLE_PARAMS.to_string()),
            RedactionReport::empty(),
        );
    }

    match value {
        Value::String(s) => {
            let (text, report) = redact_text(s, mode);
            (Value::String(text), report)
        },
        Value::Array(items) => {
            let mut report = RedactionReport::empty();
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                let (child, child_report) = walk(item, mode, depth.saturating_add(1));
                report.merge(child_report);
                out.push(child);
            }
            (Value::Array(out), report)
        },
        Value::Object(map) => {
            let mut report = RedactionReport::empty();
            let mut out = serde_json::Map::with_capacity(map.len());
            for (key, child) in map {
                let (child, child_report) = walk(child, mode, depth.saturating_add(1));
                report.merge(child_report);
                out.insert(key.clone(), child);
            }
            (Value::Object(out), report)
        },
        other => (other.clone(), RedactionReport::empty()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    // -----------------------------------------------------------------------
    // Text redaction
    // -----------------------------------------------------------------------

    #[test]
    fn off_mode_is_a_noop() {
        let (text, report) = redact_text("sk-abcdefghijklmnopqrstuvwx12", RedactionMode::Off);
        assert_eq!(text, "sk-abcdefghijklmnopqrstuvwx12");
        assert!(!report.redacted);
    }

    #[test]
    fn openai_key_is_tokenized() {
        let (text, report) =
            redact_text("key=sk-abcdefghijklmnopqrstuvwx12", RedactionMode::Standard);
        assert!(text.contains("[REDACTED:openai_key:"));
        assert!(!text.contains("sk-abcdefghijklmnopqrstuvwx12"));
        assert!(report.redacted);
        assert_eq!(report.matches[0].kind, "openai_key");
        assert_eq!(report.matches[0].hashes[0].len(), 8);
    }

    #[test]
    fn authorization_prefix_is_preserved() {
        let (text, _) = redact_text(
            "Authorization: Bearer secret.token.value",
            RedactionMode::Standard,
        );
        assert!(text.starts_with("Authorization: [REDACTED:authorization:"));
    }

    #[test]
    fn generic_secret_keeps_key_name() {
        let (text, _) = redact_text("password = hunter2hunter2", RedactionMode::Standard);
        assert!(text.starts_with("password = [REDACTED:generic_secret:"));
    }

    #[test]
    fn multiple_matches_counted_in_order() {
        let (text, report) = redact_text(
            "a@example.com wrote to b@example.com",
            RedactionMode::Standard,
        );
        assert_eq!(report.matches[0].count, 2);
        assert_eq!(report.matches[0].hashes.len(), 2);
        assert_eq!(text.matches("[REDACTED:email:").count(), 2);
    }

    #[test]
    fn redaction_is_idempotent() {
        let samples = [
            "sk-abcdefghijklmnopqrstuvwx12",
            "Authorization: Bearer abc.def.ghi.jkl",
            "password = hunter2hunter2",
            "deadbeefdeadbeefdeadbeefdeadbeefdeadbeef4242",
        ];
        for mode in [RedactionMode::Standard, RedactionMode::Strict] {
            for sample in samples {
                let (once, _) = redact_text(sample, mode);
                let (twice, report) = redact_text(&once, mode);
                assert_eq!(once, twice, "{mode}: {sample}");
                assert!(!report.redacted, "{mode}: {sample}");
            }
        }
    }

    #[test]
    fn strict_extras_only_in_strict_mode() {
        let hex_run = "deadbeefdeadbeefdeadbeefdeadbeef";
        let (std_text, _) = redact_text(hex_run, RedactionMode::Standard);
        assert_eq!(std_text, hex_run);

        let (strict_text, report) = redact_text(hex_run, RedactionMode::Strict);
        assert!(strict_text.contains("[REDACTED:hex:"));
        assert!(report.redacted);
    }

    // -----------------------------------------------------------------------
    // Deep redaction
    // -----------------------------------------------------------------------

    #[test]
    fn deep_redaction_reaches_nested_strings() {
        let value = json!({
            "outer": {
                "token": "sk-abcdefghijklmnopqrstuvwx12",
                "list": ["ok", {"email": "x@example.com"}],
            },
            "n": 7,
        });
        let (redacted, report) = redact_value(&value, RedactionMode::Standard);

        let text = redacted.to_string();
        assert!(!text.contains("sk-abcdefghijklmnopqrstuvwx12"));
        assert!(!text.contains("x@example.com"));
        assert_eq!(redacted["n"], json!(7));
        assert!(report.redacted);
        assert_eq!(report.total_matches(), 2);
    }

    #[test]
    fn reports_merge_by_type_across_children() {
        let value = json!(["a@example.com", {"inner": "b@example.com"}]);
        let (_, report) = redact_value(&value, RedactionMode::Standard);
        assert_eq!(report.matches.len(), 1);
        assert_eq!(report.matches[0].count, 2);
    }

    #[test]
    fn non_string_scalars_pass_through() {
        let value = json!({"a": 1, "b": true, "c": null});
        let (redacted, report) = redact_value(&value, RedactionMode::Standard);
        assert_eq!(redacted, value);
        assert!(!report.redacted);
    }

    #[test]
    fn depth_overflow_substitutes_marker() {
        let mut v = json!("sk-abcdefghijklmnopqrstuvwx12");
        for _ in 0..=MAX_VALUE_DEPTH {
            v = json!([v]);
        }
        let (redacted, report) = redact_value(&v, RedactionMode::Standard);
        assert!(redacted.to_string().contains("unserializable-params"));
        assert!(!report.redacted);
    }

    #[test]
    fn mode_parsing() {
        assert_eq!(RedactionMode::parse("STRICT"), Some(RedactionMode::Strict));
        assert_eq!(RedactionMode::parse("off"), Some(RedactionMode::Off));
        assert_eq!(RedactionMode::parse("none"), None);
    }
}
