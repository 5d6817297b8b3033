//! Sliding-window rate limiting per (tool, scope).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Mutex;
use tracing::{debug, warn};

use palisade_core::{Decision, Timestamp};

use crate::path::GuardOverride;

/// Scope a rate limit counts within.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateScope {
    /// One bucket per session key (callers without one share `no-session`).
    #[default]
    Session,
    /// A single bucket for the whole process.
    Global,
}

impl fmt::Display for RateScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Session => write!(f, "session"),
            Self::Global => write!(f, "global"),
        }
    }
}

/// One rate-limit entry as supplied by the host's plugin config.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitEntry {
    /// Tool the limit applies to; `*` or `all` match every tool.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
    /// Calls permitted inside the window.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_calls: Option<u32>,
    /// Window length in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window_sec: Option<u64>,
    /// `ASK` or `DENY` (defaults to `ASK`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    /// Counting scope (defaults to `session`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<RateScope>,
}

/// A validated rate-limit rule.
#[derive(Debug, Clone)]
struct RateRule {
    tool_name: String,
    max_calls: u32,
    window_sec: u64,
    action: Decision,
    scope: RateScope,
}

impl RateRule {
    fn matches(&self, tool: &str) -> bool {
        self.tool_name == "*" || self.tool_name == "all" || self.tool_name == tool
    }

    fn scope_key(&self, session_key: Option<&str>) -> String {
        match self.scope {
            RateScope::Session => session_key.unwrap_or("no-session").to_string(),
            RateScope::Global => "global".to_string(),
        }
    }
}

/// Sliding-window call counter.
///
/// Buckets hold millisecond timestamps per (rule, scope key) and are
/// mutated atomically under one lock. Invalid config entries are dropped
/// at construction.
pub struct RateLimiter {
    rules: Vec<RateRule>,
    buckets: Mutex<HashMap<(usize, String), Vec<i64>>>,
}

impl RateLimiter {
    /// Build a limiter from host config entries, dropping invalid ones
    /// (missing tool name, zero counts or windows, unusable action).
    #[must_use]
    pub fn new(entries: Vec<RateLimitEntry>) -> Self {
        let mut rules = Vec::new();
        for entry in entries {
            let Some(tool_name) = entry
                .tool_name
                .as_deref()
                .map(|n| n.trim().to_ascii_lowercase())
                .filter(|n| !n.is_empty())
            else {
                debug!("rate limit entry without a tool name, dropping");
                continue;
            };
            let (Some(max_calls), Some(window_sec)) = (
                entry.max_calls.filter(|&n| n > 0),
                entry.window_sec.filter(|&n| n > 0),
            ) else {
                debug!(tool = %tool_name, "rate limit entry with non-positive numbers, dropping");
                continue;
            };
            let action = match entry.action.as_deref() {
                None => Decision::Ask,
                Some(s) => match Decision::parse(s) {
                    Some(Decision::Ask) => Decision::Ask,
                    Some(Decision::Deny) => Decision::Deny,
                    _ => {
                        warn!(tool = %tool_name, value = s, "rate limit action must be ASK or DENY, dropping entry");
                        continue;
                    },
                },
            };
            rules.push(RateRule {
                tool_name,
                max_calls,
                window_sec,
                action,
                scope: entry.scope.unwrap_or_default(),
            });
        }
        Self {
            rules,
            buckets: Mutex::new(HashMap::new()),
        }
    }

    /// Number of active (validated) rules.
    #[must_use]
    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// Record a call and report the most restrictive limit it tripped.
    ///
    /// For each matching rule: entries older than the window are dropped,
    /// a hit is recorded if the bucket is already full, and the current
    /// timestamp is always appended.
    #[must_use]
    pub fn evaluate(&self, tool: &str, session_key: Option<&str>) -> Option<GuardOverride> {
        self.evaluate_at(Timestamp::now().as_millis(), tool, session_key)
    }

    fn evaluate_at(
        &self,
        now_ms: i64,
        tool: &str,
        session_key: Option<&str>,
    ) -> Option<GuardOverride> {
        let mut buckets = self.buckets.lock().unwrap_or_else(|e| {
            warn!("rate limiter lock poisoned, recovering");
            e.into_inner()
        });

        let mut worst: Option<&RateRule> = None;
        for (idx, rule) in self.rules.iter().enumerate() {
            if !rule.matches(tool) {
                continue;
            }
            let key = (idx, rule.scope_key(session_key));
            let bucket = buckets.entry(key).or_default();

            let window_ms = i64::try_from(rule.window_sec.saturating_mul(1000)).unwrap_or(i64::MAX);
            bucket.retain(|&ts| ts > now_ms.saturating_sub(window_ms));

            if bucket.len() >= rule.max_calls as usize
                && worst.is_none_or(|w| rule.action.rank() > w.action.rank())
            {
                worst = Some(rule);
            }
            bucket.push(now_ms);
        }

        worst.map(|rule| GuardOverride {
            action: rule.action,
            reason: format!(
                "Rate limit exceeded ({} calls / {}s).",
                rule.max_calls, rule.window_sec
            ),
        })
    }
}

impl fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RateLimiter")
            .field("rules", &self.rules.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(tool: &str, max_calls: u32, window_sec: u64, action: &str) -> RateLimitEntry {
        RateLimitEntry {
            tool_name: Some(tool.to_string()),
            max_calls: Some(max_calls),
            window_sec: Some(window_sec),
            action: Some(action.to_string()),
            scope: Some(RateScope::Session),
        }
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    #[test]
    fn invalid_entries_are_dropped() {
        let limiter = RateLimiter::new(vec![
            RateLimitEntry::default(),
            entry("web_fetch", 0, 60, "ask"),
            entry("web_fetch", 1, 0, "ask"),
            entry("web_fetch", 1, 60, "allow"),
            entry("web_fetch", 1, 60, "ask"),
        ]);
        assert_eq!(limiter.rule_count(), 1);
    }

    #[test]
    fn action_defaults_to_ask() {
        let limiter = RateLimiter::new(vec![RateLimitEntry {
            action: None,
            ..entry("t", 1, 60, "ask")
        }]);
        assert!(limiter.evaluate_at(1_000, "t", Some("s")).is_none());
        let hit = limiter.evaluate_at(1_001, "t", Some("s")).unwrap();
        assert_eq!(hit.action, Decision::Ask);
    }

    // -----------------------------------------------------------------------
    // Window behavior
    // -----------------------------------------------------------------------

    #[test]
    fn second_call_within_window_trips() {
        let limiter = RateLimiter::new(vec![entry("web_fetch", 1, 60, "ask")]);
        assert!(limiter.evaluate_at(1_000, "web_fetch", Some("s1")).is_none());
        let hit = limiter.evaluate_at(2_000, "web_fetch", Some("s1")).unwrap();
        assert_eq!(hit.reason, "Rate limit exceeded (1 calls / 60s).");
    }

    #[test]
    fn window_expiry_frees_the_bucket() {
        let limiter = RateLimiter::new(vec![entry("t", 1, 60, "deny")]);
        assert!(limiter.evaluate_at(1_000, "t", Some("s")).is_none());
        // 61 seconds later the first entry has aged out.
        assert!(limiter.evaluate_at(62_000, "t", Some("s")).is_none());
    }

    #[test]
    fn sessions_have_independent_buckets() {
        let limiter = RateLimiter::new(vec![entry("t", 1, 60, "ask")]);
        assert!(limiter.evaluate_at(1_000, "t", Some("a")).is_none());
        assert!(limiter.evaluate_at(1_001, "t", Some("b")).is_none());
        assert!(limiter.evaluate_at(1_002, "t", Some("a")).is_some());
    }

    #[test]
    fn global_scope_shares_one_bucket() {
        let limiter = RateLimiter::new(vec![RateLimitEntry {
            scope: Some(RateScope::Global),
            ..entry("t", 1, 60, "deny")
        }]);
        assert!(limiter.evaluate_at(1_000, "t", Some("a")).is_none());
        let hit = limiter.evaluate_at(1_001, "t", Some("b")).unwrap();
        assert_eq!(hit.action, Decision::Deny);
    }

    #[test]
    fn missing_session_key_uses_shared_bucket() {
        let limiter = RateLimiter::new(vec![entry("t", 1, 60, "ask")]);
        assert!(limiter.evaluate_at(1_000, "t", None).is_none());
        assert!(limiter.evaluate_at(1_001, "t", None).is_some());
    }

    #[test]
    fn wildcard_matches_every_tool() {
        for wildcard in ["*", "all"] {
            let limiter = RateLimiter::new(vec![entry(wildcard, 1, 60, "ask")]);
            assert!(limiter.evaluate_at(1_000, "anything", Some("s")).is_none());
            assert!(limiter.evaluate_at(1_001, "other", Some("s")).is_some());
        }
    }

    #[test]
    fn most_restrictive_hit_wins() {
        let limiter = RateLimiter::new(vec![
            entry("t", 1, 60, "ask"),
            entry("t", 1, 60, "deny"),
        ]);
        assert!(limiter.evaluate_at(1_000, "t", Some("s")).is_none());
        let hit = limiter.evaluate_at(1_001, "t", Some("s")).unwrap();
        assert_eq!(hit.action, Decision::Deny);
    }

    #[test]
    fn counting_happens_before_append() {
        // max_calls = 2: the second call is still free, the third trips.
        let limiter = RateLimiter::new(vec![entry("t", 2, 60, "ask")]);
        assert!(limiter.evaluate_at(1_000, "t", Some("s")).is_none());
        assert!(limiter.evaluate_at(1_001, "t", Some("s")).is_none());
        assert!(limiter.evaluate_at(1_002, "t", Some("s")).is_some());
    }
}
