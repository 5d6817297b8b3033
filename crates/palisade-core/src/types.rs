//! Common types used throughout Palisade.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The outcome axis of the firewall: allow, ask, or deny.
///
/// Decisions carry a total order for guard composition:
/// `rank(Allow) < rank(Ask) < rank(Deny)`. A guard may only *upgrade* the
/// current decision to a higher rank, which makes composition of
/// independent guards commutative and idempotent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Decision {
    /// The call proceeds unchanged.
    Allow,
    /// The call is held pending human approval.
    Ask,
    /// The call is rejected.
    Deny,
}

impl Decision {
    /// Composition rank: `Allow` = 0, `Ask` = 1, `Deny` = 2.
    #[must_use]
    pub const fn rank(self) -> u8 {
        match self {
            Self::Allow => 0,
            Self::Ask => 1,
            Self::Deny => 2,
        }
    }

    /// Return the more restrictive of two decisions.
    #[must_use]
    pub fn max_rank(self, other: Self) -> Self {
        if other.rank() > self.rank() { other } else { self }
    }

    /// Parse a decision string case-insensitively.
    ///
    /// Accepts `allow`, `ask`, and `deny` in any casing. Returns `None`
    /// for anything else so callers can fall back to their own default.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "allow" => Some(Self::Allow),
            "ask" => Some(Self::Ask),
            "deny" => Some(Self::Deny),
            _ => None,
        }
    }
}

impl fmt::Display for Decision {
    /// Uppercase form, used verbatim inside reason templates.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Allow => write!(f, "ALLOW"),
            Self::Ask => write!(f, "ASK"),
            Self::Deny => write!(f, "DENY"),
        }
    }
}

impl Serialize for Decision {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let s = match self {
            Self::Allow => "allow",
            Self::Ask => "ask",
            Self::Deny => "deny",
        };
        serializer.serialize_str(s)
    }
}

impl<'de> Deserialize<'de> for Decision {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown decision: {s:?}")))
    }
}

/// Severity band used as a fallback axis for decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Risk {
    /// Reads data, no side effects.
    Read,
    /// Mutates data or state.
    Write,
    /// Can escalate, execute, or spawn.
    Critical,
    /// Not classified.
    Unknown,
}

impl Risk {
    /// Parse a risk string case-insensitively, `None` for unknown values.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "read" => Some(Self::Read),
            "write" => Some(Self::Write),
            "critical" => Some(Self::Critical),
            "unknown" => Some(Self::Unknown),
            _ => None,
        }
    }
}

impl fmt::Display for Risk {
    /// Lowercase form, used verbatim inside reason templates and IDs.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read => write!(f, "read"),
            Self::Write => write!(f, "write"),
            Self::Critical => write!(f, "critical"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// Caller-supplied context for a tool invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallContext {
    /// Identifier of the agent issuing the call, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
    /// Session the call belongs to, if any. Scopes session approvals
    /// and session-scoped rate limits.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_key: Option<String>,
}

/// The firewall's view of one tool invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Name of the tool as the host reports it (not yet normalized).
    pub tool_name: String,
    /// Structured parameters of the call.
    pub params: serde_json::Value,
    /// Caller context.
    #[serde(default)]
    pub context: CallContext,
}

impl ToolCall {
    /// Create a tool call with an empty context.
    #[must_use]
    pub fn new(tool_name: impl Into<String>, params: serde_json::Value) -> Self {
        Self {
            tool_name: tool_name.into(),
            params,
            context: CallContext::default(),
        }
    }

    /// Attach a session key.
    #[must_use]
    pub fn with_session_key(mut self, session_key: impl Into<String>) -> Self {
        self.context.session_key = Some(session_key.into());
        self
    }

    /// Attach an agent id.
    #[must_use]
    pub fn with_agent_id(mut self, agent_id: impl Into<String>) -> Self {
        self.context.agent_id = Some(agent_id.into());
        self
    }
}

/// Timestamp wrapper for consistent handling throughout Palisade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(pub DateTime<Utc>);

impl Timestamp {
    /// Get the current timestamp.
    #[must_use]
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Create a timestamp from a `DateTime<Utc>`.
    #[must_use]
    pub const fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }

    /// Milliseconds since the Unix epoch. Rate-limit windows count in
    /// these units.
    #[must_use]
    pub fn as_millis(&self) -> i64 {
        self.0.timestamp_millis()
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // -----------------------------------------------------------------------
    // Decision ordering
    // -----------------------------------------------------------------------

    #[test]
    fn decision_rank_total_order() {
        assert!(Decision::Allow.rank() < Decision::Ask.rank());
        assert!(Decision::Ask.rank() < Decision::Deny.rank());
    }

    #[test]
    fn decision_max_rank_is_commutative_and_idempotent() {
        let all = [Decision::Allow, Decision::Ask, Decision::Deny];
        for a in all {
            assert_eq!(a.max_rank(a), a);
            for b in all {
                assert_eq!(a.max_rank(b), b.max_rank(a));
            }
        }
    }

    #[test]
    fn decision_parse_case_insensitive() {
        assert_eq!(Decision::parse("ALLOW"), Some(Decision::Allow));
        assert_eq!(Decision::parse("Ask"), Some(Decision::Ask));
        assert_eq!(Decision::parse(" deny "), Some(Decision::Deny));
        assert_eq!(Decision::parse("block"), None);
    }

    #[test]
    fn decision_display_is_uppercase() {
        assert_eq!(Decision::Allow.to_string(), "ALLOW");
        assert_eq!(Decision::Ask.to_string(), "ASK");
        assert_eq!(Decision::Deny.to_string(), "DENY");
    }

    #[test]
    fn decision_serde_roundtrip() {
        for d in [Decision::Allow, Decision::Ask, Decision::Deny] {
            let json = serde_json::to_string(&d).unwrap();
            let back: Decision = serde_json::from_str(&json).unwrap();
            assert_eq!(d, back);
        }
        // Uppercase input is accepted too.
        let d: Decision = serde_json::from_str("\"DENY\"").unwrap();
        assert_eq!(d, Decision::Deny);
    }

    // -----------------------------------------------------------------------
    // Risk
    // -----------------------------------------------------------------------

    #[test]
    fn risk_display_is_lowercase() {
        assert_eq!(Risk::Critical.to_string(), "critical");
        assert_eq!(Risk::Unknown.to_string(), "unknown");
    }

    #[test]
    fn risk_parse() {
        assert_eq!(Risk::parse("WRITE"), Some(Risk::Write));
        assert_eq!(Risk::parse("none"), None);
    }

    // -----------------------------------------------------------------------
    // ToolCall
    // -----------------------------------------------------------------------

    #[test]
    fn tool_call_builders() {
        let call = ToolCall::new("write", serde_json::json!({"path": "/tmp/a"}))
            .with_session_key("s1")
            .with_agent_id("agent-7");
        assert_eq!(call.context.session_key.as_deref(), Some("s1"));
        assert_eq!(call.context.agent_id.as_deref(), Some("agent-7"));
    }
}
