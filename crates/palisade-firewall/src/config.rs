//! The construction-time descriptor.
//!
//! Everything the firewall needs flows through this single struct (plus
//! the optionally injected path resolver): no globals, no late binding.
//! Field names mirror the host's plugin config keys.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use palisade_guard::RateLimitEntry;

/// What the size guard does with oversized tool output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SizeGuardAction {
    /// Keep the first `max_result_chars` characters and note the cut.
    #[default]
    Truncate,
    /// Replace the output with an error block.
    Block,
}

impl fmt::Display for SizeGuardAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Truncate => write!(f, "truncate"),
            Self::Block => write!(f, "block"),
        }
    }
}

/// Plugin configuration consumed from the host.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FirewallConfig {
    /// Policy preset name (`strict`/`standard`/`dev`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preset: Option<String>,
    /// Path to a YAML policy override file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy_path: Option<PathBuf>,
    /// Directory for approvals, receipts, and snapshots.
    pub state_dir: PathBuf,
    /// Maximum characters of tool output; `0` disables the size guard.
    #[serde(default)]
    pub max_result_chars: usize,
    /// What to do when output exceeds the limit.
    #[serde(default)]
    pub max_result_action: SizeGuardAction,
    /// Log a policy summary at construction.
    #[serde(default)]
    pub audit_on_start: bool,
    /// Rate-limit entries (invalid ones are dropped).
    #[serde(default)]
    pub rate_limits: Vec<RateLimitEntry>,
}

impl FirewallConfig {
    /// A minimal config over a state directory, everything else default.
    #[must_use]
    pub fn new(state_dir: impl Into<PathBuf>) -> Self {
        Self {
            preset: None,
            policy_path: None,
            state_dir: state_dir.into(),
            max_result_chars: 0,
            max_result_action: SizeGuardAction::default(),
            audit_on_start: false,
            rate_limits: Vec::new(),
        }
    }
}
