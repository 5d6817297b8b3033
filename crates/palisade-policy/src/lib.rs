//! Palisade Policy - Declarative policy model and the deterministic
//! decision engine.
//!
//! This crate provides:
//! - The raw [`ToolRule`] / [`NormalizedToolRule`] pair linked by a pure
//!   normalization function
//! - [`Policy`], the canonical, immutable policy a firewall instance runs
//! - Presets (`strict`/`standard`/`dev`), the baseline tool set, and the
//!   YAML override loader
//! - [`evaluate`], the pure `Policy × ToolCall → FirewallDecision` engine
//!
//! The loader never fails: malformed presets or override files are logged
//! as warnings and the affected layer falls back to built-in defaults.
//! The engine is pure and byte-deterministic, including its reason
//! strings.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

pub mod baseline;
pub mod engine;
pub mod error;
pub mod loader;
pub mod policy;
pub mod preset;
pub mod rule;

pub use engine::{FirewallDecision, RedactionPlan, evaluate};
pub use error::{PolicyError, PolicyResult};
pub use loader::load_policy;
pub use policy::{LogMode, Policy, PolicyDefaults, RiskActions};
pub use preset::Preset;
pub use rule::{AllowAlias, NormalizedToolRule, ToolRule, normalize_rule};
