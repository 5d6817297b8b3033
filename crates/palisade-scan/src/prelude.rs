//! Prelude module - commonly used types for convenient import.

pub use crate::rules::{InjectionRule, Severity};
pub use crate::scanner::{InjectionFinding, InjectionMode, ScanOutcome, scan_text};
