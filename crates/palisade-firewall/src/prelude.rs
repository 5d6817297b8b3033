//! Prelude module - commonly used types for convenient import.

pub use crate::commands::CommandReply;
pub use crate::config::{FirewallConfig, SizeGuardAction};
pub use crate::firewall::Firewall;
pub use crate::hooks::{HookContext, PreCallOutcome, ToolCallEvent, ToolResultEvent};
