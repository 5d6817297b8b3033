//! Chat command dispatch: `approve`, `deny`, `status`, `explain`.
//!
//! The host strips its namespace prefix (e.g. `/firewall `) and hands
//! the rest to [`Firewall::handle_command`]. Replies are plain text for
//! the host to render; previews inside them are already redacted.

use tracing::warn;

use palisade_approval::ApprovalScope;

use crate::firewall::Firewall;

/// A textual reply to a chat command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandReply {
    /// Text for the host to render.
    pub text: String,
}

impl CommandReply {
    fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

const USAGE: &str = "Usage: approve <id> [once|session] | deny <id> | status | explain";

impl Firewall {
    /// Dispatch one chat command.
    pub async fn handle_command(&self, input: &str) -> CommandReply {
        let mut parts = input.split_whitespace();
        match parts.next() {
            Some("approve") => {
                let Some(id) = parts.next() else {
                    return CommandReply::new(USAGE);
                };
                let scope = match parts.next() {
                    None => ApprovalScope::Once,
                    Some(raw) => match ApprovalScope::parse(raw) {
                        Some(scope) => scope,
                        None => {
                            return CommandReply::new(format!(
                                "Unknown scope \"{raw}\"; use once or session."
                            ));
                        },
                    },
                };
                match self.ledger.approve(id, scope).await {
                    Ok(Some(record)) => CommandReply::new(format!(
                        "Approved {id} ({scope}) for {}.",
                        record.tool_name
                    )),
                    Ok(None) => {
                        CommandReply::new(format!("No approval request found for {id}."))
                    },
                    Err(err) => {
                        warn!(id, error = %err, "failed to persist approval");
                        CommandReply::new(format!("Failed to persist approval for {id}."))
                    },
                }
            },
            Some("deny") => {
                let Some(id) = parts.next() else {
                    return CommandReply::new(USAGE);
                };
                match self.ledger.deny(id).await {
                    Ok(Some(record)) => {
                        CommandReply::new(format!("Denied {id} for {}.", record.tool_name))
                    },
                    Ok(None) => {
                        CommandReply::new(format!("No approval request found for {id}."))
                    },
                    Err(err) => {
                        warn!(id, error = %err, "failed to persist denial");
                        CommandReply::new(format!("Failed to persist denial for {id}."))
                    },
                }
            },
            Some("status") => {
                let pending = self.ledger.pending().await;
                if pending.is_empty() {
                    return CommandReply::new("No pending approval requests.");
                }
                let mut lines = vec!["Pending approval requests:".to_string()];
                for record in pending {
                    lines.push(format!(
                        "{id}  {tool} ({risk})  {preview}",
                        id = record.id,
                        tool = record.tool_name,
                        risk = record.risk,
                        preview = record.params_preview,
                    ));
                }
                CommandReply::new(lines.join("\n"))
            },
            Some("explain") => match self.receipts.last_decision() {
                None => CommandReply::new("No decisions recorded."),
                Some(receipt) => {
                    let decision = receipt
                        .decision
                        .map_or_else(|| "-".to_string(), |d| d.to_string());
                    let reason = receipt.reason.unwrap_or_default();
                    CommandReply::new(format!(
                        "Last decision: {tool} -> {decision} ({reason})",
                        tool = receipt.tool_name,
                    ))
                },
            },
            _ => CommandReply::new(USAGE),
        }
    }
}
