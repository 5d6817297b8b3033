//! Receipt persistence: append-only `receipts.jsonl` plus the
//! `last-decision.json` mirror.

use std::fs;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::warn;

use crate::error::{AuditError, AuditResult};
use crate::receipt::Receipt;

const RECEIPTS_FILE: &str = "receipts.jsonl";
const LAST_DECISION_FILE: &str = "last-decision.json";

/// Serialized appender for receipts.
///
/// Appends are single-line JSON records under one lock, so concurrent
/// pipelines interleave whole lines, never partial ones.
pub struct ReceiptWriter {
    state_dir: PathBuf,
    lock: Mutex<()>,
}

impl ReceiptWriter {
    /// Create a writer over a state directory (created if absent).
    #[must_use]
    pub fn new(state_dir: impl Into<PathBuf>) -> Self {
        let state_dir = state_dir.into();
        if let Err(err) = fs::create_dir_all(&state_dir) {
            warn!(dir = %state_dir.display(), error = %err, "failed to create state directory");
        }
        Self {
            state_dir,
            lock: Mutex::new(()),
        }
    }

    /// Append a receipt and update the last-decision mirror.
    ///
    /// # Errors
    ///
    /// Returns an [`AuditError`] if encoding or either write fails.
    pub fn append(&self, receipt: &Receipt) -> AuditResult<()> {
        let line = serde_json::to_string(receipt)
            .map_err(|e| AuditError::EncodeError(e.to_string()))?;
        let pretty = serde_json::to_string_pretty(receipt)
            .map_err(|e| AuditError::EncodeError(e.to_string()))?;

        let _guard = self.lock.lock().unwrap_or_else(|e| {
            warn!("receipt writer lock poisoned, recovering");
            e.into_inner()
        });

        let receipts_path = self.state_dir.join(RECEIPTS_FILE);
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&receipts_path)
            .map_err(|e| write_error(&receipts_path, e))?;
        writeln!(file, "{line}").map_err(|e| write_error(&receipts_path, e))?;

        let last_path = self.state_dir.join(LAST_DECISION_FILE);
        let tmp = last_path.with_extension("json.tmp");
        fs::write(&tmp, pretty.as_bytes()).map_err(|e| write_error(&last_path, e))?;
        fs::rename(&tmp, &last_path).map_err(|e| write_error(&last_path, e))
    }

    /// Read the most recent receipt, if one exists and parses.
    #[must_use]
    pub fn last_decision(&self) -> Option<Receipt> {
        let path = self.state_dir.join(LAST_DECISION_FILE);
        let content = fs::read_to_string(&path).ok()?;
        match serde_json::from_str(&content) {
            Ok(receipt) => Some(receipt),
            Err(err) => {
                warn!(path = %path.display(), error = %err, "unreadable last-decision file");
                None
            },
        }
    }

    /// Read back all receipts, skipping unparseable lines.
    #[must_use]
    pub fn receipts(&self) -> Vec<Receipt> {
        let path = self.state_dir.join(RECEIPTS_FILE);
        let Ok(content) = fs::read_to_string(&path) else {
            return Vec::new();
        };
        content
            .lines()
            .filter(|l| !l.trim().is_empty())
            .filter_map(|line| serde_json::from_str(line).ok())
            .collect()
    }
}

impl std::fmt::Debug for ReceiptWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReceiptWriter")
            .field("state_dir", &self.state_dir)
            .finish_non_exhaustive()
    }
}

fn write_error(path: &Path, source: std::io::Error) -> AuditError {
    AuditError::WriteError {
        path: path.display().to_string(),
        source,
    }
}
