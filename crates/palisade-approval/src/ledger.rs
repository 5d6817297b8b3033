//! The approval ledger: state machine plus persistence.
//!
//! All mutation happens inside one short critical section per call
//! (a single mutex over the in-memory store), and the store file is
//! persisted *before* the result is returned, so an aborted caller still
//! leaves a consistent pending request on disk.
//!
//! Persistence layout under the state directory:
//! - `approvals.json`: point-in-time store, written via write-then-rename
//! - `approvals.history.jsonl`: append-only approved events
//! - `approvals.rollup.json`: `tool:risk` counters

use std::fs;
use std::io::Write as _;
use std::path::{Path, PathBuf};

use tokio::sync::Mutex;
use tracing::{debug, warn};

use palisade_core::{ParamsHash, Risk, Timestamp};

use crate::error::{StoreError, StoreResult};
use crate::record::{
    ApprovalRecord, ApprovalRollup, ApprovalScope, ApprovalStatus, ApprovalStore, HistoryEvent,
    SessionApproval, approval_id,
};

const STORE_FILE: &str = "approvals.json";
const HISTORY_FILE: &str = "approvals.history.jsonl";
const ROLLUP_FILE: &str = "approvals.rollup.json";

/// Inputs for resolving an ASK decision against the ledger.
#[derive(Debug, Clone)]
pub struct AskRequest {
    /// Normalized tool name.
    pub tool_name: String,
    /// Invocation fingerprint.
    pub params_hash: ParamsHash,
    /// Preview to store if a pending request is created.
    pub params_preview: String,
    /// Risk band of the call.
    pub risk: Risk,
    /// Decision reason that raised the ASK.
    pub reason: String,
    /// Session the call belongs to.
    pub session_key: Option<String>,
    /// Agent that issued the call.
    pub agent_id: Option<String>,
}

/// Outcome of resolving an ASK against the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AskResolution {
    /// A grant covered the call; the pipeline upgrades ASK to ALLOW.
    Allowed,
    /// No usable grant; the call stays blocked under this request ID.
    Blocked {
        /// Deterministic request ID for approve/deny commands.
        id: String,
    },
}

struct LedgerState {
    store: ApprovalStore,
    rollup: ApprovalRollup,
}

/// The persistent approval ledger.
pub struct ApprovalLedger {
    state_dir: PathBuf,
    state: Mutex<LedgerState>,
}

impl ApprovalLedger {
    /// Open (or initialize) the ledger in a state directory.
    ///
    /// Missing or unreadable files load as empty state; the directory is
    /// created if absent.
    #[must_use]
    pub fn open(state_dir: impl Into<PathBuf>) -> Self {
        let state_dir = state_dir.into();
        if let Err(err) = fs::create_dir_all(&state_dir) {
            warn!(dir = %state_dir.display(), error = %err, "failed to create state directory");
        }
        let store = load_json(&state_dir.join(STORE_FILE)).unwrap_or_default();
        let rollup = load_json(&state_dir.join(ROLLUP_FILE)).unwrap_or_default();
        Self {
            state_dir,
            state: Mutex::new(LedgerState { store, rollup }),
        }
    }

    /// Resolve an ASK decision against stored approvals.
    ///
    /// Checks, in order: an existing session grant; an approved request
    /// (consuming once-scope approvals, materializing session grants);
    /// otherwise records a pending request. The store is persisted before
    /// returning.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if persisting the updated store fails.
    pub async fn resolve_ask(&self, request: AskRequest) -> StoreResult<AskResolution> {
        let id = approval_id(
            &request.tool_name,
            request.session_key.as_deref(),
            &request.params_hash,
            request.risk,
        );
        let now = Timestamp::now();
        let mut state = self.state.lock().await;

        // 1. Session grant?
        let covered = state.store.session_approvals.iter().any(|g| {
            g.covers(
                &id,
                &request.tool_name,
                &request.params_hash,
                request.session_key.as_deref(),
            )
        });
        if covered {
            debug!(id = %id, tool = %request.tool_name, "session approval covers call");
            return Ok(AskResolution::Allowed);
        }

        // 2. Matching request?
        let position = state.store.requests.iter().position(|r| {
            r.id == id && r.tool_name == request.tool_name && r.params_hash == request.params_hash
        });
        if let Some(position) = position {
            let record = &mut state.store.requests[position];
            match (record.status, record.scope) {
                (ApprovalStatus::Approved, Some(ApprovalScope::Once)) => {
                    if record.used == Some(true) {
                        return Ok(AskResolution::Blocked { id });
                    }
                    record.used = Some(true);
                    record.updated_at = Some(now);
                    self.save_store(&state.store)?;
                    return Ok(AskResolution::Allowed);
                },
                (ApprovalStatus::Approved, Some(ApprovalScope::Session)) => {
                    let grant = SessionApproval {
                        id: id.clone(),
                        tool_name: request.tool_name.clone(),
                        params_hash: request.params_hash.clone(),
                        session_key: request.session_key.clone(),
                        approved_at: now,
                    };
                    state.store.session_approvals.push(grant);
                    self.save_store(&state.store)?;
                    return Ok(AskResolution::Allowed);
                },
                _ => return Ok(AskResolution::Blocked { id }),
            }
        }

        // 3. Record a fresh pending request.
        state.store.requests.push(ApprovalRecord {
            id: id.clone(),
            tool_name: request.tool_name,
            params_hash: request.params_hash,
            params_preview: request.params_preview,
            risk: request.risk,
            status: ApprovalStatus::Pending,
            scope: None,
            created_at: now,
            updated_at: None,
            used: None,
            reason: request.reason,
            session_key: request.session_key,
            agent_id: request.agent_id,
        });
        self.save_store(&state.store)?;
        Ok(AskResolution::Blocked { id })
    }

    /// Approve a request with the given scope.
    ///
    /// On the transition into `approved`, appends a history event and
    /// bumps the rollup. Returns the updated record, or `None` if the ID
    /// is unknown.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if persisting state fails.
    pub async fn approve(
        &self,
        id: &str,
        scope: ApprovalScope,
    ) -> StoreResult<Option<ApprovalRecord>> {
        let now = Timestamp::now();
        let mut state = self.state.lock().await;

        let Some(position) = state.store.requests.iter().position(|r| r.id == id) else {
            return Ok(None);
        };
        let record = &mut state.store.requests[position];
        let newly_approved = record.status != ApprovalStatus::Approved;
        record.status = ApprovalStatus::Approved;
        record.scope = Some(scope);
        record.updated_at = Some(now);
        if newly_approved && scope == ApprovalScope::Once {
            record.used = Some(false);
        }
        let snapshot = record.clone();

        if newly_approved {
            let event = HistoryEvent {
                id: snapshot.id.clone(),
                tool_name: snapshot.tool_name.clone(),
                risk: snapshot.risk,
                scope,
                approved_at: now,
            };
            self.append_history(&event)?;
            state.rollup.bump(&snapshot.tool_name, snapshot.risk, now);
            self.save_rollup(&state.rollup)?;
        }
        self.save_store(&state.store)?;
        Ok(Some(snapshot))
    }

    /// Deny a request. Returns the updated record, or `None` if unknown.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if persisting state fails.
    pub async fn deny(&self, id: &str) -> StoreResult<Option<ApprovalRecord>> {
        let now = Timestamp::now();
        let mut state = self.state.lock().await;

        let Some(position) = state.store.requests.iter().position(|r| r.id == id) else {
            return Ok(None);
        };
        let record = &mut state.store.requests[position];
        record.status = ApprovalStatus::Denied;
        record.updated_at = Some(now);
        let snapshot = record.clone();
        // Membership invariant: grants only exist for approved
        // session-scope requests.
        state.store.session_approvals.retain(|g| g.id != id);

        self.save_store(&state.store)?;
        Ok(Some(snapshot))
    }

    /// Pending requests, oldest first.
    pub async fn pending(&self) -> Vec<ApprovalRecord> {
        let state = self.state.lock().await;
        state
            .store
            .requests
            .iter()
            .filter(|r| r.status == ApprovalStatus::Pending)
            .cloned()
            .collect()
    }

    /// A snapshot of the full store.
    pub async fn snapshot(&self) -> ApprovalStore {
        self.state.lock().await.store.clone()
    }

    /// The current rollup counters.
    pub async fn rollup(&self) -> ApprovalRollup {
        self.state.lock().await.rollup.clone()
    }

    /// History events, in append order. Unparseable lines are skipped.
    #[must_use]
    pub fn history(&self) -> Vec<HistoryEvent> {
        let path = self.state_dir.join(HISTORY_FILE);
        let Ok(content) = fs::read_to_string(&path) else {
            return Vec::new();
        };
        content
            .lines()
            .filter(|l| !l.trim().is_empty())
            .filter_map(|line| match serde_json::from_str(line) {
                Ok(event) => Some(event),
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "skipping bad history line");
                    None
                },
            })
            .collect()
    }

    /// Rebuild the rollup from the history file.
    ///
    /// Equal to the incrementally maintained rollup whenever every
    /// approved event went through [`approve`](Self::approve).
    #[must_use]
    pub fn rebuild_rollup(&self) -> ApprovalRollup {
        ApprovalRollup::rebuild(&self.history())
    }

    fn save_store(&self, store: &ApprovalStore) -> StoreResult<()> {
        let json = serde_json::to_string_pretty(store)
            .map_err(|e| StoreError::EncodeError(e.to_string()))?;
        write_atomic(&self.state_dir.join(STORE_FILE), json.as_bytes())
    }

    fn save_rollup(&self, rollup: &ApprovalRollup) -> StoreResult<()> {
        let json = serde_json::to_string_pretty(rollup)
            .map_err(|e| StoreError::EncodeError(e.to_string()))?;
        write_atomic(&self.state_dir.join(ROLLUP_FILE), json.as_bytes())
    }

    fn append_history(&self, event: &HistoryEvent) -> StoreResult<()> {
        let path = self.state_dir.join(HISTORY_FILE);
        let line =
            serde_json::to_string(event).map_err(|e| StoreError::EncodeError(e.to_string()))?;
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| StoreError::WriteError {
                path: path.display().to_string(),
                source: e,
            })?;
        writeln!(file, "{line}").map_err(|e| StoreError::WriteError {
            path: path.display().to_string(),
            source: e,
        })
    }
}

impl std::fmt::Debug for ApprovalLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApprovalLedger")
            .field("state_dir", &self.state_dir)
            .finish_non_exhaustive()
    }
}

/// Read and parse a JSON state file, returning `None` for absent or
/// partially-written files.
fn load_json<T: serde::de::DeserializeOwned>(path: &Path) -> Option<T> {
    let content = fs::read_to_string(path).ok()?;
    match serde_json::from_str(&content) {
        Ok(value) => Some(value),
        Err(err) => {
            warn!(path = %path.display(), error = %err, "unreadable state file, starting empty");
            None
        },
    }
}

/// Write a file via write-then-rename for crash safety.
fn write_atomic(path: &Path, bytes: &[u8]) -> StoreResult<()> {
    let tmp = path.with_extension("json.tmp");
    let io_err = |e: std::io::Error| StoreError::WriteError {
        path: path.display().to_string(),
        source: e,
    };
    fs::write(&tmp, bytes).map_err(io_err)?;
    fs::rename(&tmp, path).map_err(io_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ask(tool: &str, session: Option<&str>) -> AskRequest {
        AskRequest {
            tool_name: tool.to_string(),
            params_hash: ParamsHash::of_value(&json!({"path": "/tmp/a", "content": "x"})),
            params_preview: "[redacted]".to_string(),
            risk: Risk::Write,
            reason: format!("Tool \"{tool}\" (write) resolved to ASK."),
            session_key: session.map(ToString::to_string),
            agent_id: None,
        }
    }

    // -----------------------------------------------------------------------
    // Once lifecycle
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn once_approval_lifecycle() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = ApprovalLedger::open(dir.path());

        // First ask: pending request created.
        let AskResolution::Blocked { id } = ledger.resolve_ask(ask("write", Some("s1"))).await.unwrap()
        else {
            panic!("expected blocked");
        };
        assert_eq!(ledger.pending().await.len(), 1);

        // Approve once.
        let record = ledger
            .approve(&id, ApprovalScope::Once)
            .await
            .unwrap()
            .expect("record exists");
        assert_eq!(record.status, ApprovalStatus::Approved);
        assert_eq!(record.used, Some(false));

        // Next identical call consumes the approval.
        assert_eq!(
            ledger.resolve_ask(ask("write", Some("s1"))).await.unwrap(),
            AskResolution::Allowed
        );

        // Third identical call is blocked again: used=true.
        assert_eq!(
            ledger.resolve_ask(ask("write", Some("s1"))).await.unwrap(),
            AskResolution::Blocked { id }
        );
    }

    // -----------------------------------------------------------------------
    // Session lifecycle
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn session_approval_covers_repeated_calls() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = ApprovalLedger::open(dir.path());

        let AskResolution::Blocked { id } = ledger.resolve_ask(ask("write", Some("s1"))).await.unwrap()
        else {
            panic!("expected blocked");
        };
        ledger.approve(&id, ApprovalScope::Session).await.unwrap();

        // Every identical call in the session is covered.
        for _ in 0..3 {
            assert_eq!(
                ledger.resolve_ask(ask("write", Some("s1"))).await.unwrap(),
                AskResolution::Allowed
            );
        }
        let store = ledger.snapshot().await;
        assert_eq!(store.session_approvals.len(), 1);

        // A different session computes a different ID and stays blocked.
        assert!(matches!(
            ledger.resolve_ask(ask("write", Some("s2"))).await.unwrap(),
            AskResolution::Blocked { .. }
        ));
    }

    #[tokio::test]
    async fn deny_blocks_and_clears_grants() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = ApprovalLedger::open(dir.path());

        let AskResolution::Blocked { id } = ledger.resolve_ask(ask("write", Some("s1"))).await.unwrap()
        else {
            panic!("expected blocked");
        };
        ledger.approve(&id, ApprovalScope::Session).await.unwrap();
        assert_eq!(
            ledger.resolve_ask(ask("write", Some("s1"))).await.unwrap(),
            AskResolution::Allowed
        );

        ledger.deny(&id).await.unwrap();
        let store = ledger.snapshot().await;
        assert!(store.session_approvals.is_empty());
        assert!(matches!(
            ledger.resolve_ask(ask("write", Some("s1"))).await.unwrap(),
            AskResolution::Blocked { .. }
        ));
    }

    // -----------------------------------------------------------------------
    // Persistence
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn state_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();

        let id = {
            let ledger = ApprovalLedger::open(dir.path());
            let AskResolution::Blocked { id } =
                ledger.resolve_ask(ask("write", Some("s1"))).await.unwrap()
            else {
                panic!("expected blocked");
            };
            ledger.approve(&id, ApprovalScope::Once).await.unwrap();
            id
        };

        // A fresh ledger over the same directory sees the approval and
        // computes the same deterministic ID.
        let reopened = ApprovalLedger::open(dir.path());
        assert_eq!(
            reopened.resolve_ask(ask("write", Some("s1"))).await.unwrap(),
            AskResolution::Allowed
        );
        let store = reopened.snapshot().await;
        assert_eq!(store.requests[0].id, id);
        assert_eq!(store.requests[0].used, Some(true));
    }

    #[tokio::test]
    async fn corrupt_store_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(STORE_FILE), b"{not json").unwrap();
        let ledger = ApprovalLedger::open(dir.path());
        assert!(ledger.pending().await.is_empty());
    }

    // -----------------------------------------------------------------------
    // History & rollup
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn history_records_only_approvals() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = ApprovalLedger::open(dir.path());

        let AskResolution::Blocked { id: id1 } =
            ledger.resolve_ask(ask("write", Some("s1"))).await.unwrap()
        else {
            panic!("expected blocked");
        };
        let AskResolution::Blocked { id: id2 } =
            ledger.resolve_ask(ask("exec", Some("s1"))).await.unwrap()
        else {
            panic!("expected blocked");
        };

        ledger.approve(&id1, ApprovalScope::Once).await.unwrap();
        ledger.deny(&id2).await.unwrap();

        let history = ledger.history();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].id, id1);

        // Re-approving an approved request does not double-count.
        ledger.approve(&id1, ApprovalScope::Session).await.unwrap();
        assert_eq!(ledger.history().len(), 1);
    }

    #[tokio::test]
    async fn rollup_matches_rebuild_from_history() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = ApprovalLedger::open(dir.path());

        for (tool, session) in [("write", "s1"), ("write", "s2"), ("exec", "s1")] {
            let AskResolution::Blocked { id } =
                ledger.resolve_ask(ask(tool, Some(session))).await.unwrap()
            else {
                panic!("expected blocked");
            };
            ledger.approve(&id, ApprovalScope::Once).await.unwrap();
        }

        let rollup = ledger.rollup().await;
        assert_eq!(rollup.counts, ledger.rebuild_rollup().counts);
        assert_eq!(rollup.counts.get("write:write"), Some(&2));
    }
}
