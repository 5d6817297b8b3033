//! Redaction reports: what was matched, how often, and hash digests of
//! the matched substrings.

use serde::{Deserialize, Serialize};

/// Aggregated hits for one detector type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchEntry {
    /// Detector type, e.g. `openai_key`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Number of matches of this type.
    pub count: usize,
    /// Truncated SHA-256 digests (8 hex chars) of each matched substring,
    /// in match order. Lets operators correlate repeats without ever
    /// storing the secret itself.
    pub hashes: Vec<String>,
}

/// Structural summary of a redaction pass.
///
/// Reports merge commutatively and associatively over type: counts sum,
/// hash sequences concatenate, and `redacted` is the disjunction of the
/// contributions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedactionReport {
    /// Whether any detector matched.
    pub redacted: bool,
    /// Per-type aggregates in first-seen order.
    pub matches: Vec<MatchEntry>,
}

impl RedactionReport {
    /// An empty report (nothing matched).
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Record one match of `kind` with the digest of its substring.
    pub fn record(&mut self, kind: &str, hash8: String) {
        self.redacted = true;
        if let Some(entry) = self.matches.iter_mut().find(|m| m.kind == kind) {
            entry.count = entry.count.saturating_add(1);
            entry.hashes.push(hash8);
        } else {
            self.matches.push(MatchEntry {
                kind: kind.to_string(),
                count: 1,
                hashes: vec![hash8],
            });
        }
    }

    /// Merge another report into this one.
    pub fn merge(&mut self, other: Self) {
        self.redacted = self.redacted || other.redacted;
        for entry in other.matches {
            if let Some(existing) = self.matches.iter_mut().find(|m| m.kind == entry.kind) {
                existing.count = existing.count.saturating_add(entry.count);
                existing.hashes.extend(entry.hashes);
            } else {
                self.matches.push(entry);
            }
        }
    }

    /// Total match count across all types.
    #[must_use]
    pub fn total_matches(&self) -> usize {
        self.matches.iter().map(|m| m.count).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_aggregates_by_type() {
        let mut report = RedactionReport::empty();
        report.record("email", "aaaa0000".into());
        report.record("email", "bbbb1111".into());
        report.record("ipv4", "cccc2222".into());

        assert!(report.redacted);
        assert_eq!(report.matches.len(), 2);
        assert_eq!(report.matches[0].count, 2);
        assert_eq!(report.total_matches(), 3);
    }

    #[test]
    fn merge_sums_counts_and_concatenates_hashes() {
        let mut a = RedactionReport::empty();
        a.record("email", "a1".into());
        let mut b = RedactionReport::empty();
        b.record("email", "b2".into());
        b.record("txid", "c3".into());

        a.merge(b);
        assert_eq!(a.matches[0].count, 2);
        assert_eq!(a.matches[0].hashes, vec!["a1".to_string(), "b2".to_string()]);
        assert_eq!(a.matches.len(), 2);
    }

    #[test]
    fn merge_with_empty_is_identity() {
        let mut a = RedactionReport::empty();
        a.record("email", "a1".into());
        let snapshot = a.clone();
        a.merge(RedactionReport::empty());
        assert_eq!(a, snapshot);
        assert!(!RedactionReport::empty().redacted);
    }
}
