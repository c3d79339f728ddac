//! Reconciles an externally-authoritative turn list against the window.

use chrono::{DateTime, Duration, Utc};
use memory_types::ConversationTurn;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::session::SessionInner;

/// One record in the authoritative external list.
#[derive(Debug, Clone)]
pub struct ExternalTurnRecord {
    /// The chat host's id for this turn.
    pub id: Uuid,
    /// Its sequence number, if the host tracks one.
    pub sequence: Option<u64>,
    /// User message content.
    pub user: String,
    /// Assistant message content.
    pub assistant: String,
    /// When the host recorded it, if known.
    pub timestamp: Option<DateTime<Utc>>,
}

/// Snapshot of a window turn's content as of its last sync, used to detect
/// drift on the next pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnSnapshot {
    /// The snapshotted turn's id.
    pub turn_id: Uuid,
    /// Its sequence number at snapshot time.
    pub sequence: u64,
    /// `H(user || 0x1e || assistant)`.
    pub content_hash: String,
    /// When the turn was created.
    pub created_at: DateTime<Utc>,
    /// The turn's edit-version at snapshot time.
    pub version: u64,
}

/// Counters returned by one [`ConflictResolver::sync`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    /// Records successfully reconciled (matched or newly added).
    pub synced: usize,
    /// Known-id records whose content hash no longer matched the snapshot.
    pub conflicts_detected: usize,
    /// Of those, how many were resolved by taking the external content.
    pub conflicts_resolved: usize,
    /// Records whose sequence fell outside the current window.
    pub out_of_window: usize,
    /// Unknown-id records appended as brand-new turns.
    pub new_turns: usize,
    /// Known-id records whose window copy was overwritten.
    pub updated_turns: usize,
    /// Window turns absent from the external list. Report-only: the window
    /// never deletes on its own account.
    pub deleted_turns: usize,
}

/// Stateless driver: state lives in `SessionInner::snapshots`.
#[derive(Debug, Default)]
pub struct ConflictResolver;

impl ConflictResolver {
    /// Construct a resolver.
    pub fn new() -> Self {
        Self
    }

    /// Reconcile `external` against `inner`'s window, per-record.
    pub fn sync(&self, inner: &mut SessionInner, external: &[ExternalTurnRecord], now: DateTime<Utc>) -> SyncReport {
        let mut report = SyncReport::default();
        let window_sequences: std::collections::HashSet<u64> = inner.window.sequences().collect();
        let mut seen_ids = std::collections::HashSet::new();

        for record in external {
            if let Some(seq) = record.sequence {
                if !window_sequences.contains(&seq) {
                    report.out_of_window += 1;
                    continue;
                }
            }

            let hash = content_hash(&record.user, &record.assistant);

            if inner.window.contains(record.id) {
                seen_ids.insert(record.id);
                report.synced += 1;
                let drifted = inner.snapshots.get(&record.id).map(|s| s.content_hash != hash).unwrap_or(true);
                if drifted {
                    report.conflicts_detected += 1;
                    let outcome = inner.window.update(record.id, Some(record.user.clone()), Some(record.assistant.clone()), now);
                    if outcome == memory_window::UpdateOutcome::Ok {
                        report.conflicts_resolved += 1;
                        report.updated_turns += 1;
                        if let Some(turn) = inner.window.get_by_id(record.id) {
                            inner.snapshots.insert(record.id, snapshot_of(turn, &hash));
                        }
                        inner.dirty = true;
                    }
                }
                continue;
            }

            let non_empty = !record.user.trim().is_empty() || !record.assistant.trim().is_empty();
            let recent_enough = record.timestamp.map(|t| now.signed_duration_since(t) <= Duration::hours(24)).unwrap_or(true);
            if non_empty && recent_enough {
                seen_ids.insert(record.id);
                let turn = inner.window.append_with_id(record.id, record.user.clone(), record.assistant.clone(), now);
                let snapshot = snapshot_of(turn, &hash);
                inner.snapshots.insert(record.id, snapshot);
                report.new_turns += 1;
                report.synced += 1;
                inner.dirty = true;
            }
        }

        for turn_id in inner.window.all_turns().map(|t| t.turn_id).collect::<Vec<_>>() {
            if !seen_ids.contains(&turn_id) {
                report.deleted_turns += 1;
            }
        }

        report
    }
}

fn content_hash(user: &str, assistant: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(user.as_bytes());
    hasher.update([0x1e]);
    hasher.update(assistant.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn snapshot_of(turn: &ConversationTurn, content_hash: &str) -> TurnSnapshot {
    TurnSnapshot { turn_id: turn.turn_id, sequence: turn.sequence, content_hash: content_hash.to_string(), created_at: turn.created_at, version: turn.version }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SessionConfig;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z").unwrap().with_timezone(&Utc)
    }

    fn inner() -> SessionInner {
        let config = SessionConfig { window_size: 5, processing_delay: 1, ..SessionConfig::default() };
        SessionInner::new(&config).unwrap()
    }

    #[test]
    fn unknown_id_with_content_is_appended() {
        let mut session = inner();
        let resolver = ConflictResolver::new();
        let id = Uuid::new_v4();
        let report = resolver.sync(&mut session, &[ExternalTurnRecord { id, sequence: None, user: "hello".into(), assistant: "hi".into(), timestamp: Some(now()) }], now());
        assert_eq!(report.new_turns, 1);
        assert!(session.window.contains(id));
    }

    #[test]
    fn known_id_hash_mismatch_is_conflict_resolved() {
        let mut session = inner();
        let resolver = ConflictResolver::new();
        let id = Uuid::new_v4();
        resolver.sync(&mut session, &[ExternalTurnRecord { id, sequence: None, user: "hello".into(), assistant: "hi".into(), timestamp: Some(now()) }], now());

        let report = resolver.sync(&mut session, &[ExternalTurnRecord { id, sequence: None, user: "hello edited".into(), assistant: "hi".into(), timestamp: Some(now()) }], now());
        assert_eq!(report.conflicts_detected, 1);
        assert_eq!(report.conflicts_resolved, 1);
        assert_eq!(session.window.get_by_id(id).unwrap().user_input, "hello edited");
    }

    #[test]
    fn out_of_sequence_record_is_skipped_without_mutation() {
        let mut session = inner();
        let resolver = ConflictResolver::new();
        let before = session.window.info().len;
        let report = resolver.sync(&mut session, &[ExternalTurnRecord { id: Uuid::new_v4(), sequence: Some(999), user: "x".into(), assistant: "y".into(), timestamp: None }], now());
        assert_eq!(report.out_of_window, 1);
        assert_eq!(session.window.info().len, before);
    }

    #[test]
    fn stale_timestamp_is_not_appended() {
        let mut session = inner();
        let resolver = ConflictResolver::new();
        let old = now() - Duration::hours(48);
        let report = resolver.sync(&mut session, &[ExternalTurnRecord { id: Uuid::new_v4(), sequence: None, user: "x".into(), assistant: "y".into(), timestamp: Some(old) }], now());
        assert_eq!(report.new_turns, 0);
    }
}
