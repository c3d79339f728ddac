//! Drives the sliding window through extraction, validation, and commit.

use chrono::{DateTime, Utc};
use memory_extract::{Extractor, Validator};
use memory_types::{ApplyCounts, ConversationTurn, Warning};
use uuid::Uuid;

use crate::session::SessionInner;

/// Outcome of one [`DelayedUpdateManager::on_new_turn`] call.
#[derive(Debug, Clone)]
pub struct NewTurnOutcome {
    /// Id of the turn just appended.
    pub turn_id: Uuid,
    /// Its assigned sequence number.
    pub sequence: u64,
    /// Id of the turn submitted for commit this call, if the delay zone
    /// yielded an eligible target.
    pub target_turn_id: Option<Uuid>,
    /// Whether the target's plan committed successfully. `None` when no
    /// turn was eligible yet.
    pub target_processed: Option<bool>,
    /// Counts from applying the validated plan; zero when nothing
    /// committed.
    pub counts: ApplyCounts,
    /// Warnings raised by the validator.
    pub warnings: Vec<Warning>,
}

/// Outcome of [`DelayedUpdateManager::on_turn_edited`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditOutcome {
    /// The edit was applied; the turn is re-eligible for commit.
    Ok,
    /// `turn_id` is not currently held by the window.
    OutOfWindow,
}

/// Stateless driver: everything it touches lives on the `SessionInner` it's
/// given.
#[derive(Debug, Default)]
pub struct DelayedUpdateManager;

impl DelayedUpdateManager {
    /// Construct a driver.
    pub fn new() -> Self {
        Self
    }

    /// Append a turn, then — if the delay zone now yields an eligible
    /// target — run it through extraction, validation, and commit.
    pub async fn on_new_turn<E: Extractor>(
        &self,
        inner: &mut SessionInner,
        extractor: &E,
        validator: &Validator,
        user_input: impl Into<String>,
        assistant_response: impl Into<String>,
        now: DateTime<Utc>,
    ) -> NewTurnOutcome {
        let appended = inner.window.append(user_input, assistant_response, now);
        let turn_id = appended.turn_id;
        let sequence = appended.sequence;
        inner.dirty = true;

        let Some(target) = inner.window.pick_processing_target() else {
            return NewTurnOutcome { turn_id, sequence, target_turn_id: None, target_processed: None, counts: ApplyCounts::default(), warnings: Vec::new() };
        };
        let target_id = target.turn_id;
        let user_text = target.user_input.clone();
        let assistant_text = target.assistant_response.clone();
        let recent_context = format_recent(&inner.window.recent(3));

        let plan = extractor.analyze(&user_text, &assistant_text, &inner.graph, &recent_context).await;
        let (validated, warnings) = validator.validate(plan, &inner.graph);

        let counts = inner.apply(validated, now);
        inner.record_turn(user_text, assistant_text);
        inner.window.mark_processed(target_id, true, now);

        NewTurnOutcome { turn_id, sequence, target_turn_id: Some(target_id), target_processed: Some(true), counts, warnings }
    }

    /// Apply an externally-driven edit to a turn still inside the window.
    pub fn on_turn_edited(&self, inner: &mut SessionInner, turn_id: Uuid, user_input: Option<String>, assistant_response: Option<String>, now: DateTime<Utc>) -> EditOutcome {
        if !inner.window.contains(turn_id) {
            return EditOutcome::OutOfWindow;
        }
        inner.window.update(turn_id, user_input, assistant_response, now);
        inner.dirty = true;
        EditOutcome::Ok
    }
}

fn format_recent(turns: &[&ConversationTurn]) -> String {
    turns.iter().map(|t| format!("user: {}\nassistant: {}", t.user_input, t.assistant_response)).collect::<Vec<_>>().join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SessionConfig;
    use memory_extract::RuleExtractor;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z").unwrap().with_timezone(&Utc)
    }

    fn inner() -> SessionInner {
        let config = SessionConfig { window_size: 4, processing_delay: 1, ..SessionConfig::default() };
        SessionInner::new(&config).unwrap()
    }

    #[tokio::test]
    async fn first_turn_yields_no_target() {
        let mut session = inner();
        let manager = DelayedUpdateManager::new();
        let extractor = RuleExtractor::new();
        let validator = Validator::new();
        let outcome = manager.on_new_turn(&mut session, &extractor, &validator, "hello", "hi there", now()).await;
        assert!(outcome.target_turn_id.is_none());
    }

    #[tokio::test]
    async fn second_turn_commits_the_first() {
        let mut session = inner();
        let manager = DelayedUpdateManager::new();
        let extractor = RuleExtractor::new();
        let validator = Validator::new();
        manager.on_new_turn(&mut session, &extractor, &validator, "a wounded knight limps in", "he says he is Sir Aldric", now()).await;
        let outcome = manager.on_new_turn(&mut session, &extractor, &validator, "continue", "continue", now()).await;
        assert!(outcome.target_turn_id.is_some());
        assert_eq!(outcome.target_processed, Some(true));
        assert_eq!(session.turn_buffer.len(), 1);
    }

    #[test]
    fn edit_outside_window_reports_out_of_window() {
        let mut session = inner();
        let manager = DelayedUpdateManager::new();
        let outcome = manager.on_turn_edited(&mut session, Uuid::new_v4(), Some("x".into()), None, now());
        assert_eq!(outcome, EditOutcome::OutOfWindow);
    }
}
