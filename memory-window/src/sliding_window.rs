//! Bounded deque of turns with a trailing, delay-gated processing cursor.

use std::collections::{HashMap, VecDeque};

use chrono::{DateTime, Utc};
use memory_types::ConversationTurn;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::WindowConfigError;

/// Outcome of [`SlidingWindow::update`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// The turn existed and was updated.
    Ok,
    /// No turn with that id is currently in the window.
    Missing,
}

/// A point-in-time summary of window occupancy, used for stats endpoints
/// and the delay-invariant test.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowInfo {
    /// Configured capacity.
    pub window_size: u64,
    /// Configured processing delay.
    pub processing_delay: u64,
    /// Turns currently held (<= `window_size`).
    pub len: usize,
    /// Turns in the window with `processed = true`.
    pub processed: usize,
    /// Lowest sequence number currently held, if any.
    pub oldest_sequence: Option<u64>,
    /// Highest sequence number currently held, if any.
    pub newest_sequence: Option<u64>,
}

/// Bounded FIFO of [`ConversationTurn`], capacity `window_size`.
///
/// The processing cursor always points `processing_delay` turns behind the
/// tail: the newest `processing_delay` turns are never eligible for commit,
/// which gives chat hosts room to edit or regenerate the last reply before
/// it becomes durable.
#[derive(Debug)]
pub struct SlidingWindow {
    window_size: u64,
    processing_delay: u64,
    turns: VecDeque<ConversationTurn>,
    index: HashMap<Uuid, usize>,
    next_sequence: u64,
}

impl SlidingWindow {
    /// Construct a window. Rejects `window_size < 2` and `window_size <=
    /// processing_delay`.
    pub fn new(window_size: u64, processing_delay: u64) -> Result<Self, WindowConfigError> {
        if window_size < 2 {
            return Err(WindowConfigError::WindowTooSmall(window_size));
        }
        if window_size <= processing_delay {
            return Err(WindowConfigError::DelayNotLessThanWindow { window_size, processing_delay });
        }
        Ok(Self { window_size, processing_delay, turns: VecDeque::new(), index: HashMap::new(), next_sequence: 1 })
    }

    /// Append a new turn, assigning the next sequence number and a fresh
    /// id. Evicts the oldest turn if the window is at capacity; evicted
    /// turns leave the window permanently.
    pub fn append(&mut self, user_input: impl Into<String>, assistant_response: impl Into<String>, now: DateTime<Utc>) -> &ConversationTurn {
        let turn = ConversationTurn::new(self.next_sequence, user_input, assistant_response, now);
        self.next_sequence += 1;
        self.insert_turn(turn)
    }

    /// Append a turn reusing an externally-known id, instead of the random
    /// one `ConversationTurn::new` would assign. `ConflictResolver` uses
    /// this so its snapshot map stays keyed on the same ids as the window.
    pub fn append_with_id(&mut self, turn_id: Uuid, user_input: impl Into<String>, assistant_response: impl Into<String>, now: DateTime<Utc>) -> &ConversationTurn {
        let mut turn = ConversationTurn::new(self.next_sequence, user_input, assistant_response, now);
        turn.turn_id = turn_id;
        self.next_sequence += 1;
        self.insert_turn(turn)
    }

    fn insert_turn(&mut self, turn: ConversationTurn) -> &ConversationTurn {
        if self.turns.len() as u64 >= self.window_size {
            if let Some(evicted) = self.turns.pop_front() {
                self.index.remove(&evicted.turn_id);
            }
            self.reindex();
        }

        self.turns.push_back(turn);
        let pos = self.turns.len() - 1;
        let id = self.turns[pos].turn_id;
        self.index.insert(id, pos);
        &self.turns[pos]
    }

    fn reindex(&mut self) {
        self.index.clear();
        for (pos, turn) in self.turns.iter().enumerate() {
            self.index.insert(turn.turn_id, pos);
        }
    }

    /// The turn `processing_delay` positions behind the tail, if one
    /// exists and is not already processed.
    pub fn pick_processing_target(&self) -> Option<&ConversationTurn> {
        let len = self.turns.len() as u64;
        if len <= self.processing_delay {
            return None;
        }
        let idx = (len - 1 - self.processing_delay) as usize;
        self.turns.get(idx).filter(|t| !t.processed)
    }

    /// Mark a turn's processing outcome by id.
    pub fn mark_processed(&mut self, turn_id: Uuid, ok: bool, now: DateTime<Utc>) {
        if let Some(&pos) = self.index.get(&turn_id) {
            self.turns[pos].mark_processed(ok, now);
        }
    }

    /// Overwrite a turn's content, bump its version, and clear `processed`
    /// so it becomes re-eligible for commit.
    pub fn update(&mut self, turn_id: Uuid, user_input: Option<String>, assistant_response: Option<String>, now: DateTime<Utc>) -> UpdateOutcome {
        match self.index.get(&turn_id) {
            Some(&pos) => {
                self.turns[pos].apply_edit(user_input, assistant_response, now);
                UpdateOutcome::Ok
            }
            None => UpdateOutcome::Missing,
        }
    }

    /// The most recent `k` turns, oldest first.
    pub fn recent(&self, k: usize) -> Vec<&ConversationTurn> {
        let len = self.turns.len();
        let start = len.saturating_sub(k);
        self.turns.iter().skip(start).collect()
    }

    /// Every turn currently held, oldest first.
    pub fn all_turns(&self) -> impl Iterator<Item = &ConversationTurn> {
        self.turns.iter()
    }

    /// Look up a turn by id.
    pub fn get_by_id(&self, turn_id: Uuid) -> Option<&ConversationTurn> {
        self.index.get(&turn_id).map(|&pos| &self.turns[pos])
    }

    /// Whether a turn id is currently held.
    pub fn contains(&self, turn_id: Uuid) -> bool {
        self.index.contains_key(&turn_id)
    }

    /// Sequence numbers currently held, for `ConflictResolver`'s
    /// out-of-window check.
    pub fn sequences(&self) -> impl Iterator<Item = u64> + '_ {
        self.turns.iter().map(|t| t.sequence)
    }

    /// Current occupancy summary.
    pub fn info(&self) -> WindowInfo {
        WindowInfo {
            window_size: self.window_size,
            processing_delay: self.processing_delay,
            len: self.turns.len(),
            processed: self.turns.iter().filter(|t| t.processed).count(),
            oldest_sequence: self.turns.front().map(|t| t.sequence),
            newest_sequence: self.turns.back().map(|t| t.sequence),
        }
    }

    /// Configured capacity.
    pub fn window_size(&self) -> u64 {
        self.window_size
    }

    /// Configured processing delay.
    pub fn processing_delay(&self) -> u64 {
        self.processing_delay
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z").unwrap().with_timezone(&Utc)
    }

    #[test]
    fn rejects_invalid_config() {
        assert!(SlidingWindow::new(1, 0).is_err());
        assert!(SlidingWindow::new(2, 2).is_err());
        assert!(SlidingWindow::new(4, 1).is_ok());
    }

    #[test]
    fn processing_cursor_trails_by_delay() {
        let mut w = SlidingWindow::new(4, 1).unwrap();
        assert!(w.pick_processing_target().is_none());
        w.append("u1", "a1", now());
        assert!(w.pick_processing_target().is_none()); // len=1, delay=1 -> len <= delay
        w.append("u2", "a2", now());
        let target = w.pick_processing_target().unwrap();
        assert_eq!(target.sequence, 1);
    }

    #[test]
    fn eviction_drops_oldest_permanently() {
        let mut w = SlidingWindow::new(2, 0).unwrap();
        w.append("u1", "a1", now());
        let t2 = w.append("u2", "a2", now()).turn_id;
        w.append("u3", "a3", now());
        assert_eq!(w.all_turns().count(), 2);
        assert!(!w.contains(t2));
    }

    #[test]
    fn update_clears_processed_and_bumps_version() {
        let mut w = SlidingWindow::new(4, 0).unwrap();
        let id = w.append("u1", "a1", now()).turn_id;
        w.mark_processed(id, true, now());
        assert!(w.get_by_id(id).unwrap().processed);
        assert_eq!(w.update(id, Some("edited".into()), None, now()), UpdateOutcome::Ok);
        let turn = w.get_by_id(id).unwrap();
        assert!(!turn.processed);
        assert_eq!(turn.version, 2);
        assert_eq!(turn.user_input, "edited");
    }

    #[test]
    fn append_with_id_preserves_external_id() {
        let mut w = SlidingWindow::new(3, 0).unwrap();
        let id = Uuid::new_v4();
        let turn = w.append_with_id(id, "u1", "a1", now());
        assert_eq!(turn.turn_id, id);
        assert!(w.contains(id));
    }

    #[test]
    fn sequence_numbers_strictly_increase() {
        let mut w = SlidingWindow::new(3, 0).unwrap();
        let s1 = w.append("u1", "a1", now()).sequence;
        let s2 = w.append("u2", "a2", now()).sequence;
        let s3 = w.append("u3", "a3", now()).sequence;
        assert!(s1 < s2 && s2 < s3);
    }
}
