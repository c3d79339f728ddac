//! Conversation turns held by the sliding window and turn buffer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One (user, assistant) exchange.
///
/// `sequence` is assigned by the owning [`SlidingWindow`](crate) at append
/// time and is strictly increasing within a session. `version` increments
/// every time the turn's content is edited; an edit also clears `processed`
/// so the turn becomes re-eligible for commit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationTurn {
    /// Unique id, assigned at append time.
    pub turn_id: Uuid,
    /// Monotonic position within the session (starts at 1).
    pub sequence: u64,
    /// Creation timestamp (refreshed on edit).
    pub created_at: DateTime<Utc>,
    /// The user's message.
    pub user_input: String,
    /// The assistant's reply.
    pub assistant_response: String,
    /// Whether this turn has been committed to the knowledge graph.
    pub processed: bool,
    /// When `processed` last flipped to `true`.
    pub processed_at: Option<DateTime<Utc>>,
    /// Edit counter, starts at 1.
    pub version: u64,
}

impl ConversationTurn {
    /// Construct a new turn with the given sequence number.
    pub fn new(sequence: u64, user_input: impl Into<String>, assistant_response: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            turn_id: Uuid::new_v4(),
            sequence,
            created_at: now,
            user_input: user_input.into(),
            assistant_response: assistant_response.into(),
            processed: false,
            processed_at: None,
            version: 1,
        }
    }

    /// Overwrite content fields, bump `version`, clear `processed`.
    pub fn apply_edit(&mut self, user_input: Option<String>, assistant_response: Option<String>, now: DateTime<Utc>) {
        if let Some(u) = user_input {
            self.user_input = u;
        }
        if let Some(a) = assistant_response {
            self.assistant_response = a;
        }
        self.version += 1;
        self.processed = false;
        self.processed_at = None;
        self.created_at = now;
    }

    /// Mark this turn's processing outcome.
    pub fn mark_processed(&mut self, ok: bool, now: DateTime<Utc>) {
        self.processed = ok;
        self.processed_at = if ok { Some(now) } else { None };
    }

    /// The content this turn's hash/snapshot is taken over.
    pub fn content(&self) -> (&str, &str) {
        (&self.user_input, &self.assistant_response)
    }
}
