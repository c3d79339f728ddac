//! Bounded FIFO of recently-committed (user, assistant) pairs: hot memory.

use std::collections::VecDeque;

/// A committed (user, assistant) pair, independent of the sliding window's
/// own bookkeeping — once a turn lands here it has no `processed`/`version`
/// state, only content.
#[derive(Debug, Clone)]
pub struct BufferedTurn {
    /// The user's message.
    pub user_input: String,
    /// The assistant's reply.
    pub assistant_response: String,
}

/// Bounded FIFO of the most recent committed exchanges. Feeds the
/// "Recent Conversation History" section of composed context.
#[derive(Debug)]
pub struct TurnBuffer {
    capacity: usize,
    turns: VecDeque<BufferedTurn>,
}

impl TurnBuffer {
    /// Construct a buffer holding at most `capacity` pairs.
    pub fn new(capacity: usize) -> Self {
        Self { capacity: capacity.max(1), turns: VecDeque::new() }
    }

    /// Append a pair, evicting the oldest if at capacity.
    pub fn append(&mut self, user_input: impl Into<String>, assistant_response: impl Into<String>) {
        if self.turns.len() >= self.capacity {
            self.turns.pop_front();
        }
        self.turns.push_back(BufferedTurn { user_input: user_input.into(), assistant_response: assistant_response.into() });
    }

    /// The last `k` pairs, oldest first.
    pub fn recent(&self, k: usize) -> Vec<&BufferedTurn> {
        let len = self.turns.len();
        let start = len.saturating_sub(k);
        self.turns.iter().skip(start).collect()
    }

    /// The last `k` pairs formatted as `user: … / assistant: …` lines.
    pub fn recent_text(&self, k: usize) -> String {
        self.recent(k)
            .iter()
            .map(|t| format!("user: {}\nassistant: {}", t.user_input, t.assistant_response))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Number of pairs currently held.
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    /// Whether the buffer holds no pairs.
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evicts_oldest_when_full() {
        let mut b = TurnBuffer::new(2);
        b.append("u1", "a1");
        b.append("u2", "a2");
        b.append("u3", "a3");
        assert_eq!(b.len(), 2);
        assert_eq!(b.recent(2)[0].user_input, "u2");
    }

    #[test]
    fn recent_text_formats_pairs() {
        let mut b = TurnBuffer::new(5);
        b.append("hello", "hi there");
        assert_eq!(b.recent_text(1), "user: hello\nassistant: hi there");
    }

    #[test]
    fn recent_text_empty_buffer() {
        let b = TurnBuffer::new(5);
        assert_eq!(b.recent_text(3), "");
    }
}
