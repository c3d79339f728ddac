//! Keyed scalar/string world state: `string -> (value, updated_at)`.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use memory_types::StateEntry;
use serde::{Deserialize, Serialize};

/// World-state scalars (`world_time`, flags, counters, ...). No TTL:
/// entries persist until overwritten.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct StateTable {
    entries: BTreeMap<String, StateEntry>,
}

impl StateTable {
    /// Construct an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Last-write-wins set.
    pub fn put(&mut self, key: impl Into<String>, value: serde_json::Value, now: DateTime<Utc>) {
        let key = key.into();
        self.entries.insert(key.clone(), StateEntry { key, value, updated_at: now });
    }

    /// Fetch a value by key.
    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.entries.get(key).map(|e| &e.value)
    }

    /// Fetch a value as a display string, or a fallback when absent.
    pub fn get_or<'a>(&'a self, key: &str, fallback: &'a str) -> std::borrow::Cow<'a, str> {
        match self.get(key) {
            Some(serde_json::Value::String(s)) => std::borrow::Cow::Borrowed(s.as_str()),
            Some(v) => std::borrow::Cow::Owned(v.to_string()),
            None => std::borrow::Cow::Borrowed(fallback),
        }
    }

    /// A full read-only snapshot, keys in sorted order.
    pub fn snapshot(&self) -> &BTreeMap<String, StateEntry> {
        &self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z").unwrap().with_timezone(&Utc)
    }

    #[test]
    fn put_then_get_round_trips() {
        let mut t = StateTable::new();
        t.put("world_time", serde_json::json!("day 3, dusk"), now());
        assert_eq!(t.get("world_time"), Some(&serde_json::json!("day 3, dusk")));
    }

    #[test]
    fn last_write_wins() {
        let mut t = StateTable::new();
        t.put("mood", serde_json::json!("tense"), now());
        t.put("mood", serde_json::json!("calm"), now());
        assert_eq!(t.get("mood"), Some(&serde_json::json!("calm")));
    }

    #[test]
    fn get_or_falls_back_when_absent() {
        let t = StateTable::new();
        assert_eq!(t.get_or("world_time", "Not set"), "Not set");
    }
}
