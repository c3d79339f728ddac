//! World-state key/value entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single last-write-wins world-state entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateEntry {
    /// The key this entry is stored under.
    pub key: String,
    /// The stored value. Scalars and short strings are typical.
    pub value: serde_json::Value,
    /// When this entry was last written.
    pub updated_at: DateTime<Utc>,
}
