//! Operation outcomes: counts and the warnings that accompany a best-effort
//! apply. No component in this crate family raises exceptions across a
//! boundary; they return a result-plus-warnings record instead.

use serde::{Deserialize, Serialize};

/// Per-apply outcome counts, returned by `MemoryFacade::apply`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplyCounts {
    /// Nodes inserted or merged.
    pub nodes_upserted: usize,
    /// Edges added.
    pub edges_added: usize,
    /// Nodes deleted (soft or hard).
    pub nodes_deleted: usize,
    /// Edges deleted.
    pub edges_deleted: usize,
}

impl ApplyCounts {
    /// Sum of all four counters — used by callers that just want "did
    /// anything change".
    pub fn total(&self) -> usize {
        self.nodes_upserted + self.edges_added + self.nodes_deleted + self.edges_deleted
    }
}

impl std::ops::Add for ApplyCounts {
    type Output = ApplyCounts;

    fn add(self, rhs: Self) -> Self::Output {
        ApplyCounts {
            nodes_upserted: self.nodes_upserted + rhs.nodes_upserted,
            edges_added: self.edges_added + rhs.edges_added,
            nodes_deleted: self.nodes_deleted + rhs.nodes_deleted,
            edges_deleted: self.edges_deleted + rhs.edges_deleted,
        }
    }
}

/// A non-fatal warning surfaced by a best-effort operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Warning {
    /// The component that raised it, e.g. `"validator"`, `"entity_store"`.
    pub source: String,
    /// Human-readable detail.
    pub message: String,
}

impl Warning {
    /// Construct a new warning.
    pub fn new(source: impl Into<String>, message: impl Into<String>) -> Self {
        Self { source: source.into(), message: message.into() }
    }
}
