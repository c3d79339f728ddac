//! Directed, labeled edges between graph nodes.

use serde::{Deserialize, Serialize};

use crate::entity::AttrMap;

/// A directed, labeled relationship between two nodes.
///
/// Identity is `(source, target, label)`: multiple edges may connect the
/// same ordered pair as long as their labels differ. Re-adding an edge with
/// an identical `(source, target, label)` is idempotent and last-write-wins
/// on `attributes`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge {
    /// Source node id.
    pub source: String,
    /// Target node id.
    pub target: String,
    /// Relationship label, e.g. `member_of`, `hostile_to`, `equipped_with`.
    pub relationship: String,
    /// Open map of edge attributes.
    #[serde(default)]
    pub attributes: AttrMap,
}

impl Edge {
    /// Construct a new edge with no attributes.
    pub fn new(source: impl Into<String>, target: impl Into<String>, relationship: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            relationship: relationship.into(),
            attributes: AttrMap::new(),
        }
    }

    /// Does this edge match a (possibly partial) deletion query?
    ///
    /// `None` fields act as wildcards. Callers are responsible for rejecting
    /// all-`None` queries before calling this (see `DeleteEdgesMatching`).
    pub fn matches(&self, source: Option<&str>, target: Option<&str>, label: Option<&str>) -> bool {
        source.is_none_or(|s| s == self.source)
            && target.is_none_or(|t| t == self.target)
            && label.is_none_or(|l| l == self.relationship)
    }
}
