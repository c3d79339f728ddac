//! `UpdatePlan`: the pure-data output of an [`Extractor`](crate) and the
//! input to the [`Validator`](crate) and `MemoryFacade::apply`.

use serde::{Deserialize, Serialize};

use crate::entity::{AttrMap, EntityKind};

/// A node to insert or merge into the graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeUpsert {
    /// Target node id.
    pub id: String,
    /// Entity kind. Used on first insert; ignored on merge.
    #[serde(rename = "type", default)]
    pub kind: EntityKind,
    /// Display name, if known.
    #[serde(default)]
    pub name: Option<String>,
    /// Attributes to merge in (see attribute conflict resolution rules).
    #[serde(default)]
    pub attributes: AttrMap,
}

impl NodeUpsert {
    /// Convenience constructor for a bare upsert with no attributes.
    pub fn new(id: impl Into<String>, kind: EntityKind) -> Self {
        Self { id: id.into(), kind, name: None, attributes: AttrMap::new() }
    }
}

/// An edge to add (or idempotently refresh) between two nodes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeAdd {
    /// Source node id.
    pub source: String,
    /// Target node id.
    pub target: String,
    /// Relationship label.
    pub label: String,
    /// Edge attributes.
    #[serde(default)]
    pub attributes: AttrMap,
}

/// Whether a node deletion removes the node entirely or only marks it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeleteMode {
    /// Sets soft-delete markers; node and its edges are retained.
    Soft,
    /// Removes the node and every incident edge.
    Hard,
}

/// A node deletion instruction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeDelete {
    /// Target node id.
    pub id: String,
    /// Soft or hard delete.
    pub mode: DeleteMode,
    /// Human-readable reason, e.g. `"death"`, `"lost"`.
    #[serde(default)]
    pub reason: String,
}

/// A (possibly wildcarded) edge deletion query.
///
/// At least one of `source`, `target`, `label` must be concrete — an
/// all-wildcard query is rejected by the graph and the validator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeDeleteMatch {
    /// Source node id, or `None` to match any.
    #[serde(default)]
    pub source: Option<String>,
    /// Target node id, or `None` to match any.
    #[serde(default)]
    pub target: Option<String>,
    /// Relationship label, or `None` to match any.
    #[serde(default)]
    pub label: Option<String>,
    /// Human-readable reason.
    #[serde(default)]
    pub reason: String,
}

impl EdgeDeleteMatch {
    /// Whether this query pins down at least one field.
    pub fn is_all_wildcard(&self) -> bool {
        self.source.is_none() && self.target.is_none() && self.label.is_none()
    }
}

/// A pure value describing intended graph mutations, produced by an
/// [`Extractor`](crate) and narrowed by the [`Validator`](crate) before
/// being committed through `MemoryFacade::apply`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdatePlan {
    /// Nodes to insert or merge.
    #[serde(default)]
    pub nodes_to_upsert: Vec<NodeUpsert>,
    /// Edges to add.
    #[serde(default)]
    pub edges_to_add: Vec<EdgeAdd>,
    /// Nodes to delete (soft or hard).
    #[serde(default)]
    pub nodes_to_delete: Vec<NodeDelete>,
    /// Wildcard-capable edge deletions.
    #[serde(default)]
    pub edges_to_delete: Vec<EdgeDeleteMatch>,
}

impl UpdatePlan {
    /// An empty plan — the validator's default output when nothing survives.
    pub fn empty() -> Self {
        Self::default()
    }

    /// True when every list is empty.
    pub fn is_empty(&self) -> bool {
        self.nodes_to_upsert.is_empty()
            && self.edges_to_add.is_empty()
            && self.nodes_to_delete.is_empty()
            && self.edges_to_delete.is_empty()
    }
}
