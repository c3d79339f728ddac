//! The typed directed multigraph: sole mutator of nodes and edges.

use std::collections::{HashMap, HashSet, VecDeque};

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use memory_types::{merge, AttrValue, Edge, EntityKind, Node};
use serde::{Deserialize, Serialize};

use crate::error::GraphError;
use crate::outcomes::{AddEdgeOutcome, DeleteOutcome};

type EdgeKey = (String, String, String);

/// Typed directed multigraph with attributed nodes and labeled edges.
///
/// This is the sole mutator of graph state: every other component reads a
/// `&KnowledgeGraph` or calls one of the methods below. Edge identity is
/// `(source, target, label)` — see [`Edge`].
#[derive(Debug, Default)]
pub struct KnowledgeGraph {
    nodes: IndexMap<String, Node>,
    edges: IndexMap<EdgeKey, Edge>,
}

/// A full, lossless dump of graph state — the `graph.json` format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphDump {
    /// Every node, deleted or not.
    pub nodes: Vec<Node>,
    /// Every edge.
    pub edges: Vec<Edge>,
}

impl KnowledgeGraph {
    /// Construct an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new node, or merge attributes into an existing one.
    ///
    /// On insert, `created_at = last_modified = now`. On merge, each
    /// attribute is resolved via [`merge::resolve_attribute`] and
    /// `last_modified` is bumped; `kind` is not overwritten on merge.
    pub fn upsert_node(&mut self, id: &str, kind: EntityKind, attrs: memory_types::AttrMap, now: DateTime<Utc>) {
        match self.nodes.get_mut(id) {
            Some(node) => {
                let max_health = node
                    .attributes
                    .get("max_health")
                    .or_else(|| node.attributes.get("max_hp"))
                    .and_then(AttrValue::as_f64);
                for (key, new_val) in attrs {
                    let old_val = node.attributes.get(&key);
                    let resolved = merge::resolve_attribute(&key, old_val, &new_val, max_health);
                    if matches!(key.as_str(), "location" | "status") {
                        tracing::info!(node = %id, attribute = %key, "last-write-wins attribute update");
                    }
                    node.attributes.insert(key, resolved);
                }
                node.last_modified = now;
            }
            None => {
                let mut node = Node::new(id, kind, now);
                node.attributes = attrs;
                self.nodes.insert(id.to_string(), node);
            }
        }
    }

    /// Merge a richer upsert that may also carry a display name.
    pub fn upsert_node_named(&mut self, id: &str, kind: EntityKind, name: Option<String>, attrs: memory_types::AttrMap, now: DateTime<Utc>) {
        self.upsert_node(id, kind, attrs, now);
        if let Some(name) = name {
            if let Some(node) = self.nodes.get_mut(id) {
                node.name = name;
            }
        }
    }

    /// Fetch a node by id.
    pub fn get_node(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// Whether a node exists (regardless of soft-delete state).
    pub fn has_node(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    /// Iterate every node.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Iterate every edge.
    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.values()
    }

    /// Add a directed, labeled edge. Requires both endpoints to exist.
    pub fn add_edge(&mut self, source: &str, target: &str, label: &str, attrs: memory_types::AttrMap) -> AddEdgeOutcome {
        if !self.nodes.contains_key(source) || !self.nodes.contains_key(target) {
            return AddEdgeOutcome::MissingEndpoint;
        }
        let key = (source.to_string(), target.to_string(), label.to_string());
        self.edges
            .entry(key)
            .and_modify(|edge| edge.attributes = attrs.clone())
            .or_insert_with(|| Edge { source: source.into(), target: target.into(), relationship: label.into(), attributes: attrs });
        AddEdgeOutcome::Ok
    }

    /// Hard-delete a node and every incident edge.
    pub fn delete_node(&mut self, id: &str) -> DeleteOutcome {
        if self.nodes.shift_remove(id).is_none() {
            return DeleteOutcome::NotFound;
        }
        self.edges.retain(|_, edge| edge.source != id && edge.target != id);
        DeleteOutcome::Ok
    }

    /// Soft-delete a node: set markers, keep it and its edges in place.
    pub fn mark_deleted(&mut self, id: &str, reason: &str, now: DateTime<Utc>) -> DeleteOutcome {
        match self.nodes.get_mut(id) {
            Some(node) => {
                node.mark_deleted(reason, now);
                DeleteOutcome::Ok
            }
            None => DeleteOutcome::NotFound,
        }
    }

    /// Remove edges between `source` and `target`. If `label` is `None`,
    /// removes every parallel edge between them. Returns the count removed.
    pub fn delete_edge(&mut self, source: &str, target: &str, label: Option<&str>) -> usize {
        let before = self.edges.len();
        self.edges.retain(|_, edge| !edge.matches(Some(source), Some(target), label));
        before - self.edges.len()
    }

    /// Wildcard deletion: `None` fields match anything. Rejects an
    /// all-wildcard query.
    pub fn delete_edges_matching(&mut self, source: Option<&str>, target: Option<&str>, label: Option<&str>) -> Result<usize, GraphError> {
        if source.is_none() && target.is_none() && label.is_none() {
            return Err(GraphError::AllWildcardDeletion);
        }
        let before = self.edges.len();
        self.edges.retain(|_, edge| !edge.matches(source, target, label));
        Ok(before - self.edges.len())
    }

    /// Ego-graph union: BFS from each seed up to `depth` hops, following
    /// edges in either direction. Deleted nodes are excluded. Seeds absent
    /// from the graph are skipped, not errored.
    pub fn subgraph(&self, seeds: &[String], depth: usize) -> KnowledgeGraph {
        let mut visited: HashMap<String, usize> = HashMap::new();
        let mut queue: VecDeque<(String, usize)> = VecDeque::new();

        for seed in seeds {
            if let Some(node) = self.nodes.get(seed) {
                if node.is_excluded() {
                    continue;
                }
                if !visited.contains_key(seed) {
                    visited.insert(seed.clone(), 0);
                    queue.push_back((seed.clone(), 0));
                }
            }
        }

        let neighbors = self.adjacency();
        while let Some((current, dist)) = queue.pop_front() {
            if dist >= depth {
                continue;
            }
            if let Some(adj) = neighbors.get(&current) {
                for next in adj {
                    let Some(node) = self.nodes.get(next) else { continue };
                    if node.is_excluded() {
                        continue;
                    }
                    if !visited.contains_key(next) {
                        visited.insert(next.clone(), dist + 1);
                        queue.push_back((next.clone(), dist + 1));
                    }
                }
            }
        }

        let mut result = KnowledgeGraph::new();
        for id in visited.keys() {
            if let Some(node) = self.nodes.get(id) {
                result.nodes.insert(id.clone(), node.clone());
            }
        }
        for (key, edge) in &self.edges {
            if visited.contains_key(&edge.source) && visited.contains_key(&edge.target) {
                result.edges.insert(key.clone(), edge.clone());
            }
        }
        result
    }

    fn adjacency(&self) -> HashMap<String, HashSet<String>> {
        let mut adj: HashMap<String, HashSet<String>> = HashMap::new();
        for edge in self.edges.values() {
            adj.entry(edge.source.clone()).or_default().insert(edge.target.clone());
            adj.entry(edge.target.clone()).or_default().insert(edge.source.clone());
        }
        adj
    }

    /// Lossless dump of every node and edge.
    pub fn serialize(&self) -> GraphDump {
        GraphDump {
            nodes: self.nodes.values().cloned().collect(),
            edges: self.edges.values().cloned().collect(),
        }
    }

    /// Rebuild a graph from a dump produced by [`KnowledgeGraph::serialize`].
    pub fn from_dump(dump: GraphDump) -> Self {
        let mut graph = KnowledgeGraph::new();
        for node in dump.nodes {
            graph.nodes.insert(node.id.clone(), node);
        }
        for edge in dump.edges {
            let key = (edge.source.clone(), edge.target.clone(), edge.relationship.clone());
            graph.edges.insert(key, edge);
        }
        graph
    }

    /// Text serialization consumed by `ContextBuilder`: a `[Nodes]` section
    /// followed by a `[Relationships]` section, nodes and their attributes
    /// in insertion order (the order they were first upserted, not sorted).
    pub fn to_text(&self) -> String {
        if self.nodes.is_empty() {
            return "The knowledge graph is empty.".to_string();
        }

        let mut out = String::from("[Nodes]");
        for node in self.nodes.values() {
            if node.is_excluded() {
                continue;
            }
            out.push('\n');
            out.push_str(&format_node_line(node));
        }

        out.push_str("\n\n[Relationships]");
        for (_, edge) in &self.edges {
            out.push('\n');
            out.push_str(&format_edge_line(edge));
        }
        out
    }

    /// Number of nodes currently held (including soft-deleted).
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of edges currently held.
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Insert a fully-formed node as-is, bypassing merge rules. Used when
    /// reconstructing a graph from a stored representation.
    pub fn insert_loaded_node(&mut self, node: Node) {
        self.nodes.insert(node.id.clone(), node);
    }

    /// Insert a fully-formed edge as-is, bypassing endpoint checks. Used
    /// when reconstructing a graph from a stored representation.
    pub fn insert_loaded_edge(&mut self, edge: Edge) {
        let key = (edge.source.clone(), edge.target.clone(), edge.relationship.clone());
        self.edges.insert(key, edge);
    }
}

fn format_attr_value(v: &AttrValue) -> String {
    match v {
        AttrValue::Text(s) => format!("{s:?}"),
        AttrValue::Number(n) => n.to_string(),
        AttrValue::Bool(b) => b.to_string(),
        AttrValue::List(items) => format!("[{}]", items.iter().map(|i| format!("{i:?}")).collect::<Vec<_>>().join(", ")),
    }
}

fn format_node_line(node: &Node) -> String {
    let attrs: Vec<String> = node.attributes.iter().map(|(k, v)| format!("{k}: {}", format_attr_value(v))).collect();
    if attrs.is_empty() {
        format!("- {} (type: {})", node.id, node.kind)
    } else {
        format!("- {} (type: {}): {{ {} }}", node.id, node.kind, attrs.join(", "))
    }
}

fn format_edge_line(edge: &Edge) -> String {
    let attrs: Vec<String> = edge.attributes.iter().map(|(k, v)| format!("{k}: {}", format_attr_value(v))).collect();
    if attrs.is_empty() {
        format!("- {} -> {} ({})", edge.source, edge.target, edge.relationship)
    } else {
        format!("- {} -> {} ({}): {{ {} }}", edge.source, edge.target, edge.relationship, attrs.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use memory_types::AttrMap;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z").unwrap().with_timezone(&Utc)
    }

    #[test]
    fn upsert_creates_then_merges() {
        let mut g = KnowledgeGraph::new();
        let mut attrs = AttrMap::new();
        attrs.insert("health".into(), AttrValue::Number(50.0));
        g.upsert_node("hero", EntityKind::Character, attrs, now());
        assert_eq!(g.get_node("hero").unwrap().attributes.get("health"), Some(&AttrValue::Number(50.0)));

        let mut attrs2 = AttrMap::new();
        attrs2.insert("health".into(), AttrValue::Number(30.0));
        g.upsert_node("hero", EntityKind::Character, attrs2, now());
        assert_eq!(g.get_node("hero").unwrap().attributes.get("health"), Some(&AttrValue::Number(30.0)));
    }

    #[test]
    fn add_edge_requires_both_endpoints() {
        let mut g = KnowledgeGraph::new();
        g.upsert_node("a", EntityKind::Character, AttrMap::new(), now());
        assert_eq!(g.add_edge("a", "b", "knows", AttrMap::new()), AddEdgeOutcome::MissingEndpoint);
        g.upsert_node("b", EntityKind::Character, AttrMap::new(), now());
        assert_eq!(g.add_edge("a", "b", "knows", AttrMap::new()), AddEdgeOutcome::Ok);
        assert_eq!(g.edge_count(), 1);
    }

    #[test]
    fn parallel_edges_with_distinct_labels_both_exist() {
        let mut g = KnowledgeGraph::new();
        g.upsert_node("a", EntityKind::Character, AttrMap::new(), now());
        g.upsert_node("b", EntityKind::Character, AttrMap::new(), now());
        g.add_edge("a", "b", "knows", AttrMap::new());
        g.add_edge("a", "b", "hostile_to", AttrMap::new());
        assert_eq!(g.edge_count(), 2);
    }

    #[test]
    fn duplicate_label_is_idempotent_last_write_wins() {
        let mut g = KnowledgeGraph::new();
        g.upsert_node("a", EntityKind::Character, AttrMap::new(), now());
        g.upsert_node("b", EntityKind::Character, AttrMap::new(), now());
        let mut attrs = AttrMap::new();
        attrs.insert("since".into(), AttrValue::Text("yesterday".into()));
        g.add_edge("a", "b", "knows", attrs);
        let mut attrs2 = AttrMap::new();
        attrs2.insert("since".into(), AttrValue::Text("today".into()));
        g.add_edge("a", "b", "knows", attrs2);
        assert_eq!(g.edge_count(), 1);
        let edge = g.edges().next().unwrap();
        assert_eq!(edge.attributes.get("since"), Some(&AttrValue::Text("today".into())));
    }

    #[test]
    fn hard_delete_removes_incident_edges() {
        let mut g = KnowledgeGraph::new();
        g.upsert_node("a", EntityKind::Character, AttrMap::new(), now());
        g.upsert_node("b", EntityKind::Character, AttrMap::new(), now());
        g.add_edge("a", "b", "knows", AttrMap::new());
        assert_eq!(g.delete_node("a"), DeleteOutcome::Ok);
        assert_eq!(g.edge_count(), 0);
        assert_eq!(g.delete_node("a"), DeleteOutcome::NotFound);
    }

    #[test]
    fn soft_delete_keeps_node_and_edges() {
        let mut g = KnowledgeGraph::new();
        g.upsert_node("a", EntityKind::Character, AttrMap::new(), now());
        g.upsert_node("b", EntityKind::Character, AttrMap::new(), now());
        g.add_edge("a", "b", "knows", AttrMap::new());
        assert_eq!(g.mark_deleted("a", "death", now()), DeleteOutcome::Ok);
        assert!(g.get_node("a").unwrap().deleted);
        assert_eq!(g.edge_count(), 1);
    }

    #[test]
    fn delete_edges_matching_rejects_all_wildcard() {
        let mut g = KnowledgeGraph::new();
        assert!(matches!(g.delete_edges_matching(None, None, None), Err(GraphError::AllWildcardDeletion)));
    }

    #[test]
    fn subgraph_excludes_deleted_and_respects_depth() {
        let mut g = KnowledgeGraph::new();
        for id in ["a", "b", "c", "d"] {
            g.upsert_node(id, EntityKind::Character, AttrMap::new(), now());
        }
        g.add_edge("a", "b", "knows", AttrMap::new());
        g.add_edge("b", "c", "knows", AttrMap::new());
        g.add_edge("c", "d", "knows", AttrMap::new());
        g.mark_deleted("c", "gone", now());

        let sub1 = g.subgraph(&["a".to_string()], 1);
        assert!(sub1.has_node("a"));
        assert!(sub1.has_node("b"));
        assert!(!sub1.has_node("c"));

        let sub2 = g.subgraph(&["a".to_string()], 2);
        // c is deleted so it (and anything only reachable through it) is excluded
        assert!(!sub2.has_node("c"));
        assert!(!sub2.has_node("d"));
    }

    #[test]
    fn subgraph_containment_grows_with_depth() {
        let mut g = KnowledgeGraph::new();
        for id in ["a", "b", "c"] {
            g.upsert_node(id, EntityKind::Character, AttrMap::new(), now());
        }
        g.add_edge("a", "b", "knows", AttrMap::new());
        g.add_edge("b", "c", "knows", AttrMap::new());

        let sub0 = g.subgraph(&["a".to_string()], 0);
        let sub1 = g.subgraph(&["a".to_string()], 1);
        for id in sub0.nodes().map(|n| n.id.clone()) {
            assert!(sub1.has_node(&id));
        }
        assert!(sub1.node_count() >= sub0.node_count());
    }

    #[test]
    fn missing_seed_is_skipped_not_errored() {
        let mut g = KnowledgeGraph::new();
        g.upsert_node("a", EntityKind::Character, AttrMap::new(), now());
        let sub = g.subgraph(&["ghost".to_string(), "a".to_string()], 1);
        assert_eq!(sub.node_count(), 1);
    }

    #[test]
    fn round_trip_dump_preserves_state() {
        let mut g = KnowledgeGraph::new();
        let mut attrs = AttrMap::new();
        attrs.insert("health".into(), AttrValue::Number(42.0));
        g.upsert_node("a", EntityKind::Character, attrs, now());
        g.upsert_node("b", EntityKind::Location, AttrMap::new(), now());
        g.add_edge("a", "b", "located_in", AttrMap::new());
        g.mark_deleted("a", "test", now());

        let dump = g.serialize();
        let restored = KnowledgeGraph::from_dump(dump);
        assert_eq!(restored.node_count(), g.node_count());
        assert_eq!(restored.edge_count(), g.edge_count());
        assert!(restored.get_node("a").unwrap().deleted);
    }

    #[test]
    fn idempotent_apply_same_plan_twice() {
        let mut g = KnowledgeGraph::new();
        let mut attrs = AttrMap::new();
        attrs.insert("tag".into(), AttrValue::List(vec!["brave".into()]));
        g.upsert_node("hero", EntityKind::Character, attrs.clone(), now());
        let first_count = g.node_count();
        g.upsert_node("hero", EntityKind::Character, attrs, now());
        assert_eq!(g.node_count(), first_count);
        assert_eq!(g.get_node("hero").unwrap().attributes.get("tag"), Some(&AttrValue::List(vec!["brave".into()])));
    }
}
