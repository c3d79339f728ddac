//! Narrows a raw `UpdatePlan` down to one guaranteed to satisfy commit
//! invariants. Never errors — returns a possibly-empty plan and warnings.

use std::collections::HashSet;

use memory_graph::KnowledgeGraph;
use memory_types::{EdgeAdd, EdgeDeleteMatch, NodeDelete, NodeUpsert, UpdatePlan, Warning};

/// Stateless filter between an [`crate::Extractor`] and `MemoryFacade::apply`.
#[derive(Debug, Default)]
pub struct Validator;

impl Validator {
    /// Construct a validator.
    pub fn new() -> Self {
        Self
    }

    /// Filter `plan` against `graph_view`, returning the narrowed plan and
    /// any warnings raised along the way.
    pub fn validate(&self, plan: UpdatePlan, graph_view: &KnowledgeGraph) -> (UpdatePlan, Vec<Warning>) {
        let mut warnings = Vec::new();

        let nodes_to_upsert = dedup_upserts(plan.nodes_to_upsert);
        let upserted_ids: HashSet<String> = nodes_to_upsert.iter().map(|n| normalize_id(&n.id)).collect();

        let mut edges_to_add = Vec::new();
        for edge in dedup_edges(plan.edges_to_add) {
            let source_known = upserted_ids.contains(&normalize_id(&edge.source)) || graph_view.has_node(&edge.source);
            let target_known = upserted_ids.contains(&normalize_id(&edge.target)) || graph_view.has_node(&edge.target);
            if source_known && target_known {
                edges_to_add.push(edge);
            } else {
                warnings.push(Warning::new("validator", format!("dropping edge {} -> {}: endpoint not in graph or plan", edge.source, edge.target)));
            }
        }

        let nodes_to_delete = dedup_deletes(plan.nodes_to_delete);

        let mut edges_to_delete = Vec::new();
        for query in dedup_delete_matches(plan.edges_to_delete) {
            if query.is_all_wildcard() {
                warnings.push(Warning::new("validator", "dropping all-wildcard edge deletion".to_string()));
                continue;
            }
            edges_to_delete.push(query);
        }

        (UpdatePlan { nodes_to_upsert, edges_to_add, nodes_to_delete, edges_to_delete }, warnings)
    }
}

fn normalize_id(id: &str) -> String {
    id.trim().to_ascii_lowercase()
}

fn dedup_upserts(nodes: Vec<NodeUpsert>) -> Vec<NodeUpsert> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for mut node in nodes {
        node.id = node.id.trim().to_string();
        let key = normalize_id(&node.id);
        if seen.insert(key) {
            out.push(node);
        }
    }
    out
}

fn dedup_edges(edges: Vec<EdgeAdd>) -> Vec<EdgeAdd> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for edge in edges {
        let key = (normalize_id(&edge.source), normalize_id(&edge.target), edge.label.to_ascii_lowercase());
        if seen.insert(key) {
            out.push(edge);
        }
    }
    out
}

fn dedup_deletes(deletes: Vec<NodeDelete>) -> Vec<NodeDelete> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for del in deletes {
        let key = normalize_id(&del.id);
        if seen.insert(key) {
            out.push(del);
        }
    }
    out
}

fn dedup_delete_matches(matches: Vec<EdgeDeleteMatch>) -> Vec<EdgeDeleteMatch> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for m in matches {
        let key = (m.source.as_ref().map(|s| normalize_id(s)), m.target.as_ref().map(|s| normalize_id(s)), m.label.clone());
        if seen.insert(key) {
            out.push(m);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use memory_types::{AttrMap, DeleteMode, EntityKind};

    fn now() -> chrono::DateTime<Utc> {
        Utc::now()
    }

    #[test]
    fn drops_edge_with_dangling_endpoint() {
        let v = Validator::new();
        let mut graph = KnowledgeGraph::new();
        graph.upsert_node("hero", EntityKind::Character, AttrMap::new(), now());
        let plan = UpdatePlan {
            edges_to_add: vec![EdgeAdd { source: "hero".into(), target: "ghost".into(), label: "knows".into(), attributes: AttrMap::new() }],
            ..UpdatePlan::empty()
        };
        let (validated, warnings) = v.validate(plan, &graph);
        assert!(validated.edges_to_add.is_empty());
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn keeps_edge_to_node_upserted_in_same_plan() {
        let v = Validator::new();
        let graph = KnowledgeGraph::new();
        let plan = UpdatePlan {
            nodes_to_upsert: vec![NodeUpsert::new("hero", EntityKind::Character), NodeUpsert::new("villain", EntityKind::Character)],
            edges_to_add: vec![EdgeAdd { source: "hero".into(), target: "villain".into(), label: "hostile_to".into(), attributes: AttrMap::new() }],
            ..UpdatePlan::empty()
        };
        let (validated, warnings) = v.validate(plan, &graph);
        assert_eq!(validated.edges_to_add.len(), 1);
        assert!(warnings.is_empty());
    }

    #[test]
    fn drops_all_wildcard_deletion() {
        let v = Validator::new();
        let graph = KnowledgeGraph::new();
        let plan = UpdatePlan { edges_to_delete: vec![EdgeDeleteMatch { source: None, target: None, label: None, reason: String::new() }], ..UpdatePlan::empty() };
        let (validated, warnings) = v.validate(plan, &graph);
        assert!(validated.edges_to_delete.is_empty());
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn dedups_duplicate_upserts_case_insensitively() {
        let v = Validator::new();
        let graph = KnowledgeGraph::new();
        let plan = UpdatePlan {
            nodes_to_upsert: vec![NodeUpsert::new("Hero", EntityKind::Character), NodeUpsert::new("hero", EntityKind::Character)],
            ..UpdatePlan::empty()
        };
        let (validated, _) = v.validate(plan, &graph);
        assert_eq!(validated.nodes_to_upsert.len(), 1);
        assert_eq!(validated.nodes_to_upsert[0].id, "Hero");
    }

    #[test]
    fn preserves_hard_vs_soft_delete_choice() {
        let v = Validator::new();
        let graph = KnowledgeGraph::new();
        let plan = UpdatePlan {
            nodes_to_delete: vec![NodeDelete { id: "lantern".into(), mode: DeleteMode::Hard, reason: "lost".into() }],
            ..UpdatePlan::empty()
        };
        let (validated, _) = v.validate(plan, &graph);
        assert_eq!(validated.nodes_to_delete[0].mode, DeleteMode::Hard);
    }
}
