//! Turns an utterance plus session state into a prompt-ready context
//! string: recent history, world state, and a relevant graph slice.

use memory_graph::KnowledgeGraph;
use memory_window::{StateTable, TurnBuffer};
use serde::{Deserialize, Serialize};

const TRUNCATION_MARKER: &str = "\n... [truncated]";

/// Occupancy counters returned alongside the composed string.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ContextStats {
    /// Distinct entity ids matched in the utterance.
    pub entities_count: usize,
    /// Length in characters of the final (possibly truncated) string.
    pub context_length: usize,
    /// Nodes in the relevant subgraph.
    pub graph_nodes: usize,
    /// Edges in the relevant subgraph.
    pub graph_edges: usize,
}

/// The composed context plus what it was built from.
#[derive(Debug, Clone)]
pub struct ContextResult {
    /// The full composed string, ready to prepend to a prompt.
    pub text: String,
    /// Entity ids matched by the scan, longest match first.
    pub matched_entity_ids: Vec<String>,
    /// Occupancy counters.
    pub stats: ContextStats,
}

/// Stateless composer between a session's components and a prompt string.
#[derive(Debug, Default)]
pub struct ContextBuilder;

impl ContextBuilder {
    /// Compose context for `utterance`, limiting the final string to
    /// `max_context_length` characters by truncating the graph section
    /// last (recent history and world state are always kept whole).
    pub fn build(graph: &KnowledgeGraph, turn_buffer: &TurnBuffer, state_table: &StateTable, utterance: &str, recent_k: usize, depth: usize, max_context_length: usize) -> ContextResult {
        let matched_entity_ids = scan_entities(utterance, graph);
        let subgraph = graph.subgraph(&matched_entity_ids, depth);

        let history = turn_buffer.recent_text(recent_k);
        let world_time = state_table.get_or("world_time", "Not set");
        let graph_text = subgraph.to_text();

        let head = format!("## Recent Conversation History\n{history}\n\n## Current World State\n- World Time: {world_time}\n\n## Relevant Knowledge Graph\n");

        let mut text = format!("{head}{graph_text}");
        if text.chars().count() > max_context_length {
            let budget = max_context_length.saturating_sub(head.chars().count() + TRUNCATION_MARKER.chars().count());
            let truncated_graph: String = graph_text.chars().take(budget).collect();
            text = format!("{head}{truncated_graph}{TRUNCATION_MARKER}");
        }

        let stats = ContextStats {
            entities_count: matched_entity_ids.len(),
            context_length: text.chars().count(),
            graph_nodes: subgraph.node_count(),
            graph_edges: subgraph.edge_count(),
        };

        ContextResult { text, matched_entity_ids, stats }
    }
}

/// Longest-match-first, non-overlapping scan of `utterance` against every
/// node's id/name/aliases.
fn scan_entities(utterance: &str, graph: &KnowledgeGraph) -> Vec<String> {
    let haystack = utterance.to_lowercase();

    let mut candidates: Vec<(String, String)> = Vec::new();
    for node in graph.nodes() {
        if node.is_excluded() {
            continue;
        }
        for candidate in node.match_candidates() {
            if candidate.trim().is_empty() {
                continue;
            }
            candidates.push((candidate.to_lowercase(), node.id.clone()));
        }
    }
    candidates.sort_by(|a, b| b.0.len().cmp(&a.0.len()));

    let mut taken: Vec<(usize, usize)> = Vec::new();
    let mut matched_ids = Vec::new();
    let mut seen_ids = std::collections::HashSet::new();

    for (candidate, node_id) in &candidates {
        let mut search_from = 0;
        while let Some(rel) = haystack[search_from..].find(candidate.as_str()) {
            let start = search_from + rel;
            let end = start + candidate.len();
            search_from = end;

            if taken.iter().any(|&(s, e)| start < e && s < end) {
                continue;
            }
            taken.push((start, end));
            if seen_ids.insert(node_id.clone()) {
                matched_ids.push(node_id.clone());
            }
        }
    }

    matched_ids
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};
    use memory_types::{AttrMap, EntityKind};

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z").unwrap().with_timezone(&Utc)
    }

    #[test]
    fn scan_matches_longest_candidate_first() {
        let mut g = KnowledgeGraph::new();
        g.upsert_node("grey_goose_inn", EntityKind::Location, AttrMap::new(), now());
        g.upsert_node("goose", EntityKind::Character, AttrMap::new(), now());
        let ids = scan_entities("they met at the Grey Goose Inn last night", &g);
        assert!(ids.contains(&"grey_goose_inn".to_string()));
    }

    #[test]
    fn scan_skips_soft_deleted_nodes() {
        let mut g = KnowledgeGraph::new();
        g.upsert_node("hero", EntityKind::Character, AttrMap::new(), now());
        g.mark_deleted("hero", "death", now());
        let ids = scan_entities("the hero arrives", &g);
        assert!(!ids.contains(&"hero".to_string()));
    }

    #[test]
    fn build_composes_three_sections() {
        let mut g = KnowledgeGraph::new();
        g.upsert_node("hero", EntityKind::Character, AttrMap::new(), now());
        let buffer = TurnBuffer::new(5);
        let state = StateTable::new();
        let result = ContextBuilder::build(&g, &buffer, &state, "the hero speaks", 3, 1, 4000);
        assert!(result.text.contains("## Recent Conversation History"));
        assert!(result.text.contains("## Current World State"));
        assert!(result.text.contains("## Relevant Knowledge Graph"));
        assert!(result.matched_entity_ids.contains(&"hero".to_string()));
    }

    #[test]
    fn build_truncates_graph_section_when_over_budget() {
        let mut g = KnowledgeGraph::new();
        for i in 0..200 {
            g.upsert_node(&format!("node_{i}"), EntityKind::Item, AttrMap::new(), now());
        }
        let buffer = TurnBuffer::new(5);
        let state = StateTable::new();
        let result = ContextBuilder::build(&g, &buffer, &state, "node_0 node_1 node_2", 3, 1, 80);
        assert!(result.text.ends_with("[truncated]"));
    }
}
