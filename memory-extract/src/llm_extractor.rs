//! Provider-backed extractor: prompts a completion backend for a structured
//! plan and auto-creates placeholder endpoints so the Validator doesn't drop
//! valid new relations.

use memory_graph::KnowledgeGraph;
use memory_types::{AttrMap, EntityKind, NodeUpsert, UpdatePlan};
use tracing::warn;

use crate::extractor::Extractor;
use crate::provider::{CompletionProvider, CompletionRequest};
use crate::rule_extractor::RuleExtractor;

const TASK_DESCRIPTION: &str = "You maintain a knowledge graph for an ongoing interactive story. \
Given the latest exchange, recent context, and a view of the currently-relevant graph, emit a JSON \
UpdatePlan describing nodes to upsert, edges to add, and any deletions. Respond with JSON only.";

/// How many hops out from a directly-mentioned node the prompt's graph view
/// should include.
const PROMPT_SUBGRAPH_DEPTH: usize = 1;

/// Node ids whose id, name, or any alias appears as a whole word in either
/// text. Mirrors the entity-scan idiom `ContextBuilder` uses for user-facing
/// context, but on word tokens rather than substrings — the prompt only
/// needs to know which nodes the turn touched, not where in the text.
fn mentioned_node_ids(user_text: &str, assistant_text: &str, graph: &KnowledgeGraph) -> Vec<String> {
    let mut words: std::collections::HashSet<String> = std::collections::HashSet::new();
    for text in [user_text, assistant_text] {
        for word in text.split(|c: char| !c.is_alphanumeric() && c != '_') {
            if !word.is_empty() {
                words.insert(word.to_lowercase());
            }
        }
    }

    let mut ids = Vec::new();
    for node in graph.nodes() {
        if node.is_excluded() {
            continue;
        }
        let touched = node.match_candidates().any(|candidate| {
            let candidate = candidate.to_lowercase();
            !candidate.is_empty() && candidate.split(|c: char| !c.is_alphanumeric() && c != '_').filter(|w| !w.is_empty()).all(|w| words.contains(w))
        });
        if touched {
            ids.push(node.id.clone());
        }
    }
    ids
}

/// LLM-backed extractor. Falls back to [`RuleExtractor`] on any provider
/// failure or unparsable response, so callers never see an error from
/// `analyze` itself.
pub struct LlmExtractor<P: CompletionProvider> {
    provider: P,
    max_tokens: u32,
    fallback: RuleExtractor,
}

impl<P: CompletionProvider> LlmExtractor<P> {
    /// Construct an LLM extractor over the given completion provider.
    pub fn new(provider: P) -> Self {
        Self { provider, max_tokens: 1024, fallback: RuleExtractor::new() }
    }

    /// Override the response token budget (default 1024).
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    fn build_prompt(&self, user_text: &str, assistant_text: &str, graph_view: &KnowledgeGraph, recent_context: &str) -> String {
        format!(
            "{task}\n\n## Recent context\n{recent}\n\n## Latest exchange\nuser: {user}\nassistant: {assistant}\n\n## Relevant graph\n{graph}\n",
            task = TASK_DESCRIPTION,
            recent = recent_context,
            user = user_text,
            assistant = assistant_text,
            graph = graph_view.to_text(),
        )
    }

    /// Strip surrounding prose or a ```json fence from a completion and
    /// parse the remainder as an `UpdatePlan`. Malformed operations are not
    /// individually recoverable here — the whole response either parses or
    /// the caller falls back to the rule extractor.
    fn parse_plan(&self, text: &str) -> Option<UpdatePlan> {
        let candidate = extract_json_object(text)?;
        match serde_json::from_str::<UpdatePlan>(&candidate) {
            Ok(plan) => Some(plan),
            Err(err) => {
                warn!(error = %err, "llm extractor: response did not parse as UpdatePlan");
                None
            }
        }
    }

    /// Auto-create placeholder nodes for any edge endpoint that is neither
    /// already in the graph nor upserted elsewhere in this same plan.
    fn auto_create_placeholders(&self, plan: &mut UpdatePlan, graph_view: &KnowledgeGraph) {
        let mut known: std::collections::HashSet<String> = plan.nodes_to_upsert.iter().map(|n| n.id.clone()).collect();
        let mut placeholders = Vec::new();
        for edge in &plan.edges_to_add {
            for id in [&edge.source, &edge.target] {
                if !known.contains(id) && !graph_view.has_node(id) {
                    known.insert(id.clone());
                    placeholders.push(NodeUpsert { id: id.clone(), kind: EntityKind::Unknown, name: None, attributes: AttrMap::new() });
                }
            }
        }
        if !placeholders.is_empty() {
            warn!(count = placeholders.len(), "llm extractor: auto-creating placeholder nodes for new edge endpoints");
        }
        plan.nodes_to_upsert.extend(placeholders);
    }
}

fn extract_json_object(text: &str) -> Option<String> {
    let trimmed = text.trim();
    let body = trimmed.strip_prefix("```json").or_else(|| trimmed.strip_prefix("```")).map(str::trim_start).unwrap_or(trimmed);
    let body = body.strip_suffix("```").map(str::trim_end).unwrap_or(body);
    let start = body.find('{')?;
    let end = body.rfind('}')?;
    if end < start {
        return None;
    }
    Some(body[start..=end].to_string())
}

impl<P: CompletionProvider> Extractor for LlmExtractor<P> {
    async fn analyze(&self, user_text: &str, assistant_text: &str, graph_view: &KnowledgeGraph, recent_context: &str) -> UpdatePlan {
        let seeds = mentioned_node_ids(user_text, assistant_text, graph_view);
        let relevant = graph_view.subgraph(&seeds, PROMPT_SUBGRAPH_DEPTH);
        let prompt = self.build_prompt(user_text, assistant_text, &relevant, recent_context);
        let request = CompletionRequest { prompt, max_tokens: self.max_tokens };

        let response = match self.provider.complete(request).await {
            Ok(response) => response,
            Err(err) => {
                warn!(error = %err, "llm extractor: completion request failed, falling back to rule extractor");
                return self.fallback.analyze(user_text, assistant_text, graph_view, recent_context).await;
            }
        };

        let Some(mut plan) = self.parse_plan(&response.text) else {
            return self.fallback.analyze(user_text, assistant_text, graph_view, recent_context).await;
        };

        self.auto_create_placeholders(&mut plan, graph_view);
        plan
    }
}
