//! The `Extractor` capability: conversation turn + graph view -> `UpdatePlan`.

use std::future::Future;

use memory_graph::KnowledgeGraph;
use memory_types::UpdatePlan;

/// Turns a (user, assistant) exchange plus graph/recency context into a
/// proposed [`UpdatePlan`]. Never fails outright — callers that can fail
/// (the LLM extractor) fall back to a non-failing alternative internally.
pub trait Extractor: Send + Sync {
    /// Analyze one turn's content against the current graph and recent
    /// conversation context, producing a (possibly empty) `UpdatePlan`.
    fn analyze(
        &self,
        user_text: &str,
        assistant_text: &str,
        graph_view: &KnowledgeGraph,
        recent_context: &str,
    ) -> impl Future<Output = UpdatePlan> + Send;
}
