//! Wires together the LLM/rule selection rule from the component contract:
//! LLM runs first when configured, rule is always the fallback, and the
//! two are never mixed within a single call.

use memory_graph::KnowledgeGraph;
use memory_types::UpdatePlan;

use crate::extractor::Extractor;
use crate::llm_extractor::LlmExtractor;
use crate::provider::CompletionProvider;
use crate::rule_extractor::RuleExtractor;

/// An extractor that prefers an LLM backend when one is configured and
/// falls back to the rule extractor otherwise (including on any LLM
/// failure, which [`LlmExtractor`] already absorbs internally).
pub enum SelectedExtractor<P: CompletionProvider> {
    /// No completion capability configured; rules only.
    RuleOnly(RuleExtractor),
    /// LLM extractor configured (with its own internal rule fallback).
    Llm(LlmExtractor<P>),
}

impl<P: CompletionProvider> SelectedExtractor<P> {
    /// Always-available rule-only mode.
    pub fn rule_only() -> Self {
        SelectedExtractor::RuleOnly(RuleExtractor::new())
    }

    /// LLM-preferred mode, given a reachable completion provider.
    pub fn with_llm(provider: P) -> Self {
        SelectedExtractor::Llm(LlmExtractor::new(provider))
    }
}

impl<P: CompletionProvider> Extractor for SelectedExtractor<P> {
    async fn analyze(&self, user_text: &str, assistant_text: &str, graph_view: &KnowledgeGraph, recent_context: &str) -> UpdatePlan {
        match self {
            SelectedExtractor::RuleOnly(rule) => rule.analyze(user_text, assistant_text, graph_view, recent_context).await,
            SelectedExtractor::Llm(llm) => llm.analyze(user_text, assistant_text, graph_view, recent_context).await,
        }
    }
}
