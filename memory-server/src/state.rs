//! Shared application state handed to every handler.

use std::sync::Arc;
use std::time::Duration;

use memory_core::{ConflictResolver, DelayedUpdateManager, SessionRegistry};
use memory_extract::{RuleExtractor, SelectedExtractor, Validator};

use crate::config::ServerConfig;
use crate::provider::HttpCompletionProvider;

/// The extractor type this binary runs: rule-only unless an LLM endpoint
/// and `enable_llm_extractor` are both configured.
pub type AppExtractor = SelectedExtractor<HttpCompletionProvider>;

/// Everything a request handler needs, cloned cheaply via `Arc`.
pub struct AppState {
    /// Session lifecycle.
    pub registry: SessionRegistry,
    /// Rule-or-LLM extractor, shared across sessions (stateless).
    pub extractor: AppExtractor,
    /// Rule-only extractor, used directly for sessions created with
    /// `enable_agent: false` regardless of this server's own LLM setup.
    pub rule_extractor: RuleExtractor,
    /// Stateless plan validator.
    pub validator: Validator,
    /// Windowed-turn driver.
    pub delayed_update: DelayedUpdateManager,
    /// External-sync reconciler.
    pub conflict_resolver: ConflictResolver,
    /// Resolved configuration, for handlers that need a tunable directly.
    pub config: ServerConfig,
}

impl AppState {
    /// Build application state from a resolved [`ServerConfig`].
    pub fn new(config: ServerConfig) -> Arc<Self> {
        let extractor = match &config.llm {
            Some(llm) if config.session.enable_llm_extractor => match &llm.endpoint {
                Some(endpoint) => {
                    let timeout = Duration::from_secs(config.session.llm_request_timeout_seconds);
                    let provider = HttpCompletionProvider::new(endpoint.clone(), llm.api_key.clone(), timeout);
                    SelectedExtractor::with_llm(provider)
                }
                None => SelectedExtractor::rule_only(),
            },
            _ => SelectedExtractor::rule_only(),
        };

        let registry = SessionRegistry::new(config.storage_root.clone(), config.session.clone(), config.eviction_policy, config.max_sessions);

        Arc::new(Self {
            registry,
            extractor,
            rule_extractor: RuleExtractor::new(),
            validator: Validator::new(),
            delayed_update: DelayedUpdateManager::new(),
            conflict_resolver: ConflictResolver::new(),
            config,
        })
    }
}
