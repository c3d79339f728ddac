//! Per-session tunables. `memory-server` layers these from defaults, an
//! optional config file, and environment variables; this crate only knows
//! the resulting values.

use serde::{Deserialize, Serialize};

/// Eviction policy applied by [`crate::registry::SessionRegistry`] when a
/// capacity bound is configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvictionPolicy {
    /// Sessions are never evicted; only explicit destroy removes one.
    None,
    /// Evict the least-recently-used session when over capacity.
    Lru,
}

/// Configuration for one session's components.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Sliding window capacity.
    pub window_size: u64,
    /// Turns held back from commit.
    pub processing_delay: u64,
    /// Hot turn-buffer capacity.
    pub hot_buffer_size: usize,
    /// Default BFS depth for context subgraphs.
    pub context_default_depth: usize,
    /// Default cap on composed context length.
    pub max_context_length: usize,
    /// Deadline for LLM extraction requests, in seconds.
    pub llm_request_timeout_seconds: u64,
    /// Whether the LLM extractor may be selected at all.
    pub enable_llm_extractor: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            window_size: 4,
            processing_delay: 1,
            hot_buffer_size: 10,
            context_default_depth: 1,
            max_context_length: 4000,
            llm_request_timeout_seconds: 180,
            enable_llm_extractor: false,
        }
    }
}
