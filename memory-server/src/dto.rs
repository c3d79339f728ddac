//! Wire types for the HTTP surface. Handlers translate these into core
//! calls and back; no business logic lives here.

use chrono::{DateTime, Utc};
use memory_types::Warning;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

fn default_recent_k() -> usize {
    3
}

fn default_max_context_length() -> usize {
    4000
}

fn default_enable_agent() -> bool {
    true
}

/// Per-session override of a subset of [`memory_core::SessionConfig`]'s
/// tunables, accepted by `/initialize`'s `session_config` field. Fields
/// left unset fall back to the server's configured defaults.
#[derive(Debug, Default, Deserialize)]
pub struct SessionConfigOverride {
    /// Sliding window capacity override.
    pub window_size: Option<u64>,
    /// Processing delay override.
    pub processing_delay: Option<u64>,
    /// Hot turn-buffer capacity override.
    pub hot_buffer_size: Option<usize>,
    /// Default context-subgraph BFS depth override.
    pub context_default_depth: Option<usize>,
    /// Default context-length cap override.
    pub max_context_length: Option<usize>,
    /// LLM extraction request timeout override, in seconds.
    pub llm_request_timeout_seconds: Option<u64>,
}

impl SessionConfigOverride {
    /// Resolve this override against a base config, keeping the base value
    /// wherever the override leaves a field unset.
    pub fn resolve(&self, base: &memory_core::SessionConfig) -> memory_core::SessionConfig {
        memory_core::SessionConfig {
            window_size: self.window_size.unwrap_or(base.window_size),
            processing_delay: self.processing_delay.unwrap_or(base.processing_delay),
            hot_buffer_size: self.hot_buffer_size.unwrap_or(base.hot_buffer_size),
            context_default_depth: self.context_default_depth.unwrap_or(base.context_default_depth),
            max_context_length: self.max_context_length.unwrap_or(base.max_context_length),
            llm_request_timeout_seconds: self.llm_request_timeout_seconds.unwrap_or(base.llm_request_timeout_seconds),
            enable_llm_extractor: base.enable_llm_extractor,
        }
    }
}

/// `POST /initialize` request.
#[derive(Debug, Deserialize)]
pub struct InitializeRequest {
    /// Caller-supplied session id; generated if absent.
    pub session_id: Option<String>,
    /// Free-text character description, fed to the extractor once.
    #[serde(default)]
    pub character_card: String,
    /// Free-text world description, fed to the extractor once.
    #[serde(default)]
    pub world_info: String,
    /// Per-session tunable overrides, applied only on first creation of
    /// this session id.
    #[serde(default)]
    pub session_config: Option<SessionConfigOverride>,
    /// Test-mode flag: test sessions persist under a separate directory
    /// rather than alongside real sessions.
    #[serde(default)]
    pub is_test: bool,
    /// Whether this session may use the LLM extractor at all, independent
    /// of the server's own `enable_llm_extractor` setting. Both must be
    /// true for this session to get LLM-backed extraction.
    #[serde(default = "default_enable_agent")]
    pub enable_agent: bool,
}

/// `POST /initialize` response.
#[derive(Debug, Serialize)]
pub struct InitializeResponse {
    /// The session's id (echoed or generated).
    pub session_id: String,
    /// Human-readable confirmation.
    pub message: String,
    /// Graph occupancy right after seeding.
    pub graph_stats: GraphStats,
}

/// Node/edge counts for a graph or subgraph.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct GraphStats {
    /// Number of nodes.
    pub graph_nodes: usize,
    /// Number of edges.
    pub graph_edges: usize,
}

/// `POST /enhance_prompt` request.
#[derive(Debug, Deserialize)]
pub struct EnhancePromptRequest {
    /// Target session.
    pub session_id: String,
    /// The utterance to scan for entities and compose context around.
    pub user_input: String,
    /// Override for the hot-buffer recall depth.
    #[serde(default = "default_recent_k")]
    pub recent_history: usize,
    /// Override for the composed-context character cap.
    #[serde(default = "default_max_context_length")]
    pub max_context_length: usize,
}

/// `POST /enhance_prompt` response.
#[derive(Debug, Serialize)]
pub struct EnhancePromptResponse {
    /// The composed prompt-ready string.
    pub enhanced_context: String,
    /// Entity ids matched in `user_input`.
    pub entities_found: Vec<String>,
    /// Occupancy/length counters.
    pub context_stats: memory_core::ContextStats,
}

/// Shared request body for `/update_memory` and `/process_conversation`.
#[derive(Debug, Deserialize)]
pub struct ConversationTurnRequest {
    /// Target session.
    pub session_id: String,
    /// The user's message.
    pub user_input: String,
    /// The assistant's reply.
    pub llm_response: String,
}

/// `POST /update_memory` response: the synchronous, un-windowed path.
#[derive(Debug, Serialize)]
pub struct UpdateMemoryResponse {
    /// Human-readable confirmation.
    pub message: String,
    /// Nodes inserted or merged.
    pub nodes_updated: usize,
    /// Edges added.
    pub edges_added: usize,
    /// Validator/apply warnings.
    pub processing_stats: Vec<Warning>,
}

/// `POST /process_conversation` response: the windowed path.
#[derive(Debug, Serialize)]
pub struct ProcessConversationResponse {
    /// Sequence number assigned to the newly appended turn.
    pub turn_sequence: u64,
    /// Whether a turn fell into the committable zone this call.
    pub turn_processed: bool,
    /// Whether that turn's plan committed successfully.
    pub target_processed: bool,
    /// Configured window capacity.
    pub window_size: u64,
    /// Nodes inserted or merged by the commit, if one happened.
    pub nodes_updated: usize,
    /// Edges added by the commit, if one happened.
    pub edges_added: usize,
    /// Validator warnings from the commit, if one happened.
    pub processing_stats: Vec<Warning>,
}

/// One entry of `/sync_conversation`'s `tavern_history`.
#[derive(Debug, Deserialize)]
pub struct TavernTurn {
    /// Stable id this turn is known by on both sides.
    pub id: Uuid,
    /// Sequence number, if the host tracks one.
    pub sequence: Option<u64>,
    /// User message content.
    pub user: String,
    /// Assistant message content.
    pub assistant: String,
    /// When the host recorded it.
    pub timestamp: Option<DateTime<Utc>>,
}

/// `POST /sync_conversation` request.
#[derive(Debug, Deserialize)]
pub struct SyncConversationRequest {
    /// Target session.
    pub session_id: String,
    /// The host's authoritative turn list.
    pub tavern_history: Vec<TavernTurn>,
}

/// `POST /sync_conversation` response.
#[derive(Debug, Serialize)]
pub struct SyncConversationResponse {
    /// Records whose content hash no longer matched the window's snapshot.
    pub conflicts_detected: usize,
    /// Of those, how many were resolved by taking the host's content.
    pub conflicts_resolved: usize,
    /// Records successfully reconciled, new or updated.
    pub window_synced: usize,
}

/// `POST /sessions/{id}/reset` request.
#[derive(Debug, Deserialize, Default)]
pub struct ResetRequest {
    /// Keep the on-disk graph/mirror instead of deleting it.
    #[serde(default)]
    pub keep_character_data: bool,
}

/// `GET /sessions/{id}/stats` response.
#[derive(Debug, Serialize)]
pub struct SessionStatsResponse {
    /// The session's id.
    pub session_id: String,
    /// Graph occupancy.
    pub graph: GraphStats,
    /// Sliding-window occupancy.
    pub window: memory_window::WindowInfo,
    /// Hot turn-buffer occupancy.
    pub buffer_len: usize,
}

/// `GET /sessions` response.
#[derive(Debug, Serialize)]
pub struct ListSessionsResponse {
    /// Ids of every live session.
    pub sessions: Vec<String>,
}

/// `GET /health` response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Always `true` once the process can answer requests.
    pub ok: bool,
    /// Number of live sessions.
    pub active_sessions: usize,
}

/// `GET /sessions/{id}/export` response: the graph's lossless dump.
#[derive(Debug, Serialize)]
pub struct ExportResponse {
    /// The session's id.
    pub session_id: String,
    /// Lossless dump of every node and edge.
    pub graph: memory_graph::GraphDump,
}

/// Error body returned for every non-2xx response.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Human-readable detail.
    pub error: String,
}
