//! The per-session facade: one lock guarding everything a session owns.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, Utc};
use memory_graph::{EntityStore, KnowledgeGraph};
use memory_types::{ApplyCounts, DeleteMode, UpdatePlan};
use memory_window::{SlidingWindow, StateTable, TurnBuffer};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::config::SessionConfig;
use crate::context_builder::{ContextBuilder, ContextResult};
use crate::conflict_resolver::TurnSnapshot;
use crate::error::FacadeError;

/// The four files a session directory holds.
struct Layout {
    dir: PathBuf,
}

impl Layout {
    fn graph(&self) -> PathBuf {
        self.dir.join("graph.json")
    }
    fn entities(&self) -> PathBuf {
        self.dir.join("entities.json")
    }
    fn buffer(&self) -> PathBuf {
        self.dir.join("conversation_buffer.json")
    }
    fn state(&self) -> PathBuf {
        self.dir.join("state.json")
    }
}

/// Everything guarded by a session's single lock: the knowledge graph, the
/// hot turn buffer, the state table, the sliding window, its conflict
/// snapshots, and the dirty flag.
pub struct SessionInner {
    pub(crate) graph: KnowledgeGraph,
    pub(crate) turn_buffer: TurnBuffer,
    pub(crate) state_table: StateTable,
    pub(crate) window: SlidingWindow,
    pub(crate) snapshots: std::collections::HashMap<Uuid, TurnSnapshot>,
    pub(crate) dirty: bool,
}

impl SessionInner {
    pub(crate) fn new(config: &SessionConfig) -> Result<Self, memory_window::WindowConfigError> {
        Ok(Self {
            graph: KnowledgeGraph::new(),
            turn_buffer: TurnBuffer::new(config.hot_buffer_size),
            state_table: StateTable::new(),
            window: SlidingWindow::new(config.window_size, config.processing_delay)?,
            snapshots: std::collections::HashMap::new(),
            dirty: false,
        })
    }

    /// Apply a plan in the fixed order deletes -> upserts -> edges, marking
    /// the session dirty. Best-effort: every entry is applied independently
    /// and a missing endpoint or absent node only drops that one entry.
    pub fn apply(&mut self, plan: UpdatePlan, now: DateTime<Utc>) -> ApplyCounts {
        let mut counts = ApplyCounts::default();

        for del in &plan.nodes_to_delete {
            let outcome = match del.mode {
                DeleteMode::Hard => self.graph.delete_node(&del.id),
                DeleteMode::Soft => self.graph.mark_deleted(&del.id, &del.reason, now),
            };
            if outcome == memory_graph::DeleteOutcome::Ok {
                counts.nodes_deleted += 1;
            }
        }
        for query in &plan.edges_to_delete {
            if query.is_all_wildcard() {
                continue;
            }
            if let Ok(n) = self.graph.delete_edges_matching(query.source.as_deref(), query.target.as_deref(), query.label.as_deref()) {
                counts.edges_deleted += n;
            }
        }

        for upsert in &plan.nodes_to_upsert {
            self.graph.upsert_node_named(&upsert.id, upsert.kind, upsert.name.clone(), upsert.attributes.clone(), now);
            counts.nodes_upserted += 1;
        }

        for edge in &plan.edges_to_add {
            if self.graph.add_edge(&edge.source, &edge.target, &edge.label, edge.attributes.clone()) == memory_graph::AddEdgeOutcome::Ok {
                counts.edges_added += 1;
            }
        }

        if counts.total() > 0 {
            self.dirty = true;
        }
        counts
    }

    /// Append a committed pair to hot memory and mark the session dirty.
    pub fn record_turn(&mut self, user_input: impl Into<String>, assistant_response: impl Into<String>) {
        self.turn_buffer.append(user_input, assistant_response);
        self.dirty = true;
    }

    /// Compose prompt-ready context for `utterance`.
    pub fn retrieve_context(&self, utterance: &str, recent_k: usize, depth: usize, max_context_length: usize) -> ContextResult {
        ContextBuilder::build(&self.graph, &self.turn_buffer, &self.state_table, utterance, recent_k, depth, max_context_length)
    }
}

/// A session: a stable id, a persistence directory, and the single lock
/// guarding its state. Owned exclusively by the registry; callers borrow an
/// `Arc<Session>` for the duration of one request.
pub struct Session {
    id: String,
    layout: Layout,
    pub(crate) inner: RwLock<SessionInner>,
    last_accessed_unix: AtomicI64,
    enable_llm_extractor: bool,
}

impl Session {
    /// Construct a fresh, empty session rooted at `dir`.
    pub fn new(id: impl Into<String>, dir: impl AsRef<Path>, config: &SessionConfig, now: DateTime<Utc>) -> Result<Self, memory_window::WindowConfigError> {
        Ok(Self {
            id: id.into(),
            layout: Layout { dir: dir.as_ref().to_path_buf() },
            inner: RwLock::new(SessionInner::new(config)?),
            last_accessed_unix: AtomicI64::new(now.timestamp()),
            enable_llm_extractor: config.enable_llm_extractor,
        })
    }

    /// Session id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Directory this session persists to.
    pub fn dir(&self) -> &Path {
        &self.layout.dir
    }

    /// Whether this session was created with the LLM extractor enabled
    /// (the per-session `session_config`/`enable_agent` override resolved
    /// at creation time, not the server-wide default).
    pub fn enable_llm_extractor(&self) -> bool {
        self.enable_llm_extractor
    }

    /// Touch the LRU clock. Cheap, lock-free.
    pub fn touch(&self, now: DateTime<Utc>) {
        self.last_accessed_unix.store(now.timestamp(), Ordering::Relaxed);
    }

    /// Seconds-since-epoch of the last touch, used by LRU eviction.
    pub fn last_accessed(&self) -> i64 {
        self.last_accessed_unix.load(Ordering::Relaxed)
    }

    /// Apply a plan directly (the un-windowed `/update_memory` path).
    pub async fn apply(&self, plan: UpdatePlan, now: DateTime<Utc>) -> ApplyCounts {
        self.inner.write().await.apply(plan, now)
    }

    /// Append a committed pair to hot memory, marking the session dirty.
    pub async fn record_turn(&self, user_input: impl Into<String>, assistant_response: impl Into<String>) {
        self.inner.write().await.record_turn(user_input, assistant_response);
    }

    /// Compose prompt-ready context for `utterance`. Shared lock: safe
    /// alongside other readers, excluded from concurrent mutators.
    pub async fn retrieve_context(&self, utterance: &str, recent_k: usize, depth: usize, max_context_length: usize) -> ContextResult {
        self.inner.read().await.retrieve_context(utterance, recent_k, depth, max_context_length)
    }

    /// Current node/edge counts.
    pub async fn graph_stats(&self) -> (usize, usize) {
        let guard = self.inner.read().await;
        (guard.graph.node_count(), guard.graph.edge_count())
    }

    /// Current sliding-window occupancy.
    pub async fn window_info(&self) -> memory_window::WindowInfo {
        self.inner.read().await.window.info()
    }

    /// Number of pairs held in the hot turn buffer.
    pub async fn buffer_len(&self) -> usize {
        self.inner.read().await.turn_buffer.len()
    }

    /// Lossless dump of the current graph, for `/sessions/{id}/export`.
    pub async fn export_graph(&self) -> memory_graph::GraphDump {
        self.inner.read().await.graph.serialize()
    }

    /// Run one `DelayedUpdateManager::on_new_turn` pass under the session's
    /// write lock.
    pub async fn on_new_turn<E: memory_extract::Extractor>(
        &self,
        manager: &crate::delayed_update::DelayedUpdateManager,
        extractor: &E,
        validator: &memory_extract::Validator,
        user_input: impl Into<String>,
        assistant_response: impl Into<String>,
        now: DateTime<Utc>,
    ) -> crate::delayed_update::NewTurnOutcome {
        let mut guard = self.inner.write().await;
        manager.on_new_turn(&mut guard, extractor, validator, user_input, assistant_response, now).await
    }

    /// Reconcile an externally-authoritative turn list under the session's
    /// write lock.
    pub async fn sync_external(&self, resolver: &crate::conflict_resolver::ConflictResolver, external: &[crate::conflict_resolver::ExternalTurnRecord], now: DateTime<Utc>) -> crate::conflict_resolver::SyncReport {
        let mut guard = self.inner.write().await;
        resolver.sync(&mut guard, external, now)
    }

    /// Rebuild a session from its persisted directory, if one exists there.
    /// Falls back to an empty session when nothing is on disk yet.
    pub async fn load_or_new(id: impl Into<String>, dir: impl AsRef<Path>, config: &SessionConfig, now: DateTime<Utc>) -> Result<Self, FacadeError> {
        let id = id.into();
        let layout = Layout { dir: dir.as_ref().to_path_buf() };
        let mut inner = SessionInner::new(config).map_err(|e| FacadeError::Corrupt(e.to_string()))?;

        if layout.graph().exists() {
            match std::fs::read_to_string(layout.graph()) {
                Ok(raw) => match serde_json::from_str::<memory_graph::GraphDump>(&raw) {
                    Ok(dump) => inner.graph = KnowledgeGraph::from_dump(dump),
                    Err(e) => tracing::warn!(session = %id, error = %e, "graph.json corrupt, starting empty"),
                },
                Err(e) => tracing::warn!(session = %id, error = %e, "failed reading graph.json"),
            }
        } else if layout.entities().exists() {
            match EntityStore::load(&layout.entities()) {
                Ok(graph) => inner.graph = graph,
                Err(e) => tracing::warn!(session = %id, error = %e, "entities.json corrupt, starting empty"),
            }
        }

        if let Ok(raw) = std::fs::read_to_string(layout.state()) {
            if let Ok(snapshot) = serde_json::from_str::<std::collections::BTreeMap<String, memory_types::StateEntry>>(&raw) {
                for (key, entry) in snapshot {
                    inner.state_table.put(key, entry.value, entry.updated_at);
                }
            }
        }

        Ok(Self { id, layout, inner: RwLock::new(inner), last_accessed_unix: AtomicI64::new(now.timestamp()), enable_llm_extractor: config.enable_llm_extractor })
    }

    /// If dirty, writes the graph, its JSON mirror, the buffer, and state to
    /// disk, then clears the dirty flag. Safe to call concurrently and
    /// idempotent: a no-op when nothing changed since the last call.
    pub async fn persist(&self, now: DateTime<Utc>) -> Result<(), FacadeError> {
        let mut guard = self.inner.write().await;
        if !guard.dirty {
            return Ok(());
        }
        std::fs::create_dir_all(&self.layout.dir).map_err(|e| FacadeError::PersistFailed(memory_graph::StoreError::Io(e)))?;

        let dump = guard.graph.serialize();
        write_json_atomic(&self.layout.graph(), &dump).map_err(|e| FacadeError::PersistFailed(memory_graph::StoreError::Io(e)))?;

        EntityStore::sync(&guard.graph, &self.layout.entities(), now).map_err(FacadeError::PersistFailed)?;

        let buffered: Vec<_> = guard.turn_buffer.recent(usize::MAX).into_iter().map(|t| (t.user_input.clone(), t.assistant_response.clone())).collect();
        write_json_atomic(&self.layout.buffer(), &buffered).map_err(|e| FacadeError::PersistFailed(memory_graph::StoreError::Io(e)))?;

        write_json_atomic(&self.layout.state(), guard.state_table.snapshot()).map_err(|e| FacadeError::PersistFailed(memory_graph::StoreError::Io(e)))?;

        guard.dirty = false;
        Ok(())
    }
}

/// Clear a session's persisted conversation history without touching its
/// graph/entity mirror. Used by `SessionRegistry::reset` when the caller
/// asks to keep character data: the knowledge graph survives, only the
/// turn-by-turn history is wiped.
pub(crate) fn clear_conversation_history_on_disk(dir: &Path) -> std::io::Result<()> {
    let layout = Layout { dir: dir.to_path_buf() };
    if !layout.dir.exists() {
        return Ok(());
    }
    let empty: Vec<(String, String)> = Vec::new();
    write_json_atomic(&layout.buffer(), &empty)
}

fn write_json_atomic<T: serde::Serialize>(path: &Path, value: &T) -> std::io::Result<()> {
    let tmp = path.with_extension("json.tmp");
    let body = serde_json::to_string_pretty(value).unwrap_or_default();
    std::fs::write(&tmp, body)?;
    std::fs::rename(&tmp, path)
}
