//! Per-session lifecycle: create, fetch, reset, destroy. Owns the session
//! map exclusively; nothing else constructs a [`Session`] directly.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::config::{EvictionPolicy, SessionConfig};
use crate::error::RegistryError;
use crate::session::Session;

/// Owns the session map under its own lock. Lock ordering: registry, then
/// session — never acquire a session lock while holding the registry's.
pub struct SessionRegistry {
    root: PathBuf,
    config: SessionConfig,
    eviction: EvictionPolicy,
    max_sessions: Option<usize>,
    sessions: RwLock<HashMap<String, Arc<Session>>>,
}

impl SessionRegistry {
    /// Construct a registry rooted at `root`, where each session gets its
    /// own subdirectory.
    pub fn new(root: impl Into<PathBuf>, config: SessionConfig, eviction: EvictionPolicy, max_sessions: Option<usize>) -> Self {
        Self { root: root.into(), config, eviction, max_sessions, sessions: RwLock::new(HashMap::new()) }
    }

    /// Number of live sessions, for `/health` and `/sessions`.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Ids of every live session.
    pub async fn list_ids(&self) -> Vec<String> {
        self.sessions.read().await.keys().cloned().collect()
    }

    /// Fetch a session, creating and loading it from disk on first use.
    ///
    /// `config_override` and `is_test` only take effect on first creation —
    /// an already-live session keeps whatever it was created with, matching
    /// the original's "reuse the existing engine for this session id"
    /// behavior when `session_config`/`is_test` are resent on a later call.
    pub async fn get_or_create(&self, id: &str, now: DateTime<Utc>, config_override: Option<&SessionConfig>, is_test: bool) -> Result<Arc<Session>, RegistryError> {
        if let Some(session) = self.sessions.read().await.get(id) {
            session.touch(now);
            return Ok(session.clone());
        }

        let dir = self.session_dir(id, is_test);
        let config = config_override.unwrap_or(&self.config);
        let session = Session::load_or_new(id, &dir, config, now)
            .await
            .map_err(|e| RegistryError::NotFound(format!("{id}: {e}")))?;
        let session = Arc::new(session);

        let mut guard = self.sessions.write().await;
        let session = guard.entry(id.to_string()).or_insert_with(|| session).clone();
        self.evict_if_needed(&mut guard);
        Ok(session)
    }

    /// Explicitly create a session, failing if one already exists.
    pub async fn create(&self, id: &str, now: DateTime<Utc>, config_override: Option<SessionConfig>, is_test: bool) -> Result<Arc<Session>, RegistryError> {
        if self.sessions.read().await.contains_key(id) {
            return Err(RegistryError::AlreadyExists(id.to_string()));
        }
        self.get_or_create(id, now, config_override.as_ref(), is_test).await
    }

    fn session_dir(&self, id: &str, is_test: bool) -> PathBuf {
        if is_test {
            self.root.join("test").join(id)
        } else {
            self.root.join(id)
        }
    }

    /// Fetch a live session without creating one.
    pub async fn get(&self, id: &str) -> Result<Arc<Session>, RegistryError> {
        self.get_at(id, Utc::now()).await
    }

    /// Fetch a live session without creating one, touching its LRU clock
    /// with a caller-supplied timestamp.
    pub async fn get_at(&self, id: &str, now: DateTime<Utc>) -> Result<Arc<Session>, RegistryError> {
        let session = self.sessions.read().await.get(id).cloned().ok_or_else(|| RegistryError::NotFound(id.to_string()))?;
        session.touch(now);
        Ok(session)
    }

    /// Reset a session: drop it from the map. When `keep_on_disk` is true,
    /// the graph/entity mirror survive and only the conversation history is
    /// cleared, so the next `get_or_create` reloads the same knowledge graph
    /// with an empty turn history; when false, every on-disk file is
    /// removed along with the live session.
    pub async fn reset(&self, id: &str, keep_on_disk: bool) -> Result<(), RegistryError> {
        let mut guard = self.sessions.write().await;
        let Some(session) = guard.remove(id) else {
            return Err(RegistryError::NotFound(id.to_string()));
        };
        let dir = session.dir().to_path_buf();
        if keep_on_disk {
            if let Err(e) = crate::session::clear_conversation_history_on_disk(&dir) {
                tracing::warn!(session = %id, error = %e, "failed clearing conversation history on reset");
            }
        } else {
            let _ = std::fs::remove_dir_all(dir);
        }
        Ok(())
    }

    /// Destroy a session and its on-disk state unconditionally.
    pub async fn destroy(&self, id: &str) -> Result<(), RegistryError> {
        self.reset(id, false).await
    }

    fn evict_if_needed(&self, guard: &mut HashMap<String, Arc<Session>>) {
        let Some(max) = self.max_sessions else { return };
        if self.eviction != EvictionPolicy::Lru || guard.len() <= max {
            return;
        }
        if let Some(victim) = guard.values().min_by_key(|s| s.last_accessed()).map(|s| s.id().to_string()) {
            guard.remove(&victim);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z").unwrap().with_timezone(&Utc)
    }

    #[tokio::test]
    async fn reset_keeping_on_disk_clears_history_but_not_the_graph() {
        let dir = tempfile::tempdir().unwrap();
        let registry = SessionRegistry::new(dir.path(), SessionConfig::default(), EvictionPolicy::None, None);
        let session = registry.create("s1", now(), None, false).await.unwrap();

        let mut attrs = memory_types::AttrMap::new();
        attrs.insert("name".into(), memory_types::AttrValue::Text("Aldric".into()));
        session.apply(memory_types::UpdatePlan { nodes_to_upsert: vec![memory_types::NodeUpsert { id: "aldric".into(), kind: memory_types::EntityKind::Character, name: None, attributes: attrs }], ..Default::default() }, now()).await;
        session.record_turn("hello", "hi there").await;
        session.persist(now()).await.unwrap();

        registry.reset("s1", true).await.unwrap();

        let reloaded = registry.get_or_create("s1", now(), None, false).await.unwrap();
        let (nodes, _edges) = reloaded.graph_stats().await;
        assert_eq!(nodes, 1);
        assert_eq!(reloaded.buffer_len().await, 0);
    }

    #[tokio::test]
    async fn reset_without_keep_on_disk_removes_everything() {
        let dir = tempfile::tempdir().unwrap();
        let registry = SessionRegistry::new(dir.path(), SessionConfig::default(), EvictionPolicy::None, None);
        let session = registry.create("s2", now(), None, false).await.unwrap();
        session.record_turn("hello", "hi").await;
        session.persist(now()).await.unwrap();

        registry.reset("s2", false).await.unwrap();

        let reloaded = registry.get_or_create("s2", now(), None, false).await.unwrap();
        assert_eq!(reloaded.buffer_len().await, 0);
        let (nodes, _edges) = reloaded.graph_stats().await;
        assert_eq!(nodes, 0);
    }

    #[tokio::test]
    async fn create_honors_a_per_session_config_override() {
        let dir = tempfile::tempdir().unwrap();
        let registry = SessionRegistry::new(dir.path(), SessionConfig::default(), EvictionPolicy::None, None);
        let override_config = SessionConfig { window_size: 10, processing_delay: 2, enable_llm_extractor: true, ..SessionConfig::default() };
        let session = registry.create("s3", now(), Some(override_config), false).await.unwrap();
        assert!(session.enable_llm_extractor());
        assert_eq!(session.window_info().await.window_size, 10);
    }

    #[tokio::test]
    async fn is_test_sessions_are_rooted_under_a_separate_directory() {
        let dir = tempfile::tempdir().unwrap();
        let registry = SessionRegistry::new(dir.path(), SessionConfig::default(), EvictionPolicy::None, None);
        let session = registry.create("s4", now(), None, true).await.unwrap();
        assert!(session.dir().starts_with(dir.path().join("test")));
    }
}
