//! One function per HTTP endpoint. Each translates a [`dto`] request into
//! calls against a [`Session`] or the [`SessionRegistry`], then translates
//! the result back into a [`dto`] response.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use memory_core::{ExternalTurnRecord, MemoryError};
use memory_extract::Extractor;

use crate::dto::*;
use crate::http_error::ApiError;
use crate::state::AppState;

/// `POST /initialize`
pub async fn initialize(State(state): State<Arc<AppState>>, Json(req): Json<InitializeRequest>) -> Result<Json<InitializeResponse>, ApiError> {
    let now = Utc::now();
    let id = req.session_id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    let mut config = req.session_config.as_ref().map(|o| o.resolve(&state.config.session)).unwrap_or_else(|| state.config.session.clone());
    config.enable_llm_extractor = req.enable_agent && state.config.session.enable_llm_extractor;

    let session = state.registry.create(&id, now, Some(config), req.is_test).await.map_err(MemoryError::from)?;

    let seed_graph = empty_graph();
    for (user_text, assistant_text) in [("character", req.character_card.as_str()), ("world", req.world_info.as_str())] {
        if assistant_text.trim().is_empty() {
            continue;
        }
        let plan = if session.enable_llm_extractor() {
            state.extractor.analyze(user_text, assistant_text, &seed_graph, "").await
        } else {
            state.rule_extractor.analyze(user_text, assistant_text, &seed_graph, "").await
        };
        session.apply(plan, now).await;
    }
    session.persist(now).await.map_err(MemoryError::from)?;

    let (graph_nodes, graph_edges) = session.graph_stats().await;
    Ok(Json(InitializeResponse {
        session_id: id,
        message: "session initialized".into(),
        graph_stats: GraphStats { graph_nodes, graph_edges },
    }))
}

/// `POST /enhance_prompt`
pub async fn enhance_prompt(State(state): State<Arc<AppState>>, Json(req): Json<EnhancePromptRequest>) -> Result<Json<EnhancePromptResponse>, ApiError> {
    let now = Utc::now();
    let session = state.registry.get_at(&req.session_id, now).await.map_err(MemoryError::from)?;
    let result = session.retrieve_context(&req.user_input, req.recent_history, state.config.session.context_default_depth, req.max_context_length).await;
    Ok(Json(EnhancePromptResponse { enhanced_context: result.text, entities_found: result.matched_entity_ids, context_stats: result.stats }))
}

/// `POST /update_memory`: the synchronous, un-windowed commit path.
pub async fn update_memory(State(state): State<Arc<AppState>>, Json(req): Json<ConversationTurnRequest>) -> Result<Json<UpdateMemoryResponse>, ApiError> {
    let now = Utc::now();
    let session = state.registry.get_at(&req.session_id, now).await.map_err(MemoryError::from)?;

    let graph_dump = session.export_graph().await;
    let graph_view = memory_graph::KnowledgeGraph::from_dump(graph_dump);
    let plan = if session.enable_llm_extractor() {
        state.extractor.analyze(&req.user_input, &req.llm_response, &graph_view, "").await
    } else {
        state.rule_extractor.analyze(&req.user_input, &req.llm_response, &graph_view, "").await
    };
    let (validated, warnings) = state.validator.validate(plan, &graph_view);

    let counts = session.apply(validated, now).await;
    session.record_turn(&req.user_input, &req.llm_response).await;
    session.persist(now).await.map_err(MemoryError::from)?;

    Ok(Json(UpdateMemoryResponse {
        message: "memory updated".into(),
        nodes_updated: counts.nodes_upserted,
        edges_added: counts.edges_added,
        processing_stats: warnings,
    }))
}

/// `POST /process_conversation`: the windowed, delayed-commit path.
pub async fn process_conversation(State(state): State<Arc<AppState>>, Json(req): Json<ConversationTurnRequest>) -> Result<Json<ProcessConversationResponse>, ApiError> {
    let now = Utc::now();
    let session = state.registry.get_at(&req.session_id, now).await.map_err(MemoryError::from)?;

    let outcome = if session.enable_llm_extractor() {
        session.on_new_turn(&state.delayed_update, &state.extractor, &state.validator, &req.user_input, &req.llm_response, now).await
    } else {
        session.on_new_turn(&state.delayed_update, &state.rule_extractor, &state.validator, &req.user_input, &req.llm_response, now).await
    };
    session.persist(now).await.map_err(MemoryError::from)?;
    let window = session.window_info().await;

    Ok(Json(ProcessConversationResponse {
        turn_sequence: outcome.sequence,
        turn_processed: outcome.target_turn_id.is_some(),
        target_processed: outcome.target_processed.unwrap_or(false),
        window_size: window.window_size,
        nodes_updated: outcome.counts.nodes_upserted,
        edges_added: outcome.counts.edges_added,
        processing_stats: outcome.warnings,
    }))
}

/// `POST /sync_conversation`
pub async fn sync_conversation(State(state): State<Arc<AppState>>, Json(req): Json<SyncConversationRequest>) -> Result<Json<SyncConversationResponse>, ApiError> {
    let now = Utc::now();
    let session = state.registry.get_at(&req.session_id, now).await.map_err(MemoryError::from)?;

    let external: Vec<ExternalTurnRecord> = req
        .tavern_history
        .into_iter()
        .map(|t| ExternalTurnRecord { id: t.id, sequence: t.sequence, user: t.user, assistant: t.assistant, timestamp: t.timestamp })
        .collect();

    let report = session.sync_external(&state.conflict_resolver, &external, now).await;
    session.persist(now).await.map_err(MemoryError::from)?;

    Ok(Json(SyncConversationResponse {
        conflicts_detected: report.conflicts_detected,
        conflicts_resolved: report.conflicts_resolved,
        window_synced: report.synced,
    }))
}

/// `GET /sessions/{id}/stats`
pub async fn session_stats(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Result<Json<SessionStatsResponse>, ApiError> {
    let session = state.registry.get(&id).await.map_err(MemoryError::from)?;
    let (graph_nodes, graph_edges) = session.graph_stats().await;
    Ok(Json(SessionStatsResponse {
        session_id: id,
        graph: GraphStats { graph_nodes, graph_edges },
        window: session.window_info().await,
        buffer_len: session.buffer_len().await,
    }))
}

/// `POST /sessions/{id}/reset`
pub async fn reset_session(State(state): State<Arc<AppState>>, Path(id): Path<String>, Json(req): Json<ResetRequest>) -> Result<Response, ApiError> {
    state.registry.reset(&id, req.keep_character_data).await.map_err(MemoryError::from)?;
    Ok(axum::http::StatusCode::NO_CONTENT.into_response())
}

/// `GET /sessions`
pub async fn list_sessions(State(state): State<Arc<AppState>>) -> Json<ListSessionsResponse> {
    Json(ListSessionsResponse { sessions: state.registry.list_ids().await })
}

/// `GET /health`
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let active_sessions = state.registry.len().await;
    Json(HealthResponse { ok: true, active_sessions })
}

/// `GET /sessions/{id}/export`
pub async fn export_session(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Result<Json<ExportResponse>, ApiError> {
    let session = state.registry.get(&id).await.map_err(MemoryError::from)?;
    Ok(Json(ExportResponse { session_id: id, graph: session.export_graph().await }))
}

fn empty_graph() -> memory_graph::KnowledgeGraph {
    memory_graph::KnowledgeGraph::new()
}
