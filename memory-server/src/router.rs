//! Route table: one path per endpoint, all sharing one [`AppState`].

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;

use crate::handlers;
use crate::state::AppState;

/// Build the full application router.
pub fn build(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/sessions", get(handlers::list_sessions))
        .route("/initialize", post(handlers::initialize))
        .route("/enhance_prompt", post(handlers::enhance_prompt))
        .route("/update_memory", post(handlers::update_memory))
        .route("/process_conversation", post(handlers::process_conversation))
        .route("/sync_conversation", post(handlers::sync_conversation))
        .route("/sessions/{id}/stats", get(handlers::session_stats))
        .route("/sessions/{id}/reset", post(handlers::reset_session))
        .route("/sessions/{id}/export", get(handlers::export_session))
        .with_state(state)
}
