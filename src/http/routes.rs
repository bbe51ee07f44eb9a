use super::handlers;
use super::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Service index
        .route("/", get(handlers::index))
        // Health check
        .route("/health", get(handlers::health_check))
        // Query / finalize dispatch
        .route("/invoke", post(handlers::invoke))
        .route("/end_session", post(handlers::end_session))
        // Session inspection
        .route(
            "/sessions/:session_id/:lecture_id/pending",
            get(handlers::get_pending_turns),
        )
        // Add tracing middleware for request logging
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
