//! HTTP API for the query pipeline
//!
//! - GET / - Service name, version and endpoint index
//! - POST /invoke - Tagged request: `query` streams NDJSON events, `finalize` ends a session
//! - POST /end_session - Finalize a session
//! - GET /sessions/:session_id/:lecture_id/pending - Turns not yet persisted
//! - GET /health - Health check

mod handlers;
mod routes;
mod shutdown;
mod state;

pub use routes::create_router;
pub use shutdown::shutdown_signal;
pub use state::AppState;
