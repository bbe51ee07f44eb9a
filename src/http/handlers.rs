use super::state::AppState;
use crate::error::AgentError;
use crate::pipeline::ndjson_lines;
use crate::request::{FinalizeRequest, QueryRequest, Request};
use crate::session::SessionKey;
use axum::{
    body::{Body, Bytes},
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
};
use chrono::{DateTime, Utc};
use futures::StreamExt;
use serde::Serialize;
use std::collections::BTreeMap;
use std::convert::Infallible;
use tracing::{error, info, warn};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: String,
    pub version: &'static str,
}

#[derive(Debug, Serialize)]
pub struct IndexResponse {
    pub service: String,
    pub version: &'static str,
    pub endpoints: BTreeMap<&'static str, &'static str>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EndSessionResponse {
    pub status: &'static str,
    pub turns: usize,
    pub session_id: String,
}

/// A turn held in session memory, without its audio payload
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingTurn {
    pub turn_number: u32,
    pub query_audio_ref: String,
    pub query_text: String,
    pub answer_text: String,
    pub response_audio_bytes: usize,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn error_response(err: &AgentError) -> Response {
    let status = match err {
        AgentError::MalformedRequest { .. } => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (
        status,
        Json(ErrorResponse {
            error: err.to_string(),
        }),
    )
        .into_response()
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /invoke
/// Dispatch a tagged query or finalize request
pub async fn invoke(State(state): State<AppState>, body: Bytes) -> Response {
    match Request::from_json(&body) {
        Ok(Request::Query(query)) => stream_query(&state, query),
        Ok(Request::Finalize(finalize)) => finalize_session(&state, finalize).await,
        Err(e) => {
            warn!("Rejected invoke request: {}", e);
            error_response(&e)
        }
    }
}

/// POST /end_session
/// Persist a session's accumulated turns
pub async fn end_session(State(state): State<AppState>, body: Bytes) -> Response {
    match FinalizeRequest::from_json(&body) {
        Ok(finalize) => finalize_session(&state, finalize).await,
        Err(e) => {
            warn!("Rejected end_session request: {}", e);
            error_response(&e)
        }
    }
}

/// GET /sessions/:session_id/:lecture_id/pending
/// Turns answered in this session but not yet finalized
pub async fn get_pending_turns(
    State(state): State<AppState>,
    Path((session_id, lecture_id)): Path<(String, String)>,
) -> impl IntoResponse {
    let key = SessionKey::new(session_id, lecture_id);
    let turns: Vec<PendingTurn> = state
        .service
        .memory
        .pending(&key)
        .await
        .into_iter()
        .map(|turn| PendingTurn {
            turn_number: turn.turn_number,
            response_audio_bytes: turn.response_audio.bytes.len(),
            query_audio_ref: turn.query_audio_ref,
            query_text: turn.query_text,
            answer_text: turn.answer_text,
            timestamp: turn.timestamp,
        })
        .collect();

    (StatusCode::OK, Json(turns))
}

/// GET /
/// Service name, version and the routes it serves
pub async fn index(State(state): State<AppState>) -> Json<IndexResponse> {
    let endpoints = BTreeMap::from([
        ("health", "/health"),
        ("invoke", "/invoke (POST)"),
        ("end_session", "/end_session (POST)"),
        ("pending", "/sessions/:session_id/:lecture_id/pending"),
    ]);

    Json(IndexResponse {
        service: state.service.config().service.name.clone(),
        version: env!("CARGO_PKG_VERSION"),
        endpoints,
    })
}

/// GET /health
/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "healthy",
            service: state.service.config().service.name.clone(),
            version: env!("CARGO_PKG_VERSION"),
        }),
    )
}

fn stream_query(state: &AppState, query: QueryRequest) -> Response {
    info!(
        "Streaming query for session {}, lecture {}",
        query.session_id, query.lecture_id
    );

    let events = state.service.orchestrator.execute(query);
    let lines = ndjson_lines(events).map(Ok::<_, Infallible>);

    let mut response = Response::new(Body::from_stream(lines));
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        header::HeaderValue::from_static("application/x-ndjson"),
    );
    response
}

async fn finalize_session(state: &AppState, finalize: FinalizeRequest) -> Response {
    info!("Ending session {}", finalize.session_id);

    match state
        .service
        .finalizer
        .finalize(&finalize.session_key())
        .await
    {
        Ok(summary) => (
            StatusCode::OK,
            Json(EndSessionResponse {
                status: "session_ended",
                turns: summary.turns_persisted,
                session_id: summary.session_id,
            }),
        )
            .into_response(),
        Err(e) => {
            error!("Failed to end session {}: {}", finalize.session_id, e);
            error_response(&e)
        }
    }
}
