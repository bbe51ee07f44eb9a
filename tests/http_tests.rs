// HTTP API tests
//
// Drive the router in-process with `tower::ServiceExt::oneshot`.

mod common;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use common::*;
use lecture_qa::{create_router, AppState, Event, Service, SessionKey};
use serde_json::{json, Value};
use tower::ServiceExt;

fn app(harness: &Harness) -> (Router, Service) {
    let service = Service::new(test_config(), harness.collaborators());
    (create_router(AppState::new(service.clone())), service)
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_text(response: axum::response::Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn query_body(session_id: &str) -> Value {
    json!({
        "type": "query",
        "sessionId": session_id,
        "lectureId": "L1",
        "queryAudioRef": QUERY_KEY,
    })
}

#[tokio::test]
async fn test_health() {
    let harness = Harness::new().await;
    let (router, _) = app(&harness);

    let response = router
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["service"], "lecture-qa");
}

#[tokio::test]
async fn test_root_lists_endpoints() {
    let harness = Harness::new().await;
    let (router, _) = app(&harness);

    let response = router
        .oneshot(Request::get("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(body["service"], "lecture-qa");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    assert_eq!(body["endpoints"]["health"], "/health");
    assert_eq!(body["endpoints"]["invoke"], "/invoke (POST)");
    assert_eq!(body["endpoints"]["end_session"], "/end_session (POST)");
}

#[tokio::test]
async fn test_invoke_query_streams_ndjson() {
    let harness = Harness::new().await;
    let (router, service) = app(&harness);

    let response = router
        .oneshot(post_json("/invoke", query_body("s1")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "application/x-ndjson"
    );

    let text = body_text(response).await;
    let events: Vec<Event> = text
        .lines()
        .map(|line| Event::from_json_line(line).unwrap())
        .collect();

    assert_eq!(events.first(), Some(&Event::QueryText("hello".to_string())));
    assert_eq!(events.last(), Some(&Event::AudioComplete));
    let audio: Vec<u8> = events
        .iter()
        .filter_map(|e| match e {
            Event::AudioChunk { data, .. } => Some(data.clone()),
            _ => None,
        })
        .flatten()
        .collect();
    assert_eq!(audio, audio_bytes(10_000));

    assert_eq!(service.memory.pending(&SessionKey::new("s1", "L1")).await.len(), 1);
}

#[tokio::test]
async fn test_invoke_accepts_legacy_audio_key_field() {
    let harness = Harness::new().await;
    let (router, _) = app(&harness);

    let body = json!({
        "type": "query",
        "sessionId": "s1",
        "lectureId": "L1",
        "s3Key": QUERY_KEY,
        "connectionId": "conn-42",
    });
    let response = router.oneshot(post_json("/invoke", body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("audio_complete"));
}

#[tokio::test]
async fn test_invoke_missing_audio_streams_error_event() {
    let harness = Harness::new().await;
    let (router, _) = app(&harness);

    let body = json!({
        "type": "query",
        "sessionId": "s1",
        "lectureId": "L1",
        "queryAudioRef": "queries/s1/nope.webm",
    });
    let response = router.oneshot(post_json("/invoke", body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let text = body_text(response).await;
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 1);
    assert_eq!(
        Event::from_json_line(lines[0]).unwrap(),
        Event::Error("object not found".to_string())
    );
}

#[tokio::test]
async fn test_invoke_rejects_malformed_requests() {
    let harness = Harness::new().await;

    let cases = [
        json!({"type": "query", "sessionId": "s1", "lectureId": "L1"}),
        json!({"type": "translate", "sessionId": "s1", "lectureId": "L1"}),
        json!({"type": "query", "sessionId": "", "lectureId": "L1", "queryAudioRef": QUERY_KEY}),
        json!({"type": "finalize", "sessionId": "../etc", "lectureId": "L1"}),
        json!({"type": "finalize", "sessionId": "s1", "lectureId": "L1", "extra": true}),
    ];

    for body in cases {
        let (router, _) = app(&harness);
        let response = router.oneshot(post_json("/invoke", body.clone())).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "body: {body}");
        let error: Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert!(error["error"]
            .as_str()
            .unwrap()
            .starts_with("malformed request"));
    }

    assert_eq!(harness.transcriber.calls.load(std::sync::atomic::Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_invoke_rejects_non_json_body() {
    let harness = Harness::new().await;
    let (router, _) = app(&harness);

    let request = Request::builder()
        .method("POST")
        .uri("/invoke")
        .body(Body::from("not json"))
        .unwrap();
    let response = router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_finalize_via_invoke_and_end_session() {
    let harness = Harness::new().await;
    let (router, service) = app(&harness);

    collect(service.orchestrator.execute(query("s1", "L1", QUERY_KEY))).await;
    collect(service.orchestrator.execute(query("s1", "L1", QUERY_KEY))).await;

    let response = router
        .clone()
        .oneshot(post_json(
            "/invoke",
            json!({"type": "finalize", "sessionId": "s1", "lectureId": "L1"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(body, json!({"status": "session_ended", "turns": 2, "sessionId": "s1"}));

    let response = router
        .oneshot(post_json(
            "/end_session",
            json!({"sessionId": "s1", "lectureId": "L1"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(body["turns"], 0);
}

#[tokio::test]
async fn test_finalize_failure_maps_to_server_error() {
    let harness = Harness::new().await;
    let mut collaborators = harness.collaborators();
    collaborators.sessions = std::sync::Arc::new(BrokenSessionStore);
    let router = create_router(AppState::new(Service::new(test_config(), collaborators)));

    let response = router
        .oneshot(post_json(
            "/end_session",
            json!({"sessionId": "s1", "lectureId": "L1"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert!(body["error"]
        .as_str()
        .unwrap()
        .starts_with("persistence failure"));
}

#[tokio::test]
async fn test_pending_turns_endpoint() {
    let harness = Harness::new().await;
    let (router, service) = app(&harness);

    collect(service.orchestrator.execute(query("s1", "L1", QUERY_KEY))).await;

    let response = router
        .oneshot(
            Request::get("/sessions/s1/L1/pending")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = serde_json::from_str(&body_text(response).await).unwrap();
    let turns = body.as_array().unwrap();
    assert_eq!(turns.len(), 1);
    assert_eq!(turns[0]["turnNumber"], 1);
    assert_eq!(turns[0]["queryText"], "hello");
    assert_eq!(turns[0]["answerText"], "hi there");
    assert_eq!(turns[0]["responseAudioBytes"], 10_000);
}
