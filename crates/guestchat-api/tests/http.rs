use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use chrono::{Duration, TimeZone, Utc};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use guestchat_api::clock::ManualClock;
use guestchat_api::{AppState, router};
use guestchat_db::Database;

fn app() -> (Router, Arc<ManualClock>) {
    let db = Arc::new(Database::open_in_memory().unwrap());
    let clock = Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap()));
    (router(AppState::with_clock(db, clock.clone())), clock)
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut req = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(v) => {
            req = req.header(header::CONTENT_TYPE, "application/json");
            Body::from(v.to_string())
        }
        None => Body::empty(),
    };

    let resp = app.clone().oneshot(req.body(body).unwrap()).await.unwrap();
    let status = resp.status();
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

#[tokio::test]
async fn register_returns_201_then_200_with_same_name() {
    let (app, _) = app();

    let (status, first) = send(&app, "POST", "/api/users/register/", Some(json!({ "session_id": "s1" }))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(first["session_id"], "s1");
    assert!(first["username"].as_str().unwrap().starts_with("Гость-"));

    let (status, second) = send(&app, "POST", "/api/users/register/", Some(json!({ "session_id": "s1" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second, first);
}

#[tokio::test]
async fn register_without_session_is_a_validation_error() {
    let (app, _) = app();

    let (status, body) = send(&app, "POST", "/api/users/register/", Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");
    assert_eq!(body["field"], "session_id");
}

#[tokio::test]
async fn malformed_json_is_a_validation_error() {
    let (app, _) = app();

    let req = Request::builder()
        .method("POST")
        .uri("/api/users/heartbeat/")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn heartbeat_reports_created_then_success() {
    let (app, _) = app();
    let body = json!({ "session_id": "s1", "username": "Alice" });

    let (status, resp) = send(&app, "POST", "/api/users/heartbeat/", Some(body.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(resp, json!({ "status": "created" }));

    let (status, resp) = send(&app, "POST", "/api/users/heartbeat/", Some(body)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(resp, json!({ "status": "success" }));
}

#[tokio::test]
async fn heartbeat_requires_username() {
    let (app, _) = app();

    let (status, body) = send(&app, "POST", "/api/users/heartbeat/", Some(json!({ "session_id": "s1" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["field"], "username");
}

#[tokio::test]
async fn online_count_drops_sessions_past_the_window() {
    let (app, clock) = app();

    send(&app, "POST", "/api/users/register/", Some(json!({ "session_id": "s1" }))).await;
    send(&app, "POST", "/api/users/heartbeat/", Some(json!({ "session_id": "s2", "username": "Bob" }))).await;

    let (status, body) = send(&app, "GET", "/api/users/online/", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "online_count": 2 }));

    clock.advance(Duration::minutes(3));
    send(&app, "POST", "/api/users/heartbeat/", Some(json!({ "session_id": "s2", "username": "Bob" }))).await;
    clock.advance(Duration::minutes(2) + Duration::seconds(1));

    let (_, body) = send(&app, "GET", "/api/users/online/", None).await;
    assert_eq!(body, json!({ "online_count": 1 }));
}

#[tokio::test]
async fn post_and_list_messages() {
    let (app, clock) = app();

    let (status, created) = send(
        &app,
        "POST",
        "/api/messages/",
        Some(json!({ "username": "A", "message_text": "hi" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["username"], "A");
    assert_eq!(created["message_text"], "hi");
    assert!(created["id"].is_i64());
    assert!(created["timestamp"].is_string());

    clock.advance(Duration::seconds(1));
    send(&app, "POST", "/api/messages/", Some(json!({ "username": "B", "message_text": "yo" }))).await;

    let (status, list) = send(&app, "GET", "/api/messages/", None).await;
    assert_eq!(status, StatusCode::OK);
    let pairs: Vec<(String, String)> = list
        .as_array()
        .unwrap()
        .iter()
        .map(|m| {
            (
                m["username"].as_str().unwrap().to_string(),
                m["message_text"].as_str().unwrap().to_string(),
            )
        })
        .collect();
    assert_eq!(
        pairs,
        vec![("A".to_string(), "hi".to_string()), ("B".to_string(), "yo".to_string())]
    );
    assert_eq!(list[0], created);
}

#[tokio::test]
async fn blank_or_oversized_messages_are_rejected() {
    let (app, _) = app();

    let too_long = "x".repeat(1001);
    for text in ["", "   ", too_long.as_str()] {
        let (status, body) = send(
            &app,
            "POST",
            "/api/messages/",
            Some(json!({ "username": "A", "message_text": text })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "accepted {:?}", text);
        assert_eq!(body["field"], "message_text");
    }

    let (_, list) = send(&app, "GET", "/api/messages/", None).await;
    assert_eq!(list, json!([]));
}

#[tokio::test]
async fn health_is_ok() {
    let (app, _) = app();
    let (status, body) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}
