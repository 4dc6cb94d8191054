//! End-to-end tests for the stabilization HTTP API.
//!
//! Tests exercise the full stack: HTTP request -> axum router -> handler ->
//! StabilizationService -> core graph -> in-memory store -> HTTP response.
//! Requests go through `tower::ServiceExt::oneshot`, no sockets.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::json;
use tempfile::TempDir;
use tower::ServiceExt;

use stabilizer_core::{codec, Atom};
use stabilizer_server::router::build_router;
use stabilizer_server::state::AppState;

// ---------------------------------------------------------------------------
// Test helpers
// ---------------------------------------------------------------------------

/// Creates a fresh router; the temp dir receives submitted logs.
fn test_app() -> (Router, TempDir) {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let state = AppState::in_memory(dir.path()).expect("failed to create in-memory AppState");
    (build_router(state), dir)
}

/// Wire encoding of an atom.
fn enc(atom: &str) -> String {
    codec::encode_atom(&Atom::new(atom).unwrap())
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, String) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

/// Sends a GET request and returns (status, text body).
async fn get_text(app: &Router, path: &str) -> (StatusCode, String) {
    send(app, Request::builder().uri(path).body(Body::empty()).unwrap()).await
}

/// Sends a GET request and returns (status, json).
async fn get_json(app: &Router, path: &str) -> (StatusCode, serde_json::Value) {
    let (status, body) = get_text(app, path).await;
    (status, serde_json::from_str(&body).unwrap_or(json!(null)))
}

/// Sends a urlencoded form POST and returns (status, text body).
async fn post_form(app: &Router, path: &str, fields: &[(&str, &str)]) -> (StatusCode, String) {
    let body = fields
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");
    send(
        app,
        Request::builder()
            .method("POST")
            .uri(path)
            .header("content-type", "application/x-www-form-urlencoded")
            .body(Body::from(body))
            .unwrap(),
    )
    .await
}

async fn sched_dep(app: &Router, parent: &str, child: &str) -> String {
    let path = format!("/sched-dep?parent={}&dependency={}", enc(parent), enc(child));
    let (status, body) = get_text(app, &path).await;
    assert_eq!(status, StatusCode::OK);
    body
}

async fn vote(app: &Router, route: &str, atom: &str, id: &str) {
    let path = format!("/{route}?package={}&id={id}", enc(atom));
    let (status, body) = get_text(app, &path).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "1");
}

async fn request_package(app: &Router) -> String {
    let (status, body) = get_text(app, "/request-package").await;
    assert_eq!(status, StatusCode::OK);
    body
}

// ---------------------------------------------------------------------------
// Graph construction
// ---------------------------------------------------------------------------

#[tokio::test]
async fn chain_scenario() {
    let (app, _dir) = test_app();

    assert_eq!(sched_dep(&app, "a/b-1", "a/c-1").await, "1");
    assert_eq!(sched_dep(&app, "a/b-1", "a/c-1").await, "1");

    let (_, status) = get_json(&app, "/status").await;
    assert_eq!(status["packages"], 2);
    assert_eq!(status["dependencies"], 1);

    assert_eq!(request_package(&app).await, "a/c-1");

    vote(&app, "mark-stable", "a/c-1", "w1").await;
    assert_eq!(request_package(&app).await, "a/c-1");
    vote(&app, "mark-stable", "a/c-1", "w2").await;

    for _ in 0..5 {
        assert_eq!(request_package(&app).await, "a/b-1");
    }
    assert_eq!(sched_dep(&app, "a/b-1", "a/c-1").await, "0");
}

#[tokio::test]
async fn cycle_is_broken_with_sentinel() {
    let (app, _dir) = test_app();

    assert_eq!(sched_dep(&app, "x/p-1", "x/q-1").await, "1");
    assert_eq!(sched_dep(&app, "x/q-1", "x/p-1").await, "2");

    let (_, status) = get_json(&app, "/status").await;
    assert_eq!(status["packages"], 2);
    assert_eq!(status["sentinels"], 1);

    // q only depends on a sentinel, so it is the leaf.
    assert_eq!(request_package(&app).await, "x/q-1");
}

#[tokio::test]
async fn undecodable_atoms_answer_minus_one() {
    let (app, _dir) = test_app();

    for path in [
        "/sched-dep?parent=!!!&dependency=YS9iLTE",
        "/sched-dep?parent=YS9iLTE",
        "/sched-dep",
        "/mark-stable?package=%25%25",
        "/mark-blocked",
        "/add-package?package=_w",
        "/add-combo?flags=ssl",
        "/prioritize?package=YS9iLTE&ticket=abc",
    ] {
        let (status, body) = get_text(&app, path).await;
        assert_eq!(status, StatusCode::OK, "{path}");
        assert_eq!(body, "-1", "{path}");
    }

    let (_, status) = get_json(&app, "/status").await;
    assert_eq!(status["packages"], 0);
    assert_eq!(status["pending_correlations"], 0);
}

#[tokio::test]
async fn add_package_is_get_or_create() {
    let (app, _dir) = test_app();
    for _ in 0..2 {
        let (_, body) = get_text(&app, &format!("/add-package?package={}", enc("n/new-1"))).await;
        assert_eq!(body, "1");
    }
    let (_, status) = get_json(&app, "/status").await;
    assert_eq!(status["packages"], 1);
    assert_eq!(status["unstable"], 1);
}

// ---------------------------------------------------------------------------
// Votes
// ---------------------------------------------------------------------------

#[tokio::test]
async fn blocked_after_five_unstable_votes() {
    let (app, _dir) = test_app();
    get_text(&app, &format!("/add-package?package={}", enc("v/bad-1"))).await;

    for i in 0..4 {
        vote(&app, "mark-blocked", "v/bad-1", &format!("job{i}")).await;
    }
    let (_, status) = get_json(&app, "/status").await;
    assert_eq!(status["blocked"], 0);
    assert_eq!(status["pending_correlations"], 4);

    vote(&app, "mark-blocked", "v/bad-1", "job4").await;
    let (_, status) = get_json(&app, "/status").await;
    assert_eq!(status["blocked"], 1);
    assert_eq!(request_package(&app).await, "None");
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

#[tokio::test]
async fn empty_graph_has_no_work() {
    let (app, _dir) = test_app();
    assert_eq!(request_package(&app).await, "None");
}

#[tokio::test]
async fn combination_policy_returns_flags() {
    let (app, _dir) = test_app();
    let path = format!("/add-combo?package={}&flags=ssl%20-gtk", enc("u/x-1"));
    let (_, body) = get_text(&app, &path).await;
    assert_eq!(body, "1");

    let (_, body) = get_text(&app, "/request-package?policy=combination").await;
    assert_eq!(body, "u/x-1 -gtk ssl");
    let (_, body) = get_text(&app, "/request-package?policy=plain").await;
    assert_eq!(body, "None");
    assert_eq!(request_package(&app).await, "None");
}

#[tokio::test]
async fn unknown_policy_is_rejected() {
    let (app, _dir) = test_app();
    let (status, body) = get_json(&app, "/request-package?policy=random").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn priority_preempts_until_result_arrives() {
    let (app, dir) = test_app();
    get_text(&app, &format!("/add-package?package={}", enc("p/leaf-1"))).await;

    for (atom, ticket) in [("p/urgent-1", "77"), ("p/other-1", "78")] {
        let path = format!("/prioritize?package={}&ticket={ticket}", enc(atom));
        assert_eq!(get_text(&app, &path).await.1, "1");
    }

    let served: Vec<String> = {
        let mut served = Vec::new();
        for _ in 0..4 {
            served.push(request_package(&app).await);
        }
        served
    };
    assert_eq!(served, vec!["p/urgent-1", "p/other-1", "p/urgent-1", "p/other-1"]);

    vote(&app, "mark-stable", "p/urgent-1", "job-42").await;
    let log = codec::encode_atom(&Atom::new("emerge-finished-ok").unwrap());
    let (status, body) = post_form(
        &app,
        "/submit-log",
        &[("id", "job-42"), ("log", &log), ("filename", "urgent.log")],
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "1");
    assert_eq!(
        std::fs::read_to_string(dir.path().join("urgent.log")).unwrap(),
        "emerge-finished-ok"
    );

    for _ in 0..3 {
        assert_eq!(request_package(&app).await, "p/other-1");
    }
    let (_, status) = get_json(&app, "/status").await;
    assert_eq!(status["priority"], 1);
    assert_eq!(status["pending_correlations"], 0);
}

// ---------------------------------------------------------------------------
// Log submission
// ---------------------------------------------------------------------------

#[tokio::test]
async fn log_without_correlation_is_archived() {
    let (app, dir) = test_app();
    let (status, body) = post_form(
        &app,
        "/submit-log",
        &[("id", "unknown"), ("log", "aGVsbG8"), ("filename", "orphan.log")],
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "1");
    assert_eq!(std::fs::read(dir.path().join("orphan.log")).unwrap(), b"hello");
}

#[tokio::test]
async fn malformed_log_answers_minus_one() {
    let (app, dir) = test_app();
    let (status, body) = post_form(
        &app,
        "/submit-log",
        &[("id", "x"), ("log", "%21%21%21"), ("filename", "bad.log")],
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "-1");
    assert!(!dir.path().join("bad.log").exists());
}

#[tokio::test]
async fn escaping_filename_is_rejected() {
    let (app, _dir) = test_app();
    let (status, body) = post_form(
        &app,
        "/submit-log",
        &[("id", "x"), ("log", "aGVsbG8"), ("filename", "..%2Fescape.log")],
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let body: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
}
