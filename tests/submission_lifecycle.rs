//! Submission Lifecycle Tests
//!
//! - re-posting the same payload is idempotent
//! - states only move forward
//! - terminal records are never rewritten

mod common;

use axum::http::{Method, StatusCode};
use axum::Router;
use serde_json::{json, Value};

use common::{app, get, send};

async fn post(router: &Router, body: Value) -> common::TestResponse {
    send(router, Method::POST, "/submissions", &[], Some(body)).await
}

async fn patch(router: &Router, id: &str, body: Value) -> common::TestResponse {
    send(router, Method::PATCH, &format!("/submissions/{}", id), &[], Some(body)).await
}

fn request() -> Value {
    json!({"formula": "Cr2O3", "task_type": "static", "comment": "hematite check"})
}

fn submission_id(response: &common::TestResponse) -> String {
    response.body["data"][0]["submission_id"]
        .as_str()
        .unwrap()
        .to_string()
}

// =============================================================================
// Idempotence
// =============================================================================

#[tokio::test]
async fn test_repeated_submission_is_idempotent() {
    let (_dir, router) = app();

    let first = post(&router, request()).await;
    assert_eq!(first.status, StatusCode::CREATED);
    let id = submission_id(&first);
    assert_eq!(id.len(), 64);
    assert_eq!(first.body["data"][0]["state"], "submitted");
    assert_eq!(first.body["data"][0]["history"].as_array().unwrap().len(), 1);

    let second = post(&router, request()).await;
    assert_eq!(second.status, StatusCode::OK);
    assert_eq!(submission_id(&second), id);
    assert_eq!(second.body["data"][0]["last_updated"], first.body["data"][0]["last_updated"]);

    // Non-key fields do not change the identity
    let mut variant = request();
    variant["comment"] = json!("another note");
    let third = post(&router, variant).await;
    assert_eq!(third.status, StatusCode::OK);
    assert_eq!(submission_id(&third), id);

    let listing = get(&router, "/submissions").await;
    assert_eq!(listing.body["meta"]["total_doc"], 1);
}

#[tokio::test]
async fn test_distinct_payloads_get_distinct_ids() {
    let (_dir, router) = app();
    let a = post(&router, request()).await;
    let b = post(&router, json!({"formula": "Cr2O3", "task_type": "relax"})).await;
    assert_eq!(b.status, StatusCode::CREATED);
    assert_ne!(submission_id(&a), submission_id(&b));
}

// =============================================================================
// State Machine
// =============================================================================

#[tokio::test]
async fn test_forward_transitions_and_terminal_immutability() {
    let (_dir, router) = app();
    let id = submission_id(&post(&router, request()).await);

    let running = patch(&router, &id, json!({"state": "running"})).await;
    assert_eq!(running.status, StatusCode::OK);
    assert_eq!(running.body["data"][0]["state"], "running");

    let same = patch(&router, &id, json!({"state": "running"})).await;
    assert_eq!(same.status, StatusCode::OK);

    let backward = patch(&router, &id, json!({"state": "pending"})).await;
    assert_eq!(backward.status, StatusCode::CONFLICT);
    assert_eq!(backward.body["code"], 409);

    let complete = patch(&router, &id, json!({"state": "complete"})).await;
    assert_eq!(complete.status, StatusCode::OK);

    let after_terminal = patch(&router, &id, json!({"state": "error"})).await;
    assert_eq!(after_terminal.status, StatusCode::CONFLICT);
    let again = patch(&router, &id, json!({"state": "complete"})).await;
    assert_eq!(again.status, StatusCode::CONFLICT);

    let repost = post(&router, request()).await;
    assert_eq!(repost.status, StatusCode::CONFLICT);

    let stored = get(&router, &format!("/submissions/{}", id)).await;
    assert_eq!(stored.status, StatusCode::OK);
    let doc = &stored.body["data"][0];
    assert_eq!(doc["state"], "complete");
    let history: Vec<&str> = doc["history"]
        .as_array()
        .unwrap()
        .iter()
        .map(|entry| entry["state"].as_str().unwrap())
        .collect();
    assert_eq!(history, vec!["submitted", "running", "complete"]);
}

#[tokio::test]
async fn test_state_filter() {
    let (_dir, router) = app();
    let id = submission_id(&post(&router, request()).await);
    post(&router, json!({"formula": "SiO2", "task_type": "static"})).await;
    patch(&router, &id, json!({"state": "complete"})).await;

    let complete = get(&router, "/submissions?state=complete").await;
    assert_eq!(complete.body["meta"]["total_doc"], 1);
    assert_eq!(complete.body["data"][0]["submission_id"], id.as_str());

    let submitted = get(&router, "/submissions?state=SUBMITTED").await;
    assert_eq!(submitted.body["meta"]["total_doc"], 1);

    let bad = get(&router, "/submissions?state=finished").await;
    assert_eq!(bad.status, StatusCode::BAD_REQUEST);
}

// =============================================================================
// Rejected Writes
// =============================================================================

#[tokio::test]
async fn test_invalid_submissions() {
    let (_dir, router) = app();
    let cases = [
        json!({"formula": "Cr2O3"}),
        json!({"formula": "Cr2O3", "task_type": 7}),
        json!({"formula": "Cr2O3", "task_type": "static", "submission_id": "abc"}),
        json!({"formula": "Cr2O3", "task_type": "static", "history": []}),
        json!({"formula": "Cr2O3", "task_type": "static", "state": "complete"}),
        json!({"formula": "Cr2O3", "task_type": "static", "state": "done"}),
        json!(["not", "an", "object"]),
    ];
    for body in cases {
        let response = post(&router, body.clone()).await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST, "{}", body);
    }

    let listing = get(&router, "/submissions").await;
    assert_eq!(listing.body["meta"]["total_doc"], 0);
}

#[tokio::test]
async fn test_invalid_updates() {
    let (_dir, router) = app();
    let id = submission_id(&post(&router, request()).await);

    let missing = patch(&router, "0000", json!({"state": "running"})).await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);

    let extra = patch(&router, &id, json!({"state": "running", "formula": "SiO2"})).await;
    assert_eq!(extra.status, StatusCode::BAD_REQUEST);

    let no_state = patch(&router, &id, json!({})).await;
    assert_eq!(no_state.status, StatusCode::BAD_REQUEST);

    let unknown = patch(&router, &id, json!({"state": "paused"})).await;
    assert_eq!(unknown.status, StatusCode::BAD_REQUEST);

    let stored = get(&router, &format!("/submissions/{}", id)).await;
    assert_eq!(stored.body["data"][0]["state"], "submitted");
}
