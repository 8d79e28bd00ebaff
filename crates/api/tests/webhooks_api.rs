//! Integration tests for provider callbacks over HTTP.

mod common;

use axum::body::Body;
use axum::http::header::CONTENT_TYPE;
use axum::http::{Method, Request, StatusCode};
use common::{body_json, token, TestApp};
use serde_json::json;

async fn processing_separation(app: &TestApp, user: &str) -> i64 {
    let session = token(user);
    let asset_id = app.upload(&session).await;
    let response = app
        .post_json(
            "/api/v1/jobs/separate",
            Some(&session),
            json!({"name": "Split", "asset_id": asset_id}),
        )
        .await;
    body_json(response).await["data"]["job_id"].as_i64().unwrap()
}

#[tokio::test]
async fn unsigned_callback_is_rejected() {
    let app = TestApp::new();
    let job_id = processing_separation(&app, "alice").await;

    let request = Request::builder()
        .method(Method::POST)
        .uri(format!(
            "/api/v1/webhooks/replicate/separation?jobId={job_id}&userId=alice"
        ))
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"status":"succeeded","output":{}}"#))
        .unwrap();
    let response = app.send(request).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["code"], "UNAUTHENTICATED");

    let view = body_json(
        app.get(&format!("/api/v1/jobs/{job_id}"), Some(&token("alice")))
            .await,
    )
    .await;
    assert_eq!(view["data"]["status"], "processing");
}

#[tokio::test]
async fn callback_without_metadata_is_400() {
    let app = TestApp::new();

    let response = app
        .post_webhook(
            "/api/v1/webhooks/replicate/separation?userId=alice",
            json!({"status": "succeeded"}),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .post_webhook(
            "/api/v1/webhooks/replicate/remix?jobId=1&userId=alice",
            json!({"status": "succeeded"}),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn succeeded_callback_completes_the_job() {
    let app = TestApp::new();
    let job_id = processing_separation(&app, "alice").await;
    let uri = format!("/api/v1/webhooks/replicate/separation?jobId={job_id}&userId=alice");
    let payload = json!({
        "id": "pred-1",
        "status": "succeeded",
        "output": {
            "vocals": "https://replicate.delivery/v.mp3",
            "drums": "https://replicate.delivery/d.mp3",
        },
    });

    let response = app.post_webhook(&uri, payload.clone()).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["result"], "succeeded");
    assert_eq!(json["data"]["applied"], true);

    let view = body_json(
        app.get(&format!("/api/v1/jobs/{job_id}"), Some(&token("alice")))
            .await,
    )
    .await;
    assert_eq!(view["data"]["status"], "succeeded");
    assert_eq!(view["data"]["assets"].as_array().unwrap().len(), 3);

    // A redelivery is acknowledged without new artifacts.
    let again = app.post_webhook(&uri, payload).await;
    assert_eq!(again.status(), StatusCode::OK);
    assert_eq!(body_json(again).await["data"]["result"], "already_succeeded");
    assert_eq!(app.storage.len(), 2);
}

#[tokio::test]
async fn error_callback_marks_job_failed() {
    let app = TestApp::new();
    let job_id = processing_separation(&app, "alice").await;

    let response = app
        .post_webhook(
            &format!("/api/v1/webhooks/replicate/separation?jobId={job_id}&userId=alice"),
            json!({"status": "failed", "error": "CUDA out of memory"}),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["result"], "marked_failed");

    let view = body_json(
        app.get(&format!("/api/v1/jobs/{job_id}"), Some(&token("alice")))
            .await,
    )
    .await;
    assert_eq!(view["data"]["status"], "failed");
}

#[tokio::test]
async fn mismatched_user_is_acknowledged_but_ignored() {
    let app = TestApp::new();
    let job_id = processing_separation(&app, "alice").await;

    let response = app
        .post_webhook(
            &format!("/api/v1/webhooks/replicate/separation?jobId={job_id}&userId=mallory"),
            json!({"status": "succeeded", "output": {"vocals": "https://replicate.delivery/v.mp3"}}),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["result"], "identity_mismatch");
    assert!(app.storage.is_empty());
}

#[tokio::test]
async fn callback_with_out_of_range_timestamp_is_rejected() {
    let app = TestApp::new();
    let job_id = processing_separation(&app, "alice").await;
    let uri = format!("/api/v1/webhooks/replicate/separation?jobId={job_id}&userId=alice");
    let body = serde_json::to_vec(&json!({"status": "failed", "error": "x"})).unwrap();

    for timestamp in [i64::MIN.to_string(), i64::MAX.to_string()] {
        let response = app.post_signed(&uri, body.clone(), &timestamp).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    let view = body_json(
        app.get(&format!("/api/v1/jobs/{job_id}"), Some(&token("alice")))
            .await,
    )
    .await;
    assert_eq!(view["data"]["status"], "processing");
}

#[tokio::test]
async fn oversized_callback_body_is_413() {
    let app = TestApp::new();
    let job_id = processing_separation(&app, "alice").await;
    let uri = format!("/api/v1/webhooks/replicate/separation?jobId={job_id}&userId=alice");
    let padding = "a".repeat(mu2mi_api::router::MAX_REQUEST_BODY_BYTES);
    let body = serde_json::to_vec(&json!({"status": "succeeded", "logs": padding})).unwrap();
    let timestamp = chrono::Utc::now().timestamp().to_string();

    let response = app.post_signed(&uri, body, &timestamp).await;

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}
