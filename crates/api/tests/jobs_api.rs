//! Integration tests for job submission, retrieval and edits over HTTP.

mod common;

use axum::http::{header, StatusCode};
use common::{body_json, token, TestApp};
use mu2mi_api::config::QuotaConfig;
use serde_json::json;

async fn submit_separation(app: &TestApp, token: &str, is_public: bool) -> i64 {
    let asset_id = app.upload(token).await;
    let response = app
        .post_json(
            "/api/v1/jobs/separate",
            Some(token),
            json!({"name": "Split", "is_public": is_public, "asset_id": asset_id}),
        )
        .await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    body_json(response).await["data"]["job_id"].as_i64().unwrap()
}

#[tokio::test]
async fn presigned_upload_returns_asset_and_url() {
    let app = TestApp::new();
    let alice = token("alice");

    let response = app
        .post_json(
            "/api/v1/assets/presigned-upload",
            Some(&alice),
            json!({"mime_type": "audio/wav", "extension": ".WAV", "size_bytes": 4096}),
        )
        .await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    assert!(json["data"]["asset_id"].is_i64());
    let url = json["data"]["url"].as_str().unwrap();
    assert!(url.starts_with("memory://put/"));
    assert!(url.contains(".wav?"));
    assert_eq!(app.store.asset_count(), 1);
}

#[tokio::test]
async fn presigned_upload_rejects_non_audio() {
    let app = TestApp::new();

    let response = app
        .post_json(
            "/api/v1/assets/presigned-upload",
            Some(&token("alice")),
            json!({"mime_type": "image/png", "extension": "png", "size_bytes": 10}),
        )
        .await;

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(app.store.asset_count(), 0);
}

#[tokio::test]
async fn submit_requires_a_session() {
    let app = TestApp::new();

    let response = app
        .post_json("/api/v1/jobs/generate", None, json!({"name": "Jam", "params": {"prompt": "lofi"}}))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["code"], "UNAUTHENTICATED");

    let response = app
        .post_json(
            "/api/v1/jobs/generate",
            Some("not-a-jwt"),
            json!({"name": "Jam", "params": {"prompt": "lofi"}}),
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(app.store.job_count(), 0);
}

#[tokio::test]
async fn submit_generation_returns_202_with_ids() {
    let app = TestApp::new();

    let response = app
        .post_json(
            "/api/v1/jobs/generate",
            Some(&token("alice")),
            json!({"name": "Jam", "params": {"prompt": "lofi beat", "duration": 12}}),
        )
        .await;

    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let json = body_json(response).await;
    assert!(json["data"]["job_id"].is_i64());
    assert_eq!(json["data"]["prediction_id"], "pred-1");
}

#[tokio::test]
async fn separation_without_asset_is_422_with_fields() {
    let app = TestApp::new();

    let response = app
        .post_json(
            "/api/v1/jobs/separate",
            Some(&token("alice")),
            json!({"name": "Split"}),
        )
        .await;

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let json = body_json(response).await;
    assert_eq!(json["code"], "VALIDATION_FAILED");
    assert!(json["fields"]["asset_id"].is_array());
}

#[tokio::test]
async fn exhausted_quota_returns_429_with_retry_after() {
    let app = TestApp::with_quota(QuotaConfig {
        enabled: true,
        points: 2,
        window_secs: 3600,
    });
    let alice = token("alice");
    let body = json!({"name": "Jam", "params": {"prompt": "lofi"}});

    let first = app.post_json("/api/v1/jobs/generate", Some(&alice), body.clone()).await;
    assert_eq!(first.status(), StatusCode::ACCEPTED);

    let second = app.post_json("/api/v1/jobs/generate", Some(&alice), body).await;
    assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
    let retry_after: i64 = second.headers()[header::RETRY_AFTER]
        .to_str()
        .unwrap()
        .parse()
        .unwrap();
    assert!(retry_after > 0 && retry_after <= 3600);
    assert_eq!(body_json(second).await["code"], "TOO_MANY_REQUESTS");
    assert_eq!(app.store.job_count(), 1);
}

#[tokio::test]
async fn credits_reflect_submissions() {
    let app = TestApp::new();
    let alice = token("alice");

    let before = body_json(app.get("/api/v1/user/credits", Some(&alice)).await).await;
    assert_eq!(before["data"]["remaining_points"], 10);
    assert_eq!(before["data"]["consumed_points"], 0);

    submit_separation(&app, &alice, false).await;

    let after = body_json(app.get("/api/v1/user/credits", Some(&alice)).await).await;
    assert_eq!(after["data"]["remaining_points"], 9);
    assert_eq!(after["data"]["consumed_points"], 1);
    assert!(after["data"]["ms_before_next_refill"].as_i64().unwrap() > 0);
}

#[tokio::test]
async fn private_job_visibility_boundary() {
    let app = TestApp::new();
    let alice = token("alice");
    let job_id = submit_separation(&app, &alice, false).await;
    let uri = format!("/api/v1/jobs/{job_id}");

    let owner = app.get(&uri, Some(&alice)).await;
    assert_eq!(owner.status(), StatusCode::OK);
    let json = body_json(owner).await;
    assert_eq!(json["data"]["status"], "processing");
    assert_eq!(json["data"]["kind"], "separation");
    assert_eq!(json["data"]["assets"].as_array().unwrap().len(), 1);

    let anonymous = app.get(&uri, None).await;
    assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED);

    let stranger = app.get(&uri, Some(&token("bob"))).await;
    assert_eq!(stranger.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_json(stranger).await["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn public_job_is_readable_anonymously() {
    let app = TestApp::new();
    let job_id = submit_separation(&app, &token("alice"), true).await;

    let response = app.get(&format!("/api/v1/jobs/{job_id}"), None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["is_public"], true);
}

#[tokio::test]
async fn missing_job_is_404() {
    let app = TestApp::new();
    let response = app.get("/api/v1/jobs/999", Some(&token("alice"))).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn list_patch_and_delete_own_jobs() {
    let app = TestApp::new();
    let alice = token("alice");
    let job_id = submit_separation(&app, &alice, false).await;
    submit_separation(&app, &token("bob"), false).await;
    let uri = format!("/api/v1/jobs/{job_id}");

    let list = body_json(app.get("/api/v1/jobs", Some(&alice)).await).await;
    let jobs = list["data"].as_array().unwrap();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0]["id"], job_id);

    let patched = app
        .patch_json(&uri, Some(&alice), json!({"name": "Stems v2", "is_public": true}))
        .await;
    assert_eq!(patched.status(), StatusCode::OK);
    let json = body_json(patched).await;
    assert_eq!(json["data"]["name"], "Stems v2");
    assert_eq!(json["data"]["is_public"], true);

    let foreign = app.delete(&uri, Some(&token("bob"))).await;
    assert_eq!(foreign.status(), StatusCode::FORBIDDEN);

    let deleted = app.delete(&uri, Some(&alice)).await;
    assert_eq!(deleted.status(), StatusCode::NO_CONTENT);
    assert_eq!(app.get(&uri, Some(&alice)).await.status(), StatusCode::NOT_FOUND);
}
