#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use mu2mi_core::quota::QuotaPolicy;
use mu2mi_db::MemoryStore;
use mu2mi_pipeline::fetch::{ArtifactFetcher, FetchError, FetchedArtifact};
use mu2mi_pipeline::{ServiceDeps, Services};
use mu2mi_replicate::webhook::{
    WEBHOOK_ID_HEADER, WEBHOOK_SIGNATURE_HEADER, WEBHOOK_TIMESTAMP_HEADER,
};
use mu2mi_replicate::{ModelVersions, Prediction, PredictionRequest, Predictor, ReplicateError, WebhookVerifier};
use mu2mi_storage::MemoryStorage;
use tower::ServiceExt;

use mu2mi_api::auth::jwt::{issue_token, SessionConfig};
use mu2mi_api::config::{QuotaConfig, ServerConfig};
use mu2mi_api::router::build_app_router;
use mu2mi_api::state::AppState;

pub const WEBHOOK_SECRET: &str = "whsec_MfKQ9r8GKYqrTwjUPD8ILPZIo2LaLaSw";
pub const SESSION_SECRET: &str = "test-secret-that-is-long-enough-for-hmac";

/// Accepts every prediction and answers with sequential ids.
#[derive(Default)]
pub struct AcceptingPredictor {
    counter: AtomicUsize,
}

#[async_trait]
impl Predictor for AcceptingPredictor {
    async fn create_prediction(
        &self,
        _request: &PredictionRequest,
    ) -> Result<Prediction, ReplicateError> {
        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(Prediction {
            id: format!("pred-{n}"),
            status: "starting".to_string(),
        })
    }
}

/// Serves every artifact URL with a small body.
pub struct StaticFetcher;

#[async_trait]
impl ArtifactFetcher for StaticFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedArtifact, FetchError> {
        Ok(FetchedArtifact {
            body: format!("bytes of {url}").into_bytes(),
            content_type: Some("audio/mpeg".to_string()),
        })
    }
}

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config(quota: QuotaConfig) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 30,
        log_json: false,
        session: SessionConfig {
            secret: SESSION_SECRET.to_string(),
        },
        quota,
    }
}

/// Application router over in-memory backends, plus handles on them.
pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
    pub storage: Arc<MemoryStorage>,
    signer: WebhookVerifier,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_quota(QuotaConfig {
            enabled: true,
            points: 10,
            window_secs: 3600,
        })
    }

    /// Mirrors the wiring in `main.rs` with the production middleware stack.
    pub fn with_quota(quota: QuotaConfig) -> Self {
        let config = test_config(quota);
        let store = Arc::new(MemoryStore::new());
        let storage = Arc::new(MemoryStorage::new());

        let policy: QuotaPolicy = config.quota.policy();
        let services = Services::new(ServiceDeps {
            store: store.clone(),
            storage: storage.clone(),
            predictor: Arc::new(AcceptingPredictor::default()),
            fetcher: Arc::new(StaticFetcher),
            quota_policy: policy,
            quota_enabled: config.quota.enabled,
            presign_ttl: Duration::from_secs(900),
            base_url: "https://studio.test".to_string(),
            models: ModelVersions::default(),
            verifier: WebhookVerifier::new(WEBHOOK_SECRET).unwrap(),
        });

        let state = AppState {
            services: Arc::new(services),
            config: Arc::new(config.clone()),
        };

        Self {
            router: build_app_router(state, &config),
            store,
            storage,
            signer: WebhookVerifier::new(WEBHOOK_SECRET).unwrap(),
        }
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> Response<Body> {
        self.send(request(Method::GET, uri, token, None)).await
    }

    pub async fn post_json(
        &self,
        uri: &str,
        token: Option<&str>,
        body: serde_json::Value,
    ) -> Response<Body> {
        self.send(request(Method::POST, uri, token, Some(body))).await
    }

    pub async fn patch_json(
        &self,
        uri: &str,
        token: Option<&str>,
        body: serde_json::Value,
    ) -> Response<Body> {
        self.send(request(Method::PATCH, uri, token, Some(body))).await
    }

    pub async fn delete(&self, uri: &str, token: Option<&str>) -> Response<Body> {
        self.send(request(Method::DELETE, uri, token, None)).await
    }

    /// POST a provider callback signed with the configured webhook secret.
    pub async fn post_webhook(&self, uri: &str, body: serde_json::Value) -> Response<Body> {
        let bytes = serde_json::to_vec(&body).unwrap();
        let timestamp = chrono::Utc::now().timestamp().to_string();
        self.post_signed(uri, bytes, &timestamp).await
    }

    /// POST raw bytes correctly signed for the given timestamp header value.
    pub async fn post_signed(&self, uri: &str, bytes: Vec<u8>, timestamp: &str) -> Response<Body> {
        let signature = self.signer.sign("msg_test", timestamp, &bytes).unwrap();

        let request = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(CONTENT_TYPE, "application/json")
            .header(WEBHOOK_ID_HEADER, "msg_test")
            .header(WEBHOOK_TIMESTAMP_HEADER, timestamp)
            .header(WEBHOOK_SIGNATURE_HEADER, signature)
            .body(Body::from(bytes))
            .unwrap();
        self.send(request).await
    }

    /// Create a pending upload for the token's user and return its asset id.
    pub async fn upload(&self, token: &str) -> i64 {
        let response = self
            .post_json(
                "/api/v1/assets/presigned-upload",
                Some(token),
                serde_json::json!({
                    "mime_type": "audio/mpeg",
                    "extension": "mp3",
                    "size_bytes": 2048,
                }),
            )
            .await;
        body_json(response).await["data"]["asset_id"].as_i64().unwrap()
    }
}

/// A valid session token for `user_id`.
pub fn token(user_id: &str) -> String {
    let config = SessionConfig {
        secret: SESSION_SECRET.to_string(),
    };
    issue_token(user_id, 3600, &config).unwrap()
}

fn request(
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<serde_json::Value>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
    }
    match body {
        Some(json) => builder
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(&json).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

/// Collect a response body and parse it as JSON.
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
