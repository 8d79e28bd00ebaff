#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use mu2mi_core::asset::UploadRequest;
use mu2mi_core::job::JobKind;
use mu2mi_core::quota::QuotaPolicy;
use mu2mi_core::types::DbId;
use mu2mi_db::MemoryStore;
use mu2mi_pipeline::fetch::{ArtifactFetcher, FetchError, FetchedArtifact};
use mu2mi_pipeline::{ReconcileOutcome, ServiceDeps, Services, WebhookDelivery, WebhookRejection};
use mu2mi_replicate::webhook::{RawCallbackQuery, SignedHeaders};
use mu2mi_replicate::{
    ModelVersions, Prediction, PredictionRequest, Predictor, ReplicateError, WebhookVerifier,
};
use mu2mi_storage::MemoryStorage;

pub const WEBHOOK_SECRET: &str = "whsec_MfKQ9r8GKYqrTwjUPD8ILPZIo2LaLaSw";
pub const BASE_URL: &str = "https://studio.test";

/// Records prediction requests and answers with sequential ids.
#[derive(Default)]
pub struct FakePredictor {
    pub requests: Mutex<Vec<PredictionRequest>>,
    pub fail: AtomicBool,
    counter: AtomicUsize,
}

impl FakePredictor {
    pub fn requests(&self) -> Vec<PredictionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Predictor for FakePredictor {
    async fn create_prediction(
        &self,
        request: &PredictionRequest,
    ) -> Result<Prediction, ReplicateError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(ReplicateError::ApiError {
                status: 503,
                body: "provider unavailable".to_string(),
            });
        }
        self.requests.lock().unwrap().push(request.clone());
        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(Prediction {
            id: format!("pred-{n}"),
            status: "starting".to_string(),
        })
    }
}

/// Serves every URL with a small body unless it is marked as failing.
#[derive(Default)]
pub struct FakeFetcher {
    failing: Mutex<HashSet<String>>,
    content_types: Mutex<HashMap<String, String>>,
}

impl FakeFetcher {
    pub fn fail_on(&self, url: &str) {
        self.failing.lock().unwrap().insert(url.to_string());
    }

    pub fn serve_as(&self, url: &str, content_type: &str) {
        self.content_types
            .lock()
            .unwrap()
            .insert(url.to_string(), content_type.to_string());
    }
}

#[async_trait]
impl ArtifactFetcher for FakeFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedArtifact, FetchError> {
        if self.failing.lock().unwrap().contains(url) {
            return Err(FetchError::HttpStatus(404));
        }
        let content_type = self.content_types.lock().unwrap().get(url).cloned();
        Ok(FetchedArtifact {
            body: format!("bytes of {url}").into_bytes(),
            content_type,
        })
    }
}

pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub storage: Arc<MemoryStorage>,
    pub predictor: Arc<FakePredictor>,
    pub fetcher: Arc<FakeFetcher>,
    pub services: Services,
    signer: WebhookVerifier,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_quota(QuotaPolicy::default(), true)
    }

    pub fn with_quota(policy: QuotaPolicy, enabled: bool) -> Self {
        let store = Arc::new(MemoryStore::new());
        let storage = Arc::new(MemoryStorage::new());
        let predictor = Arc::new(FakePredictor::default());
        let fetcher = Arc::new(FakeFetcher::default());

        let services = Services::new(ServiceDeps {
            store: store.clone(),
            storage: storage.clone(),
            predictor: predictor.clone(),
            fetcher: fetcher.clone(),
            quota_policy: policy,
            quota_enabled: enabled,
            presign_ttl: Duration::from_secs(900),
            base_url: BASE_URL.to_string(),
            models: ModelVersions::default(),
            verifier: WebhookVerifier::new(WEBHOOK_SECRET).unwrap(),
        });

        Self {
            store,
            storage,
            predictor,
            fetcher,
            services,
            signer: WebhookVerifier::new(WEBHOOK_SECRET).unwrap(),
        }
    }

    /// Create a pending upload for `user_id` and return its asset id.
    pub async fn upload(&self, user_id: &str) -> DbId {
        let request = UploadRequest {
            mime_type: "audio/mpeg".to_string(),
            extension: "mp3".to_string(),
            size_bytes: 1024,
            checksum: None,
        };
        self.services
            .registry
            .create_pending_upload(user_id, &request)
            .await
            .unwrap()
            .asset_id
    }

    /// Deliver a correctly signed callback for `job_id`.
    pub async fn deliver(
        &self,
        kind: JobKind,
        job_id: DbId,
        user_id: &str,
        body: serde_json::Value,
    ) -> Result<ReconcileOutcome, WebhookRejection> {
        let query = RawCallbackQuery {
            job_id: Some(job_id.to_string()),
            user_id: Some(user_id.to_string()),
        };
        self.deliver_to(kind.as_str(), &query, &serde_json::to_vec(&body).unwrap())
            .await
    }

    /// Deliver a correctly signed raw body to an arbitrary route.
    pub async fn deliver_to(
        &self,
        kind: &str,
        query: &RawCallbackQuery,
        body: &[u8],
    ) -> Result<ReconcileOutcome, WebhookRejection> {
        let timestamp = Utc::now().timestamp().to_string();
        let signature = self.signer.sign("msg_test", &timestamp, body).unwrap();

        self.services
            .reconciler
            .handle(WebhookDelivery {
                kind,
                query,
                headers: SignedHeaders {
                    id: Some("msg_test"),
                    timestamp: Some(&timestamp),
                    signature: Some(&signature),
                },
                body,
            })
            .await
    }
}
