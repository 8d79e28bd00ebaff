//! Completion callbacks from the provider.
//!
//! Steps run in a fixed order and each one can end the delivery:
//!
//! 1. Verify the signature. This is the only rejection the provider sees
//!    as unauthorized.
//! 2. Parse the callback metadata, route kind and body. Malformed input is
//!    rejected as a bad request and the store is not touched.
//! 3. A top-level `error` fails the job.
//! 4. Load the job and check it matches the callback's user and kind.
//! 5. Guards: an already succeeded job, a `starting` ping, or a failure or
//!    cancellation of a processing job each end the delivery.
//! 6. A `succeeded` delivery without output is acknowledged and ignored.
//!    Otherwise persist every artifact independently, then move the job to
//!    `succeeded`.
//!
//! Past step 2 every outcome is acknowledged; internal errors are logged.
//! All transitions are conditional on the job still being `processing`, so
//! concurrent deliveries have exactly one winner.

use std::sync::Arc;

use chrono::Utc;
use futures::future::join_all;
use mu2mi_core::asset::{url_extension, AssetRole};
use mu2mi_core::job::{JobKind, OutputShape};
use mu2mi_core::status::JobStatus;
use mu2mi_core::types::DbId;
use mu2mi_db::models::asset::Asset;
use mu2mi_db::models::job::Job;
use mu2mi_db::Store;
use mu2mi_replicate::webhook::{
    CallbackMetadata, PredictionStatus, ProviderOutput, RawCallbackQuery,
    SignedHeaders, WebhookPayload,
};
use mu2mi_replicate::{SignatureError, WebhookVerifier};
use serde::Serialize;

use crate::registry::{ArtifactSource, AssetRegistry};

/// One inbound callback, as received.
#[derive(Debug, Clone, Copy)]
pub struct WebhookDelivery<'a> {
    /// The `{kind}` path segment.
    pub kind: &'a str,
    pub query: &'a RawCallbackQuery,
    pub headers: SignedHeaders<'a>,
    pub body: &'a [u8],
}

/// Deliveries that are refused rather than acknowledged.
#[derive(Debug, thiserror::Error)]
pub enum WebhookRejection {
    #[error("Invalid webhook signature: {0}")]
    Unauthenticated(#[from] SignatureError),

    #[error("Malformed webhook: {0}")]
    BadRequest(String),
}

/// What happened to one artifact of a successful delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ArtifactResult {
    Stored { asset_id: DbId },
    Failed { reason: String },
    /// Not persisted: null entry, unknown stem or unlisted extension.
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactOutcome {
    /// Stem name, URL or document label identifying the entry.
    pub label: String,
    pub role: Option<AssetRole>,
    pub result: ArtifactResult,
}

/// Acknowledged result of one delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum ReconcileOutcome {
    /// Top-level error. `applied` is false if the job was not processing or
    /// the store update failed.
    MarkedFailed { applied: bool },
    JobNotFound,
    /// The callback's user or route kind does not match the job row.
    IdentityMismatch,
    AlreadySucceeded,
    IgnoredStarting,
    Transitioned { status: JobStatus, applied: bool },
    /// `succeeded` with output that does not fit the kind. The job is failed.
    OutputRejected { applied: bool },
    Succeeded {
        artifacts: Vec<ArtifactOutcome>,
        applied: bool,
    },
    /// Nothing applicable, e.g. a non-terminal status, a terminal job or a
    /// success without output.
    Ignored,
    /// The store failed mid-way; logged and acknowledged.
    InternalError,
}

pub struct WebhookReconciler {
    store: Arc<dyn Store>,
    registry: Arc<AssetRegistry>,
    verifier: WebhookVerifier,
}

impl WebhookReconciler {
    pub fn new(
        store: Arc<dyn Store>,
        registry: Arc<AssetRegistry>,
        verifier: WebhookVerifier,
    ) -> Self {
        Self {
            store,
            registry,
            verifier,
        }
    }

    pub async fn handle(
        &self,
        delivery: WebhookDelivery<'_>,
    ) -> Result<ReconcileOutcome, WebhookRejection> {
        self.verifier
            .verify(delivery.headers, delivery.body, Utc::now().timestamp())?;

        let metadata = CallbackMetadata::parse(delivery.query)
            .map_err(|e| WebhookRejection::BadRequest(e.to_string()))?;
        let route_kind = JobKind::from_name(delivery.kind).ok_or_else(|| {
            WebhookRejection::BadRequest(format!("unknown job kind '{}'", delivery.kind))
        })?;
        let payload: WebhookPayload = serde_json::from_slice(delivery.body)
            .map_err(|e| WebhookRejection::BadRequest(format!("invalid body: {e}")))?;

        Ok(self.reconcile(&metadata, route_kind, payload).await)
    }

    async fn reconcile(
        &self,
        metadata: &CallbackMetadata,
        route_kind: JobKind,
        payload: WebhookPayload,
    ) -> ReconcileOutcome {
        let job_id = metadata.job_id;

        if payload.has_error() {
            tracing::warn!(job_id, error = ?payload.error, "Prediction reported an error");
            let applied = self.transition(job_id, JobStatus::Failed).await.unwrap_or(false);
            return ReconcileOutcome::MarkedFailed { applied };
        }

        let job = match self.store.find_job(job_id).await {
            Ok(Some(job)) => job,
            Ok(None) => {
                tracing::warn!(job_id, "Webhook for unknown job");
                return ReconcileOutcome::JobNotFound;
            }
            Err(e) => {
                tracing::error!(job_id, error = %e, "Failed to load job for webhook");
                return ReconcileOutcome::InternalError;
            }
        };

        let Some(job_kind) = job.job_kind().filter(|k| *k == route_kind) else {
            tracing::warn!(job_id, route_kind = %route_kind, job_kind = %job.kind, "Webhook kind mismatch");
            return ReconcileOutcome::IdentityMismatch;
        };
        if !job.is_owned_by(&metadata.user_id) {
            tracing::warn!(job_id, user_id = %metadata.user_id, "Webhook user does not own job");
            return ReconcileOutcome::IdentityMismatch;
        }

        let job_status = job.status();
        if job_status == Some(JobStatus::Succeeded) {
            tracing::debug!(job_id, "Duplicate delivery for succeeded job");
            return ReconcileOutcome::AlreadySucceeded;
        }
        if payload.status == PredictionStatus::Starting {
            return ReconcileOutcome::IgnoredStarting;
        }
        if job_status != Some(JobStatus::Processing) {
            tracing::debug!(job_id, status = ?job_status, "Delivery for terminal job ignored");
            return ReconcileOutcome::Ignored;
        }

        match payload.status {
            PredictionStatus::Failed | PredictionStatus::Canceled => {
                let status = if payload.status == PredictionStatus::Failed {
                    JobStatus::Failed
                } else {
                    JobStatus::Canceled
                };
                match self.transition(job_id, status).await {
                    Some(applied) => ReconcileOutcome::Transitioned { status, applied },
                    None => ReconcileOutcome::InternalError,
                }
            }
            PredictionStatus::Succeeded => match payload.output.filter(|v| !v.is_null()) {
                Some(output) => self.complete(&job, job_kind, output).await,
                None => {
                    tracing::warn!(job_id, "Succeeded delivery without output ignored");
                    ReconcileOutcome::Ignored
                }
            },
            PredictionStatus::Starting | PredictionStatus::Processing | PredictionStatus::Unknown => {
                ReconcileOutcome::Ignored
            }
        }
    }

    /// Success path for a processing job.
    async fn complete(
        &self,
        job: &Job,
        kind: JobKind,
        output: serde_json::Value,
    ) -> ReconcileOutcome {
        let output = match ProviderOutput::decode(kind.output_shape(), output) {
            Ok(output) => output,
            Err(e) => {
                tracing::error!(job_id = job.id, kind = %kind, error = %e, "Unusable prediction output");
                let applied = self.transition(job.id, JobStatus::Failed).await.unwrap_or(false);
                return ReconcileOutcome::OutputRejected { applied };
            }
        };

        let (planned, skipped) = plan_artifacts(kind, output);

        let results = join_all(planned.into_iter().map(|(label, role, source)| async move {
            let result = self
                .registry
                .persist_result(job.id, &job.user_id, role, source)
                .await;
            (label, role, result)
        }))
        .await;

        let mut stored: Vec<Asset> = Vec::new();
        let mut artifacts: Vec<ArtifactOutcome> = Vec::with_capacity(results.len() + skipped.len());
        for (label, role, result) in results {
            let result = match result {
                Ok(asset) => {
                    let asset_id = asset.id;
                    stored.push(asset);
                    ArtifactResult::Stored { asset_id }
                }
                Err(e) => {
                    tracing::error!(job_id = job.id, role = %role, label = %label, error = %e, "Artifact not saved");
                    ArtifactResult::Failed {
                        reason: e.to_string(),
                    }
                }
            };
            artifacts.push(ArtifactOutcome {
                label,
                role: Some(role),
                result,
            });
        }
        artifacts.extend(skipped);

        match self.transition(job.id, JobStatus::Succeeded).await {
            Some(true) => {
                tracing::info!(job_id = job.id, saved = stored.len(), "Job succeeded");
                ReconcileOutcome::Succeeded {
                    artifacts,
                    applied: true,
                }
            }
            Some(false) => {
                tracing::warn!(job_id = job.id, count = stored.len(), "Lost completion race, removing artifacts");
                if let Err(e) = self.registry.remove(&stored).await {
                    tracing::error!(job_id = job.id, error = %e, "Failed to remove artifacts of losing delivery");
                }
                ReconcileOutcome::Succeeded {
                    artifacts,
                    applied: false,
                }
            }
            // Artifacts stay bound so the job can be completed by hand.
            None => {
                tracing::error!(job_id = job.id, saved = stored.len(), "Artifacts kept for a job left processing");
                ReconcileOutcome::InternalError
            }
        }
    }

    /// Conditional transition. `None` means the store failed (already logged).
    async fn transition(&self, job_id: DbId, next: JobStatus) -> Option<bool> {
        match self.store.transition_from_processing(job_id, next).await {
            Ok(applied) => {
                if applied {
                    tracing::info!(job_id, status = %next, "Job status updated");
                }
                Some(applied)
            }
            Err(e) => {
                tracing::error!(job_id, status = %next, error = %e, "Failed to update job status");
                None
            }
        }
    }
}

type PlannedArtifact = (String, AssetRole, ArtifactSource);

/// Split decoded output into artifacts to persist and entries to skip.
fn plan_artifacts(
    kind: JobKind,
    output: ProviderOutput,
) -> (Vec<PlannedArtifact>, Vec<ArtifactOutcome>) {
    let mut planned = Vec::new();
    let mut skipped = Vec::new();

    let mut skip = |label: String, role: Option<AssetRole>| {
        skipped.push(ArtifactOutcome {
            label,
            role,
            result: ArtifactResult::Skipped,
        });
    };

    match output {
        ProviderOutput::SingleUrl(url) => {
            if let OutputShape::SingleUrl(role) = kind.output_shape() {
                planned.push((url.clone(), role, ArtifactSource::Url(url)));
            }
        }
        ProviderOutput::UrlList(urls) => {
            for url in urls {
                let Some(url) = url else {
                    skip("null".to_string(), None);
                    continue;
                };
                match AssetRole::from_analysis_extension(&url_extension(&url)) {
                    Some(role) => planned.push((url.clone(), role, ArtifactSource::Url(url))),
                    None => skip(url, None),
                }
            }
        }
        ProviderOutput::Stems(stems) => {
            for (stem, url) in stems {
                let role = AssetRole::from_stem(&stem);
                match (role, url) {
                    (Some(role), Some(url)) => planned.push((stem, role, ArtifactSource::Url(url))),
                    (role, _) => skip(stem, role),
                }
            }
        }
        ProviderOutput::Document(value) => {
            if let OutputShape::Document(role) = kind.output_shape() {
                match serde_json::to_vec(&value) {
                    Ok(body) => planned.push((
                        "document".to_string(),
                        role,
                        ArtifactSource::Inline {
                            body,
                            mime_type: "application/json".to_string(),
                            extension: ".json".to_string(),
                        },
                    )),
                    Err(_) => skip("document".to_string(), Some(role)),
                }
            }
        }
    }

    (planned, skipped)
}
