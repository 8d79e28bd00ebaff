//! Submits jobs to the provider with a callback URL that names the job.
//!
//! The `jobId`/`userId` query parameters are plain identifiers, not
//! credentials. Callbacks are trusted only after signature verification.

use std::sync::Arc;

use async_trait::async_trait;
use mu2mi_core::job::JobKind;
use mu2mi_core::types::DbId;
use reqwest::Url;

use crate::api::{Prediction, PredictionRequest};
use crate::config::ModelVersions;
use crate::error::ReplicateError;

/// Query parameter carrying the job id in callback URLs.
pub const JOB_ID_PARAM: &str = "jobId";

/// Query parameter carrying the user id in callback URLs.
pub const USER_ID_PARAM: &str = "userId";

/// Something that can start a prediction.
#[async_trait]
pub trait Predictor: Send + Sync {
    async fn create_prediction(
        &self,
        request: &PredictionRequest,
    ) -> Result<Prediction, ReplicateError>;
}

pub struct Dispatcher {
    predictor: Arc<dyn Predictor>,
    base_url: String,
    models: ModelVersions,
}

impl Dispatcher {
    pub fn new(predictor: Arc<dyn Predictor>, base_url: &str, models: ModelVersions) -> Self {
        Self {
            predictor,
            base_url: base_url.trim_end_matches('/').to_string(),
            models,
        }
    }

    /// Callback URL for one job: `{base}/api/v1/webhooks/replicate/{kind}?jobId=..&userId=..`.
    pub fn callback_url(
        &self,
        kind: JobKind,
        job_id: DbId,
        user_id: &str,
    ) -> Result<String, ReplicateError> {
        let raw = format!("{}/api/v1/webhooks/replicate/{}", self.base_url, kind.as_str());
        let mut url = Url::parse(&raw)
            .map_err(|e| ReplicateError::InvalidCallbackUrl(format!("{raw}: {e}")))?;
        url.query_pairs_mut()
            .append_pair(JOB_ID_PARAM, &job_id.to_string())
            .append_pair(USER_ID_PARAM, user_id);
        Ok(url.into())
    }

    /// Start the model for `kind` on `input`, asking for a callback on
    /// completion only.
    pub async fn submit(
        &self,
        kind: JobKind,
        input: serde_json::Value,
        job_id: DbId,
        user_id: &str,
    ) -> Result<Prediction, ReplicateError> {
        let request = PredictionRequest {
            version: self.models.for_kind(kind).to_string(),
            input,
            webhook: self.callback_url(kind, job_id, user_id)?,
            webhook_events_filter: vec!["completed".to_string()],
        };

        let prediction = self.predictor.create_prediction(&request).await?;
        tracing::info!(
            job_id,
            kind = %kind,
            prediction_id = %prediction.id,
            "Prediction created",
        );
        Ok(prediction)
    }
}
