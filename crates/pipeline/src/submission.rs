//! Job submission: validate, charge quota, create and bind, dispatch.
//!
//! Each stage short-circuits. Once the job row exists a later failure leaves
//! it in `processing`; that state is reported to the caller, not hidden.

use std::sync::Arc;

use mu2mi_core::error::CoreError;
use mu2mi_core::params::{JobRequest, ModelParams};
use mu2mi_core::types::DbId;
use mu2mi_db::models::job::NewJob;
use mu2mi_db::{Store, StoreError};
use mu2mi_replicate::Dispatcher;
use serde::Serialize;

use crate::error::PipelineError;
use crate::quota::QuotaLedger;
use crate::registry::AssetRegistry;

#[derive(Debug, Clone, Serialize)]
pub struct Submission {
    pub job_id: DbId,
    pub prediction_id: String,
}

pub struct JobSubmitter {
    store: Arc<dyn Store>,
    quota: Arc<QuotaLedger>,
    registry: Arc<AssetRegistry>,
    dispatcher: Arc<Dispatcher>,
}

impl JobSubmitter {
    pub fn new(
        store: Arc<dyn Store>,
        quota: Arc<QuotaLedger>,
        registry: Arc<AssetRegistry>,
        dispatcher: Arc<Dispatcher>,
    ) -> Self {
        Self {
            store,
            quota,
            registry,
            dispatcher,
        }
    }

    pub async fn submit<P: ModelParams>(
        &self,
        user_id: &str,
        request: JobRequest<P>,
    ) -> Result<Submission, PipelineError> {
        let kind = request.kind();

        request.validate_request()?;
        self.quota.charge(user_id).await?;

        let new_job = NewJob {
            user_id: user_id.to_string(),
            name: request.name.trim().to_string(),
            is_public: request.is_public,
            kind,
        };
        let job = match self
            .store
            .create_job_with_asset(&new_job, request.asset_id)
            .await
        {
            Ok(job) => job,
            Err(StoreError::AssetNotBindable { asset_id }) => {
                tracing::warn!(user_id, asset_id, kind = %kind, "Asset binding failed");
                return Err(CoreError::Internal("Failed to create job".into()).into());
            }
            Err(e) => return Err(e.into()),
        };

        let audio_url = match request.asset_id {
            Some(asset_id) => {
                let asset = self.store.find_asset(asset_id).await?.ok_or(CoreError::NotFound {
                    entity: "Asset",
                    id: asset_id,
                })?;
                Some(self.registry.download_url(&asset.object_key).await?)
            }
            None => None,
        };

        let input = request.provider_input(audio_url.as_deref())?;
        let prediction = match self.dispatcher.submit(kind, input, job.id, user_id).await {
            Ok(prediction) => prediction,
            Err(e) => {
                tracing::error!(
                    job_id = job.id,
                    user_id,
                    kind = %kind,
                    error = %e,
                    "Dispatch failed, job left in processing",
                );
                return Err(e.into());
            }
        };

        if let Err(e) = self.store.set_prediction_id(job.id, &prediction.id).await {
            tracing::warn!(job_id = job.id, error = %e, "Failed to record prediction id");
        }

        tracing::info!(job_id = job.id, user_id, kind = %kind, "Job submitted");
        Ok(Submission {
            job_id: job.id,
            prediction_id: prediction.id,
        })
    }
}
