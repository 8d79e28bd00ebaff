//! Read and owner-edit operations on jobs.

use std::sync::Arc;

use mu2mi_core::error::CoreError;
use mu2mi_core::status::{JobStatus, StatusId};
use mu2mi_core::types::{DbId, Timestamp};
use mu2mi_db::models::job::{Job, JobSummary, UpdateJob};
use mu2mi_db::Store;
use serde::Serialize;

use crate::error::PipelineError;
use crate::registry::{AssetRegistry, AssetView};

const MAX_NAME_LENGTH: usize = 255;

/// A job as returned to a viewer, with its assets and fresh download URLs.
#[derive(Debug, Clone, Serialize)]
pub struct JobView {
    pub id: DbId,
    pub name: String,
    pub kind: String,
    pub status: String,
    pub is_public: bool,
    pub prediction_id: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub assets: Vec<AssetView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct JobListItem {
    pub id: DbId,
    pub name: String,
    pub kind: String,
    pub status: String,
    pub is_public: bool,
    pub created_at: Timestamp,
}

impl From<JobSummary> for JobListItem {
    fn from(summary: JobSummary) -> Self {
        Self {
            id: summary.id,
            name: summary.name,
            kind: summary.kind,
            status: status_name(summary.status_id),
            is_public: summary.is_public,
            created_at: summary.created_at,
        }
    }
}

fn status_name(status_id: StatusId) -> String {
    JobStatus::from_id(status_id)
        .map(|s| s.as_str().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

pub struct JobQueries {
    store: Arc<dyn Store>,
    registry: Arc<AssetRegistry>,
}

impl JobQueries {
    pub fn new(store: Arc<dyn Store>, registry: Arc<AssetRegistry>) -> Self {
        Self { store, registry }
    }

    /// Load a job for `viewer`. Public jobs are visible to anyone; private
    /// jobs only to their owner.
    pub async fn view(&self, job_id: DbId, viewer: Option<&str>) -> Result<JobView, PipelineError> {
        let job = self.find(job_id).await?;

        if !job.is_public {
            match viewer {
                None => {
                    return Err(CoreError::Unauthenticated("Sign in to view this job".into()).into())
                }
                Some(user_id) if !job.is_owned_by(user_id) => {
                    return Err(CoreError::Unauthorized("Job is private".into()).into())
                }
                Some(_) => {}
            }
        }

        let assets = self.registry.list_for_job(job.id).await?;
        Ok(JobView {
            id: job.id,
            status: status_name(job.status_id),
            name: job.name,
            kind: job.kind,
            is_public: job.is_public,
            prediction_id: job.prediction_id,
            created_at: job.created_at,
            updated_at: job.updated_at,
            assets,
        })
    }

    pub async fn list(&self, user_id: &str) -> Result<Vec<JobListItem>, PipelineError> {
        let summaries = self.store.list_jobs_for_user(user_id).await?;
        Ok(summaries.into_iter().map(JobListItem::from).collect())
    }

    /// Rename or change visibility of an owned job.
    pub async fn update(
        &self,
        user_id: &str,
        job_id: DbId,
        mut input: UpdateJob,
    ) -> Result<JobListItem, PipelineError> {
        if input.is_empty() {
            return Err(CoreError::validation("Nothing to update").into());
        }
        if let Some(name) = input.name.as_mut() {
            let trimmed = name.trim();
            if trimmed.is_empty() || trimmed.chars().count() > MAX_NAME_LENGTH {
                return Err(CoreError::invalid_field(
                    "name",
                    format!("must be between 1 and {MAX_NAME_LENGTH} characters"),
                )
                .into());
            }
            *name = trimmed.to_string();
        }

        self.find_owned(user_id, job_id).await?;

        let job = self
            .store
            .update_job(job_id, &input)
            .await?
            .ok_or(CoreError::NotFound { entity: "Job", id: job_id })?;

        tracing::info!(job_id, user_id, "Job updated");
        Ok(JobListItem {
            id: job.id,
            status: status_name(job.status_id),
            name: job.name,
            kind: job.kind,
            is_public: job.is_public,
            created_at: job.created_at,
        })
    }

    /// Delete an owned job, its asset rows and, best-effort, their objects.
    pub async fn delete(&self, user_id: &str, job_id: DbId) -> Result<(), PipelineError> {
        self.find_owned(user_id, job_id).await?;

        let assets = self.store.list_assets_for_job(job_id).await?;
        if !self.store.delete_job(job_id).await? {
            return Err(CoreError::NotFound { entity: "Job", id: job_id }.into());
        }
        self.registry.delete_objects(&assets).await;

        tracing::info!(job_id, user_id, assets = assets.len(), "Job deleted");
        Ok(())
    }

    async fn find(&self, job_id: DbId) -> Result<Job, PipelineError> {
        Ok(self
            .store
            .find_job(job_id)
            .await?
            .ok_or(CoreError::NotFound { entity: "Job", id: job_id })?)
    }

    async fn find_owned(&self, user_id: &str, job_id: DbId) -> Result<Job, PipelineError> {
        let job = self.find(job_id).await?;
        if !job.is_owned_by(user_id) {
            return Err(CoreError::Unauthorized("Job belongs to another user".into()).into());
        }
        Ok(job)
    }
}
