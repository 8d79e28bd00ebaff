//! Persistence seams used by the service layer.
//!
//! The traits are the only way the pipeline touches storage. [`PgStore`]
//! backs them with the repositories; [`crate::memory::MemoryStore`] backs
//! them with process memory for tests.

use std::time::Duration;

use async_trait::async_trait;
use mu2mi_core::status::JobStatus;
use mu2mi_core::types::DbId;

use crate::models::asset::{Asset, NewAsset};
use crate::models::job::{Job, JobSummary, NewJob, UpdateJob};
use crate::models::quota::QuotaCounter;
use crate::repositories::{AssetRepo, JobRepo, QuotaRepo};
use crate::DbPool;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The referenced upload does not exist, belongs to someone else, or is
    /// already bound to a job. Nothing was persisted.
    #[error("Asset {asset_id} cannot be bound to a new job")]
    AssetNotBindable { asset_id: DbId },

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait JobStore: Send + Sync {
    /// Cheap reachability probe for health reporting.
    async fn ping(&self) -> Result<(), StoreError>;

    /// Create a job and bind an uploaded asset to it, both or neither.
    async fn create_job_with_asset(
        &self,
        input: &NewJob,
        asset_id: Option<DbId>,
    ) -> Result<Job, StoreError>;

    async fn find_job(&self, id: DbId) -> Result<Option<Job>, StoreError>;

    async fn list_jobs_for_user(&self, user_id: &str) -> Result<Vec<JobSummary>, StoreError>;

    async fn update_job(&self, id: DbId, input: &UpdateJob) -> Result<Option<Job>, StoreError>;

    /// Delete a job and, by cascade, its assets.
    async fn delete_job(&self, id: DbId) -> Result<bool, StoreError>;

    async fn set_prediction_id(&self, id: DbId, prediction_id: &str) -> Result<(), StoreError>;

    /// Conditional `processing -> next`. `true` only for the winning caller.
    async fn transition_from_processing(
        &self,
        id: DbId,
        next: JobStatus,
    ) -> Result<bool, StoreError>;
}

#[async_trait]
pub trait AssetStore: Send + Sync {
    async fn create_asset(&self, input: &NewAsset) -> Result<Asset, StoreError>;

    async fn find_asset(&self, id: DbId) -> Result<Option<Asset>, StoreError>;

    async fn list_assets_for_job(&self, job_id: DbId) -> Result<Vec<Asset>, StoreError>;

    async fn delete_assets(&self, ids: &[DbId]) -> Result<u64, StoreError>;
}

#[async_trait]
pub trait QuotaStore: Send + Sync {
    /// Atomically consume one point, starting a fresh window if needed.
    async fn consume_point(&self, key: &str, window: Duration) -> Result<QuotaCounter, StoreError>;

    /// Read the live counter, if any, without creating one.
    async fn find_counter(&self, key: &str) -> Result<Option<QuotaCounter>, StoreError>;
}

/// Everything the service layer needs from persistence.
pub trait Store: JobStore + AssetStore + QuotaStore {}

impl<T: JobStore + AssetStore + QuotaStore> Store for T {}

// ---------------------------------------------------------------------------
// Postgres
// ---------------------------------------------------------------------------

/// [`Store`] backed by Postgres through the repository layer.
#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

#[async_trait]
impl JobStore for PgStore {
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(crate::health_check(&self.pool).await?)
    }

    async fn create_job_with_asset(
        &self,
        input: &NewJob,
        asset_id: Option<DbId>,
    ) -> Result<Job, StoreError> {
        match JobRepo::create_with_asset(&self.pool, input, asset_id).await? {
            Some(job) => Ok(job),
            None => Err(StoreError::AssetNotBindable {
                asset_id: asset_id.unwrap_or_default(),
            }),
        }
    }

    async fn find_job(&self, id: DbId) -> Result<Option<Job>, StoreError> {
        Ok(JobRepo::find_by_id(&self.pool, id).await?)
    }

    async fn list_jobs_for_user(&self, user_id: &str) -> Result<Vec<JobSummary>, StoreError> {
        Ok(JobRepo::list_for_user(&self.pool, user_id).await?)
    }

    async fn update_job(&self, id: DbId, input: &UpdateJob) -> Result<Option<Job>, StoreError> {
        Ok(JobRepo::update(&self.pool, id, input).await?)
    }

    async fn delete_job(&self, id: DbId) -> Result<bool, StoreError> {
        Ok(JobRepo::delete(&self.pool, id).await?)
    }

    async fn set_prediction_id(&self, id: DbId, prediction_id: &str) -> Result<(), StoreError> {
        Ok(JobRepo::set_prediction_id(&self.pool, id, prediction_id).await?)
    }

    async fn transition_from_processing(
        &self,
        id: DbId,
        next: JobStatus,
    ) -> Result<bool, StoreError> {
        Ok(JobRepo::transition_from_processing(&self.pool, id, next).await?)
    }
}

#[async_trait]
impl AssetStore for PgStore {
    async fn create_asset(&self, input: &NewAsset) -> Result<Asset, StoreError> {
        Ok(AssetRepo::create(&self.pool, input).await?)
    }

    async fn find_asset(&self, id: DbId) -> Result<Option<Asset>, StoreError> {
        Ok(AssetRepo::find_by_id(&self.pool, id).await?)
    }

    async fn list_assets_for_job(&self, job_id: DbId) -> Result<Vec<Asset>, StoreError> {
        Ok(AssetRepo::list_for_job(&self.pool, job_id).await?)
    }

    async fn delete_assets(&self, ids: &[DbId]) -> Result<u64, StoreError> {
        Ok(AssetRepo::delete_many(&self.pool, ids).await?)
    }
}

#[async_trait]
impl QuotaStore for PgStore {
    async fn consume_point(&self, key: &str, window: Duration) -> Result<QuotaCounter, StoreError> {
        Ok(QuotaRepo::consume(&self.pool, key, window).await?)
    }

    async fn find_counter(&self, key: &str) -> Result<Option<QuotaCounter>, StoreError> {
        Ok(QuotaRepo::find_live(&self.pool, key).await?)
    }
}
