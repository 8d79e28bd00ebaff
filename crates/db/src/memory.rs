//! In-process [`Store`](crate::store::Store) for tests and local runs
//! without Postgres.
//!
//! Semantics follow the Postgres implementation: job creation and asset
//! binding happen under one lock, status transitions are conditional, and
//! deleting a job removes its assets.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use mu2mi_core::status::JobStatus;
use mu2mi_core::types::DbId;

use crate::models::asset::{Asset, NewAsset};
use crate::models::job::{Job, JobSummary, NewJob, UpdateJob};
use crate::models::quota::QuotaCounter;
use crate::store::{AssetStore, JobStore, QuotaStore, StoreError};

#[derive(Default)]
struct Inner {
    next_job_id: DbId,
    next_asset_id: DbId,
    jobs: BTreeMap<DbId, Job>,
    assets: BTreeMap<DbId, Asset>,
    counters: BTreeMap<String, QuotaCounter>,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
    unavailable: AtomicBool,
    fail_asset_inserts: AtomicBool,
    fail_transitions: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call fail as if the database were down.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Make asset inserts fail while everything else keeps working.
    pub fn set_fail_asset_inserts(&self, fail: bool) {
        self.fail_asset_inserts.store(fail, Ordering::SeqCst);
    }

    /// Make status transitions fail while everything else keeps working.
    pub fn set_fail_transitions(&self, fail: bool) {
        self.fail_transitions.store(fail, Ordering::SeqCst);
    }

    pub fn job_count(&self) -> usize {
        self.inner.lock().map(|inner| inner.jobs.len()).unwrap_or(0)
    }

    pub fn asset_count(&self) -> usize {
        self.inner.lock().map(|inner| inner.assets.len()).unwrap_or(0)
    }

    /// Every asset row, bound or not.
    pub fn all_assets(&self) -> Vec<Asset> {
        self.inner
            .lock()
            .map(|inner| inner.assets.values().cloned().collect())
            .unwrap_or_default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>, StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store offline".into()));
        }
        self.inner
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".into()))
    }
}

#[async_trait]
impl JobStore for MemoryStore {
    async fn ping(&self) -> Result<(), StoreError> {
        self.lock().map(|_| ())
    }

    async fn create_job_with_asset(
        &self,
        input: &NewJob,
        asset_id: Option<DbId>,
    ) -> Result<Job, StoreError> {
        let mut inner = self.lock()?;

        if let Some(asset_id) = asset_id {
            let bindable = inner
                .assets
                .get(&asset_id)
                .is_some_and(|a| a.user_id == input.user_id && a.job_id.is_none());
            if !bindable {
                return Err(StoreError::AssetNotBindable { asset_id });
            }
        }

        inner.next_job_id += 1;
        let now = Utc::now();
        let job = Job {
            id: inner.next_job_id,
            user_id: input.user_id.clone(),
            name: input.name.clone(),
            is_public: input.is_public,
            kind: input.kind.as_str().to_string(),
            status_id: JobStatus::Processing.id(),
            prediction_id: None,
            created_at: now,
            updated_at: now,
        };
        inner.jobs.insert(job.id, job.clone());

        if let Some(asset) = asset_id.and_then(|id| inner.assets.get_mut(&id)) {
            asset.job_id = Some(job.id);
            asset.updated_at = now;
        }

        Ok(job)
    }

    async fn find_job(&self, id: DbId) -> Result<Option<Job>, StoreError> {
        Ok(self.lock()?.jobs.get(&id).cloned())
    }

    async fn list_jobs_for_user(&self, user_id: &str) -> Result<Vec<JobSummary>, StoreError> {
        let inner = self.lock()?;
        let mut jobs: Vec<&Job> = inner.jobs.values().filter(|j| j.user_id == user_id).collect();
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        Ok(jobs
            .into_iter()
            .map(|j| JobSummary {
                id: j.id,
                name: j.name.clone(),
                is_public: j.is_public,
                status_id: j.status_id,
                kind: j.kind.clone(),
                created_at: j.created_at,
            })
            .collect())
    }

    async fn update_job(&self, id: DbId, input: &UpdateJob) -> Result<Option<Job>, StoreError> {
        let mut inner = self.lock()?;
        let Some(job) = inner.jobs.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(name) = &input.name {
            job.name = name.clone();
        }
        if let Some(is_public) = input.is_public {
            job.is_public = is_public;
        }
        job.updated_at = Utc::now();
        Ok(Some(job.clone()))
    }

    async fn delete_job(&self, id: DbId) -> Result<bool, StoreError> {
        let mut inner = self.lock()?;
        if inner.jobs.remove(&id).is_none() {
            return Ok(false);
        }
        inner.assets.retain(|_, asset| asset.job_id != Some(id));
        Ok(true)
    }

    async fn set_prediction_id(&self, id: DbId, prediction_id: &str) -> Result<(), StoreError> {
        let mut inner = self.lock()?;
        if let Some(job) = inner.jobs.get_mut(&id) {
            job.prediction_id = Some(prediction_id.to_string());
            job.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn transition_from_processing(
        &self,
        id: DbId,
        next: JobStatus,
    ) -> Result<bool, StoreError> {
        if self.fail_transitions.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("status update rejected".into()));
        }
        let mut inner = self.lock()?;
        match inner.jobs.get_mut(&id) {
            Some(job) if job.status_id == JobStatus::Processing.id() => {
                job.status_id = next.id();
                job.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[async_trait]
impl AssetStore for MemoryStore {
    async fn create_asset(&self, input: &NewAsset) -> Result<Asset, StoreError> {
        if self.fail_asset_inserts.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("asset inserts disabled".into()));
        }
        let mut inner = self.lock()?;

        if inner.assets.values().any(|a| a.object_key == input.object_key) {
            return Err(StoreError::Unavailable(format!(
                "duplicate object key {}",
                input.object_key
            )));
        }
        if let Some(job_id) = input.job_id {
            if !inner.jobs.contains_key(&job_id) {
                return Err(StoreError::Unavailable(format!("job {job_id} does not exist")));
            }
        }

        inner.next_asset_id += 1;
        let now = Utc::now();
        let asset = Asset {
            id: inner.next_asset_id,
            user_id: input.user_id.clone(),
            job_id: input.job_id,
            object_key: input.object_key.clone(),
            mime_type: input.mime_type.clone(),
            role: input.role.as_str().to_string(),
            created_at: now,
            updated_at: now,
        };
        inner.assets.insert(asset.id, asset.clone());
        Ok(asset)
    }

    async fn find_asset(&self, id: DbId) -> Result<Option<Asset>, StoreError> {
        Ok(self.lock()?.assets.get(&id).cloned())
    }

    async fn list_assets_for_job(&self, job_id: DbId) -> Result<Vec<Asset>, StoreError> {
        Ok(self
            .lock()?
            .assets
            .values()
            .filter(|a| a.job_id == Some(job_id))
            .cloned()
            .collect())
    }

    async fn delete_assets(&self, ids: &[DbId]) -> Result<u64, StoreError> {
        let mut inner = self.lock()?;
        let mut removed = 0;
        for id in ids {
            if inner.assets.remove(id).is_some() {
                removed += 1;
            }
        }
        Ok(removed)
    }
}

#[async_trait]
impl QuotaStore for MemoryStore {
    async fn consume_point(&self, key: &str, window: Duration) -> Result<QuotaCounter, StoreError> {
        let mut inner = self.lock()?;
        let now = Utc::now();
        let window = chrono::Duration::from_std(window)
            .map_err(|e| StoreError::Unavailable(format!("invalid quota window: {e}")))?;

        let counter = inner
            .counters
            .entry(key.to_string())
            .or_insert_with(|| QuotaCounter {
                key: key.to_string(),
                points: 0,
                expire: now,
            });

        if counter.is_expired(now) {
            counter.points = 1;
            counter.expire = now + window;
        } else {
            counter.points += 1;
        }
        Ok(counter.clone())
    }

    async fn find_counter(&self, key: &str) -> Result<Option<QuotaCounter>, StoreError> {
        let now = Utc::now();
        Ok(self
            .lock()?
            .counters
            .get(key)
            .filter(|c| !c.is_expired(now))
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use mu2mi_core::asset::AssetRole;
    use mu2mi_core::job::JobKind;

    fn new_job(user: &str) -> NewJob {
        NewJob {
            user_id: user.to_string(),
            name: "track".to_string(),
            is_public: false,
            kind: JobKind::Separate,
        }
    }

    fn upload(user: &str, key: &str) -> NewAsset {
        NewAsset {
            user_id: user.to_string(),
            job_id: None,
            object_key: key.to_string(),
            mime_type: "audio/mpeg".to_string(),
            role: AssetRole::Original,
        }
    }

    #[tokio::test]
    async fn binding_someone_elses_asset_persists_nothing() {
        let store = MemoryStore::new();
        let asset = store.create_asset(&upload("alice", "k1")).await.unwrap();

        let err = store
            .create_job_with_asset(&new_job("mallory"), Some(asset.id))
            .await
            .unwrap_err();

        assert_matches!(err, StoreError::AssetNotBindable { asset_id } if asset_id == asset.id);
        assert_eq!(store.job_count(), 0);
        assert!(store.find_asset(asset.id).await.unwrap().unwrap().job_id.is_none());
    }

    #[tokio::test]
    async fn asset_binds_only_once() {
        let store = MemoryStore::new();
        let asset = store.create_asset(&upload("alice", "k1")).await.unwrap();

        let job = store
            .create_job_with_asset(&new_job("alice"), Some(asset.id))
            .await
            .unwrap();
        assert_eq!(store.find_asset(asset.id).await.unwrap().unwrap().job_id, Some(job.id));

        let second = store.create_job_with_asset(&new_job("alice"), Some(asset.id)).await;
        assert_matches!(second, Err(StoreError::AssetNotBindable { .. }));
        assert_eq!(store.job_count(), 1);
    }

    #[tokio::test]
    async fn transition_applies_once() {
        let store = MemoryStore::new();
        let job = store.create_job_with_asset(&new_job("alice"), None).await.unwrap();

        assert!(store.transition_from_processing(job.id, JobStatus::Failed).await.unwrap());
        assert!(!store.transition_from_processing(job.id, JobStatus::Succeeded).await.unwrap());

        let job = store.find_job(job.id).await.unwrap().unwrap();
        assert_eq!(job.status(), Some(JobStatus::Failed));
    }

    #[tokio::test]
    async fn deleting_job_cascades_to_assets() {
        let store = MemoryStore::new();
        let asset = store.create_asset(&upload("alice", "k1")).await.unwrap();
        let job = store
            .create_job_with_asset(&new_job("alice"), Some(asset.id))
            .await
            .unwrap();

        assert!(store.delete_job(job.id).await.unwrap());
        assert_eq!(store.asset_count(), 0);
        assert!(!store.delete_job(job.id).await.unwrap());
    }

    #[tokio::test]
    async fn quota_window_resets_after_expiry() {
        let store = MemoryStore::new();
        let window = Duration::from_millis(50);

        assert_eq!(store.consume_point("k", window).await.unwrap().points, 1);
        assert_eq!(store.consume_point("k", window).await.unwrap().points, 2);

        tokio::time::sleep(Duration::from_millis(80)).await;
        assert!(store.find_counter("k").await.unwrap().is_none());
        assert_eq!(store.consume_point("k", window).await.unwrap().points, 1);
    }

    #[tokio::test]
    async fn unavailable_store_errors() {
        let store = MemoryStore::new();
        store.set_unavailable(true);
        assert_matches!(
            store.consume_point("k", Duration::from_secs(1)).await,
            Err(StoreError::Unavailable(_))
        );
    }
}
