//! Asset registry: uploaded and generated objects, their rows, and the
//! presigned grants that expose them.
//!
//! Object keys are random and never reused. URLs are minted per call and
//! never stored.

use std::sync::Arc;
use std::time::Duration;

use mu2mi_core::asset::{
    essence_mime_type, generate_object_key, url_extension, AssetRole, UploadRequest,
    DEFAULT_MIME_TYPE,
};
use mu2mi_core::types::DbId;
use mu2mi_db::models::asset::{Asset, NewAsset};
use mu2mi_db::Store;
use mu2mi_storage::ObjectStorage;
use serde::Serialize;

use crate::error::PipelineError;
use crate::fetch::ArtifactFetcher;

/// Response to a presigned upload request.
#[derive(Debug, Clone, Serialize)]
pub struct PendingUpload {
    pub asset_id: DbId,
    pub url: String,
}

/// One asset as shown to a client, with a freshly minted download URL.
#[derive(Debug, Clone, Serialize)]
pub struct AssetView {
    pub asset_id: DbId,
    pub role: String,
    pub mime_type: String,
    pub url: String,
}

/// Where the bytes of a result artifact come from.
#[derive(Debug, Clone)]
pub enum ArtifactSource {
    /// A provider URL to download.
    Url(String),
    /// Bytes produced in-process.
    Inline {
        body: Vec<u8>,
        mime_type: String,
        extension: String,
    },
}

pub struct AssetRegistry {
    store: Arc<dyn Store>,
    storage: Arc<dyn ObjectStorage>,
    fetcher: Arc<dyn ArtifactFetcher>,
    presign_ttl: Duration,
}

impl AssetRegistry {
    pub fn new(
        store: Arc<dyn Store>,
        storage: Arc<dyn ObjectStorage>,
        fetcher: Arc<dyn ArtifactFetcher>,
        presign_ttl: Duration,
    ) -> Self {
        Self {
            store,
            storage,
            fetcher,
            presign_ttl,
        }
    }

    /// Allocate a key, record an unbound `original` asset and grant a PUT
    /// on exactly that key. The upload itself is not confirmed.
    pub async fn create_pending_upload(
        &self,
        user_id: &str,
        request: &UploadRequest,
    ) -> Result<PendingUpload, PipelineError> {
        let extension = request.validate_upload()?;
        let object_key = generate_object_key(&extension);

        let url = self
            .storage
            .presign_upload(&object_key, &request.mime_type, self.presign_ttl)
            .await?;

        let asset = self
            .store
            .create_asset(&NewAsset {
                user_id: user_id.to_string(),
                job_id: None,
                object_key,
                mime_type: request.mime_type.clone(),
                role: AssetRole::Original,
            })
            .await?;

        tracing::info!(asset_id = asset.id, user_id, "Pending upload created");
        Ok(PendingUpload {
            asset_id: asset.id,
            url,
        })
    }

    pub async fn download_url(&self, object_key: &str) -> Result<String, PipelineError> {
        Ok(self
            .storage
            .presign_download(object_key, self.presign_ttl)
            .await?)
    }

    /// Every asset bound to `job_id`, each with a fresh download URL.
    pub async fn list_for_job(&self, job_id: DbId) -> Result<Vec<AssetView>, PipelineError> {
        let assets = self.store.list_assets_for_job(job_id).await?;

        let mut views = Vec::with_capacity(assets.len());
        for asset in assets {
            let url = self.download_url(&asset.object_key).await?;
            views.push(AssetView {
                asset_id: asset.id,
                role: asset.role,
                mime_type: asset.mime_type,
                url,
            });
        }
        Ok(views)
    }

    /// Store one result artifact and record it against `job_id`.
    ///
    /// If the row cannot be inserted after the upload, the object is deleted
    /// so no bytes are left without a pointer.
    pub async fn persist_result(
        &self,
        job_id: DbId,
        user_id: &str,
        role: AssetRole,
        source: ArtifactSource,
    ) -> Result<Asset, PipelineError> {
        let (body, mime_type, extension) = match source {
            ArtifactSource::Url(url) => {
                let fetched = self.fetcher.fetch(&url).await?;
                let mime_type = fetched
                    .content_type
                    .as_deref()
                    .map(essence_mime_type)
                    .unwrap_or_else(|| DEFAULT_MIME_TYPE.to_string());
                (fetched.body, mime_type, url_extension(&url))
            }
            ArtifactSource::Inline {
                body,
                mime_type,
                extension,
            } => (body, mime_type, extension),
        };

        let object_key = generate_object_key(&extension);
        self.storage
            .put_object(&object_key, body, &mime_type)
            .await?;

        let inserted = self
            .store
            .create_asset(&NewAsset {
                user_id: user_id.to_string(),
                job_id: Some(job_id),
                object_key: object_key.clone(),
                mime_type,
                role,
            })
            .await;

        match inserted {
            Ok(asset) => Ok(asset),
            Err(e) => {
                if let Err(cleanup) = self.storage.delete_objects(&[object_key.clone()]).await {
                    tracing::warn!(
                        job_id,
                        object_key = %object_key,
                        error = %cleanup,
                        "Failed to delete orphaned object",
                    );
                }
                Err(e.into())
            }
        }
    }

    /// Remove asset rows and then their objects. Object deletion failures are
    /// logged, not returned.
    pub async fn remove(&self, assets: &[Asset]) -> Result<(), PipelineError> {
        if assets.is_empty() {
            return Ok(());
        }

        let ids: Vec<DbId> = assets.iter().map(|a| a.id).collect();
        self.store.delete_assets(&ids).await?;
        self.delete_objects(assets).await;
        Ok(())
    }

    /// Best-effort deletion of the objects behind `assets`.
    pub async fn delete_objects(&self, assets: &[Asset]) {
        let keys: Vec<String> = assets.iter().map(|a| a.object_key.clone()).collect();
        if keys.is_empty() {
            return;
        }
        if let Err(e) = self.storage.delete_objects(&keys).await {
            tracing::warn!(count = keys.len(), error = %e, "Failed to delete stored objects");
        }
    }
}
