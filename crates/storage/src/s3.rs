//! S3-compatible backend (AWS, MinIO, R2).
//!
//! Two clients share credentials: `internal` is used for server-to-store
//! traffic, `public` only signs URLs so their host is reachable by clients.

use std::time::Duration;

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_credential_types::Credentials;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::Client;

use crate::error::DeleteFailures;
use crate::{ObjectStorage, StorageConfig, StorageError};

#[derive(Clone)]
pub struct S3Storage {
    internal: Client,
    public: Client,
    bucket: String,
}

impl S3Storage {
    pub async fn connect(config: &StorageConfig) -> Self {
        let internal = build_client(config, &config.endpoint).await;
        let public = build_client(config, &config.public_endpoint).await;

        tracing::info!(
            endpoint = %config.endpoint,
            public_endpoint = %config.public_endpoint,
            bucket = %config.bucket,
            "Object storage configured",
        );

        Self {
            internal,
            public,
            bucket: config.bucket.clone(),
        }
    }
}

async fn build_client(config: &StorageConfig, endpoint: &str) -> Client {
    let credentials = Credentials::new(
        config.access_key.clone(),
        config.secret_key.clone(),
        None,
        None,
        "mu2mi-env",
    );

    let sdk_config = aws_config::defaults(BehaviorVersion::latest())
        .region(Region::new(config.region.clone()))
        .endpoint_url(endpoint)
        .credentials_provider(credentials)
        .load()
        .await;

    let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
        .force_path_style(true)
        .build();

    Client::from_conf(s3_config)
}

fn presigning(ttl: Duration) -> Result<PresigningConfig, StorageError> {
    PresigningConfig::expires_in(ttl).map_err(|e| StorageError::Presign(e.to_string()))
}

#[async_trait]
impl ObjectStorage for S3Storage {
    async fn put_object(
        &self,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
    ) -> Result<(), StorageError> {
        self.internal
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| StorageError::request("put_object", e))?;
        Ok(())
    }

    async fn presign_upload(
        &self,
        key: &str,
        content_type: &str,
        ttl: Duration,
    ) -> Result<String, StorageError> {
        let request = self
            .public
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .presigned(presigning(ttl)?)
            .await
            .map_err(|e| StorageError::request("presign_put_object", e))?;
        Ok(request.uri().to_string())
    }

    async fn presign_download(&self, key: &str, ttl: Duration) -> Result<String, StorageError> {
        let request = self
            .public
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(presigning(ttl)?)
            .await
            .map_err(|e| StorageError::request("presign_get_object", e))?;
        Ok(request.uri().to_string())
    }

    async fn delete_objects(&self, keys: &[String]) -> Result<(), StorageError> {
        let mut failures = DeleteFailures::default();
        for key in keys {
            let result = self
                .internal
                .delete_object()
                .bucket(&self.bucket)
                .key(key)
                .send()
                .await
                .map(|_| ())
                .map_err(|e| StorageError::request("delete_object", e));
            failures.record(key, result);
        }
        failures.finish()
    }

    async fn health_check(&self) -> Result<(), StorageError> {
        self.internal
            .head_bucket()
            .bucket(&self.bucket)
            .send()
            .await
            .map_err(|e| StorageError::request("head_bucket", e))?;
        Ok(())
    }
}
