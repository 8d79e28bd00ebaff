//! Object storage capability and presigned access grants.
//!
//! The service layer only sees [`ObjectStorage`]. [`S3Storage`] talks to any
//! S3-compatible endpoint; [`MemoryStorage`] keeps objects in process memory.

pub mod config;
pub mod error;
pub mod memory;
pub mod s3;

use std::time::Duration;

use async_trait::async_trait;

pub use config::StorageConfig;
pub use error::StorageError;
pub use memory::MemoryStorage;
pub use s3::S3Storage;

#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Upload bytes under `key`. Keys are never overwritten by callers.
    async fn put_object(
        &self,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
    ) -> Result<(), StorageError>;

    /// Time-limited PUT grant for exactly `key`.
    async fn presign_upload(
        &self,
        key: &str,
        content_type: &str,
        ttl: Duration,
    ) -> Result<String, StorageError>;

    /// Time-limited GET grant for exactly `key`.
    async fn presign_download(&self, key: &str, ttl: Duration) -> Result<String, StorageError>;

    async fn delete_objects(&self, keys: &[String]) -> Result<(), StorageError>;

    async fn health_check(&self) -> Result<(), StorageError>;
}
