//! In-process object storage for tests.
//!
//! Presigned URLs are fake `memory://` links that encode method, key and TTL
//! so tests can assert on what was granted.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::DeleteFailures;
use crate::{ObjectStorage, StorageError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub body: Vec<u8>,
    pub content_type: String,
}

#[derive(Default)]
pub struct MemoryStorage {
    objects: Mutex<HashMap<String, StoredObject>>,
    unavailable: AtomicBool,
    undeletable: Mutex<HashSet<String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call fail as if the endpoint were unreachable.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Make deletes of `key` fail while other keys still delete.
    pub fn fail_delete(&self, key: &str) {
        if let Ok(mut keys) = self.undeletable.lock() {
            keys.insert(key.to_string());
        }
    }

    pub fn get(&self, key: &str) -> Option<StoredObject> {
        self.objects.lock().ok()?.get(key).cloned()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.objects.lock().map(|o| o.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check_available(&self) -> Result<(), StorageError> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(StorageError::Unavailable("memory storage offline".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl ObjectStorage for MemoryStorage {
    async fn put_object(
        &self,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
    ) -> Result<(), StorageError> {
        self.check_available()?;
        let mut objects = self
            .objects
            .lock()
            .map_err(|_| StorageError::Unavailable("lock poisoned".into()))?;
        objects.insert(
            key.to_string(),
            StoredObject {
                body,
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }

    async fn presign_upload(
        &self,
        key: &str,
        _content_type: &str,
        ttl: Duration,
    ) -> Result<String, StorageError> {
        self.check_available()?;
        Ok(format!("memory://put/{key}?expires={}", ttl.as_secs()))
    }

    async fn presign_download(&self, key: &str, ttl: Duration) -> Result<String, StorageError> {
        self.check_available()?;
        Ok(format!("memory://get/{key}?expires={}", ttl.as_secs()))
    }

    async fn delete_objects(&self, keys: &[String]) -> Result<(), StorageError> {
        self.check_available()?;
        let mut objects = self
            .objects
            .lock()
            .map_err(|_| StorageError::Unavailable("lock poisoned".into()))?;
        let undeletable = self
            .undeletable
            .lock()
            .map_err(|_| StorageError::Unavailable("lock poisoned".into()))?;

        let mut failures = DeleteFailures::default();
        for key in keys {
            let result = if undeletable.contains(key) {
                Err(StorageError::Request {
                    operation: "delete_object",
                    message: format!("access denied for {key}"),
                })
            } else {
                objects.remove(key);
                Ok(())
            };
            failures.record(key, result);
        }
        failures.finish()
    }

    async fn health_check(&self) -> Result<(), StorageError> {
        self.check_available()
    }
}
