use mu2mi_core::error::CoreError;
use mu2mi_db::StoreError;
use mu2mi_replicate::ReplicateError;
use mu2mi_storage::StorageError;

use crate::fetch::FetchError;

/// Errors surfaced by the service layer.
///
/// Domain outcomes (validation, authorization, quota) arrive as
/// [`CoreError`]; everything else is an infrastructure failure.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Provider error: {0}")]
    Provider(#[from] ReplicateError),

    #[error("Artifact fetch error: {0}")]
    Fetch(#[from] FetchError),
}
