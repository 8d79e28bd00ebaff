//! Job lifecycle services: quota, submission, completion callbacks and the
//! assets they produce.

pub mod error;
pub mod fetch;
pub mod jobs;
pub mod quota;
pub mod reconciler;
pub mod registry;
pub mod services;
pub mod submission;

pub use error::PipelineError;
pub use fetch::{ArtifactFetcher, FetchError, FetchedArtifact, HttpFetcher};
pub use jobs::{JobListItem, JobQueries, JobView};
pub use quota::QuotaLedger;
pub use reconciler::{
    ArtifactOutcome, ArtifactResult, ReconcileOutcome, WebhookDelivery, WebhookReconciler,
    WebhookRejection,
};
pub use registry::{ArtifactSource, AssetRegistry, AssetView, PendingUpload};
pub use services::{HealthReport, ServiceDeps, Services};
pub use submission::{JobSubmitter, Submission};
