use std::sync::Arc;
use std::time::Duration;

use mu2mi_core::quota::QuotaPolicy;
use mu2mi_db::Store;
use mu2mi_replicate::{Dispatcher, ModelVersions, Predictor, WebhookVerifier};
use mu2mi_storage::ObjectStorage;
use serde::Serialize;

use crate::fetch::ArtifactFetcher;
use crate::jobs::JobQueries;
use crate::quota::QuotaLedger;
use crate::reconciler::WebhookReconciler;
use crate::registry::AssetRegistry;
use crate::submission::JobSubmitter;

/// External capabilities the services are built from.
pub struct ServiceDeps {
    pub store: Arc<dyn Store>,
    pub storage: Arc<dyn ObjectStorage>,
    pub predictor: Arc<dyn Predictor>,
    pub fetcher: Arc<dyn ArtifactFetcher>,
    pub quota_policy: QuotaPolicy,
    pub quota_enabled: bool,
    pub presign_ttl: Duration,
    /// Public origin used in provider callback URLs.
    pub base_url: String,
    pub models: ModelVersions,
    pub verifier: WebhookVerifier,
}

/// Reachability of the two backing services.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct HealthReport {
    pub database: bool,
    pub storage: bool,
}

impl HealthReport {
    pub fn is_healthy(&self) -> bool {
        self.database && self.storage
    }
}

/// The service layer, wired once at startup and shared by handlers.
pub struct Services {
    pub store: Arc<dyn Store>,
    pub storage: Arc<dyn ObjectStorage>,
    pub quota: Arc<QuotaLedger>,
    pub registry: Arc<AssetRegistry>,
    pub submitter: JobSubmitter,
    pub reconciler: WebhookReconciler,
    pub jobs: JobQueries,
}

impl Services {
    pub fn new(deps: ServiceDeps) -> Self {
        let ServiceDeps {
            store,
            storage,
            predictor,
            fetcher,
            quota_policy,
            quota_enabled,
            presign_ttl,
            base_url,
            models,
            verifier,
        } = deps;

        let quota = Arc::new(QuotaLedger::new(store.clone(), quota_policy, quota_enabled));
        let registry = Arc::new(AssetRegistry::new(
            store.clone(),
            storage.clone(),
            fetcher,
            presign_ttl,
        ));
        let dispatcher = Arc::new(Dispatcher::new(predictor, &base_url, models));

        Self {
            submitter: JobSubmitter::new(store.clone(), quota.clone(), registry.clone(), dispatcher),
            reconciler: WebhookReconciler::new(store.clone(), registry.clone(), verifier),
            jobs: JobQueries::new(store.clone(), registry.clone()),
            store,
            storage,
            quota,
            registry,
        }
    }

    pub async fn health(&self) -> HealthReport {
        let (database, storage) = futures::join!(self.store.ping(), self.storage.health_check());
        if let Err(e) = &database {
            tracing::warn!(error = %e, "Database health check failed");
        }
        if let Err(e) = &storage {
            tracing::warn!(error = %e, "Storage health check failed");
        }
        HealthReport {
            database: database.is_ok(),
            storage: storage.is_ok(),
        }
    }
}
