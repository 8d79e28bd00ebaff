use std::sync::Arc;

use mu2mi_pipeline::Services;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc`).
#[derive(Clone)]
pub struct AppState {
    /// Quota, registry, submission, reconciliation and job queries.
    pub services: Arc<Services>,
    pub config: Arc<ServerConfig>,
}
