use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mu2mi_api::config::ServerConfig;
use mu2mi_api::router::build_app_router;
use mu2mi_api::state::AppState;
use mu2mi_db::PgStore;
use mu2mi_pipeline::{HttpFetcher, ServiceDeps, Services};
use mu2mi_replicate::{ReplicateApi, ReplicateConfig, WebhookVerifier};
use mu2mi_storage::{S3Storage, StorageConfig};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Configuration ---
    let config = ServerConfig::from_env();

    // --- Tracing ---
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        "mu2mi_api=debug,mu2mi_pipeline=debug,tower_http=debug".into()
    });
    let registry = tracing_subscriber::registry().with(filter);
    if config.log_json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    tracing::info!(
        host = %config.host,
        port = %config.port,
        quota_enabled = config.quota.enabled,
        "Loaded server configuration",
    );

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = mu2mi_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    mu2mi_db::health_check(&pool)
        .await
        .expect("Database health check failed");

    mu2mi_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    // --- Object storage ---
    let storage_config = StorageConfig::from_env();
    let storage = S3Storage::connect(&storage_config).await;
    tracing::info!(bucket = %storage_config.bucket, "Object storage client created");

    // --- Provider ---
    let replicate_config = ReplicateConfig::from_env();
    let predictor = ReplicateApi::new(
        replicate_config.api_url.clone(),
        replicate_config.api_token.clone(),
    )
    .expect("Failed to build provider client");
    let verifier = WebhookVerifier::new(&replicate_config.webhook_secret)
        .expect("REPLICATE_WEBHOOK_SECRET must be a valid signing secret");
    let fetcher = HttpFetcher::new().expect("Failed to build artifact fetcher");

    // --- Services ---
    let services = Services::new(ServiceDeps {
        store: Arc::new(PgStore::new(pool.clone())),
        storage: Arc::new(storage),
        predictor: Arc::new(predictor),
        fetcher: Arc::new(fetcher),
        quota_policy: config.quota.policy(),
        quota_enabled: config.quota.enabled,
        presign_ttl: storage_config.presign_ttl,
        base_url: replicate_config.base_url.clone(),
        models: replicate_config.models.clone(),
        verifier,
    });

    let state = AppState {
        services: Arc::new(services),
        config: Arc::new(config.clone()),
    };
    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, base_url = %replicate_config.base_url, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, closing database pool");
    let drained = tokio::time::timeout(
        Duration::from_secs(config.shutdown_timeout_secs),
        pool.close(),
    )
    .await;
    if drained.is_err() {
        tracing::warn!("Database pool did not close before the shutdown timeout");
    }

    tracing::info!("Graceful shutdown complete");
}

/// Wait for SIGINT (Ctrl-C) or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
