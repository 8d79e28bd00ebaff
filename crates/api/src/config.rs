use std::time::Duration;

use mu2mi_core::quota::{QuotaPolicy, DEFAULT_QUOTA_POINTS, DEFAULT_QUOTA_WINDOW};

use crate::auth::jwt::SessionConfig;

/// Server configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development.
/// In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// How long to wait for in-flight requests after a shutdown signal.
    pub shutdown_timeout_secs: u64,
    /// Emit JSON log lines instead of the human-readable format.
    pub log_json: bool,
    pub session: SessionConfig,
    pub quota: QuotaConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                    |
    /// |------------------------|----------------------------|
    /// | `HOST`                 | `0.0.0.0`                  |
    /// | `PORT`                 | `3000`                     |
    /// | `CORS_ORIGINS`         | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS` | `30`                       |
    /// | `SHUTDOWN_TIMEOUT_SECS`| `30`                       |
    /// | `LOG_FORMAT`           | `text` (`json` for JSON)   |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let shutdown_timeout_secs: u64 = std::env::var("SHUTDOWN_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("SHUTDOWN_TIMEOUT_SECS must be a valid u64");

        let log_json = std::env::var("LOG_FORMAT")
            .map(|v| v.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            shutdown_timeout_secs,
            log_json,
            session: SessionConfig::from_env(),
            quota: QuotaConfig::from_env(),
        }
    }
}

/// Per-user job quota settings.
#[derive(Debug, Clone)]
pub struct QuotaConfig {
    pub enabled: bool,
    pub points: i32,
    pub window_secs: u64,
}

impl QuotaConfig {
    /// | Env Var                  | Default |
    /// |--------------------------|---------|
    /// | `ENABLE_RATE_LIMIT`      | `false` |
    /// | `RATE_LIMIT_POINTS`      | `10`    |
    /// | `RATE_LIMIT_WINDOW_SECS` | `86400` |
    pub fn from_env() -> Self {
        let enabled = std::env::var("ENABLE_RATE_LIMIT")
            .map(|v| matches!(v.trim(), "true" | "1"))
            .unwrap_or(false);

        let points: i32 = std::env::var("RATE_LIMIT_POINTS")
            .unwrap_or_else(|_| DEFAULT_QUOTA_POINTS.to_string())
            .parse()
            .expect("RATE_LIMIT_POINTS must be a valid i32");
        assert!(points > 0, "RATE_LIMIT_POINTS must be positive");

        let window_secs: u64 = std::env::var("RATE_LIMIT_WINDOW_SECS")
            .unwrap_or_else(|_| DEFAULT_QUOTA_WINDOW.as_secs().to_string())
            .parse()
            .expect("RATE_LIMIT_WINDOW_SECS must be a valid u64");
        assert!(window_secs > 0, "RATE_LIMIT_WINDOW_SECS must be positive");

        Self {
            enabled,
            points,
            window_secs,
        }
    }

    pub fn policy(&self) -> QuotaPolicy {
        QuotaPolicy {
            points: self.points,
            window: Duration::from_secs(self.window_secs),
        }
    }
}
