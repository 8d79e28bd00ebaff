use std::time::Duration;

/// Object storage configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Endpoint used for server-side traffic (uploads, deletes, health).
    pub endpoint: String,
    /// Endpoint baked into presigned URLs handed to clients.
    pub public_endpoint: String,
    pub region: String,
    pub access_key: String,
    pub secret_key: String,
    pub bucket: String,
    /// Lifetime of every presigned grant.
    pub presign_ttl: Duration,
}

impl StorageConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                          | Default                   |
    /// |----------------------------------|---------------------------|
    /// | `S3_ENDPOINT`                    | `http://localhost:9000`   |
    /// | `S3_PUBLIC_ENDPOINT`             | value of `S3_ENDPOINT`    |
    /// | `S3_REGION`                      | `us-east-1`               |
    /// | `S3_ACCESS_KEY`                  | `minioadmin`              |
    /// | `S3_SECRET_KEY`                  | `minioadmin`              |
    /// | `S3_BUCKET_NAME`                 | `mu2mi-assets`            |
    /// | `S3_PRESIGNED_URL_EXPIRATION_S`  | `900`                     |
    pub fn from_env() -> Self {
        let endpoint =
            std::env::var("S3_ENDPOINT").unwrap_or_else(|_| "http://localhost:9000".into());
        let public_endpoint = std::env::var("S3_PUBLIC_ENDPOINT").unwrap_or_else(|_| endpoint.clone());

        let presign_secs: u64 = std::env::var("S3_PRESIGNED_URL_EXPIRATION_S")
            .unwrap_or_else(|_| "900".into())
            .parse()
            .expect("S3_PRESIGNED_URL_EXPIRATION_S must be a valid u64");

        Self {
            endpoint,
            public_endpoint,
            region: std::env::var("S3_REGION").unwrap_or_else(|_| "us-east-1".into()),
            access_key: std::env::var("S3_ACCESS_KEY").unwrap_or_else(|_| "minioadmin".into()),
            secret_key: std::env::var("S3_SECRET_KEY").unwrap_or_else(|_| "minioadmin".into()),
            bucket: std::env::var("S3_BUCKET_NAME").unwrap_or_else(|_| "mu2mi-assets".into()),
            presign_ttl: Duration::from_secs(presign_secs),
        }
    }
}
