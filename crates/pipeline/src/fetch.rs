//! Downloading provider artifacts before they are re-uploaded to storage.

use std::time::Duration;

use async_trait::async_trait;

/// HTTP request timeout for a single artifact download.
const FETCH_TIMEOUT: Duration = Duration::from_secs(120);

/// Maximum redirects followed for one artifact URL.
const MAX_REDIRECTS: usize = 10;

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Artifact URL returned HTTP {0}")]
    HttpStatus(u16),
}

/// Bytes of one remote artifact.
#[derive(Debug, Clone)]
pub struct FetchedArtifact {
    pub body: Vec<u8>,
    pub content_type: Option<String>,
}

#[async_trait]
pub trait ArtifactFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FetchedArtifact, FetchError>;
}

/// [`ArtifactFetcher`] over `reqwest`. Follows redirects; any non-2xx final
/// response is an error.
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ArtifactFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedArtifact, FetchError> {
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus(status.as_u16()));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.bytes().await?.to_vec();

        Ok(FetchedArtifact { body, content_type })
    }
}
