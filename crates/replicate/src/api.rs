//! REST API client for the Replicate predictions endpoint.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::dispatcher::Predictor;
use crate::error::ReplicateError;

/// HTTP request timeout for a single provider call.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Body of `POST /predictions`.
#[derive(Debug, Clone, Serialize)]
pub struct PredictionRequest {
    pub version: String,
    pub input: serde_json::Value,
    pub webhook: String,
    /// Which lifecycle events trigger the webhook. Only `completed` is used.
    pub webhook_events_filter: Vec<String>,
}

/// The subset of a prediction object this service reads.
#[derive(Debug, Clone, Deserialize)]
pub struct Prediction {
    pub id: String,
    pub status: String,
}

/// HTTP client for the provider API.
pub struct ReplicateApi {
    client: reqwest::Client,
    api_url: String,
    api_token: String,
}

impl ReplicateApi {
    /// Create a client.
    ///
    /// * `api_url` - Base URL, e.g. `https://api.replicate.com/v1`.
    pub fn new(api_url: String, api_token: String) -> Result<Self, ReplicateError> {
        let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self::with_client(client, api_url, api_token))
    }

    /// Create a client reusing an existing [`reqwest::Client`].
    pub fn with_client(client: reqwest::Client, api_url: String, api_token: String) -> Self {
        Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
            api_token,
        }
    }

    /// Create a prediction. Returns as soon as the provider has queued it.
    pub async fn create(&self, request: &PredictionRequest) -> Result<Prediction, ReplicateError> {
        let response = self
            .client
            .post(format!("{}/predictions", self.api_url))
            .bearer_auth(&self.api_token)
            .json(request)
            .send()
            .await?;

        Self::parse_response(response).await
    }

    // ---- private helpers ----

    /// Ensure the response has a success status code, turning anything else
    /// into [`ReplicateError::ApiError`] with the body text.
    async fn ensure_success(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, ReplicateError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(ReplicateError::ApiError {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ReplicateError> {
        let response = Self::ensure_success(response).await?;
        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl Predictor for ReplicateApi {
    async fn create_prediction(
        &self,
        request: &PredictionRequest,
    ) -> Result<Prediction, ReplicateError> {
        self.create(request).await
    }
}
