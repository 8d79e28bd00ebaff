/// Errors from talking to the inference provider.
#[derive(Debug, thiserror::Error)]
pub enum ReplicateError {
    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The provider returned a non-2xx status code.
    #[error("Replicate API error ({status}): {body}")]
    ApiError { status: u16, body: String },

    /// `BASE_URL` could not be turned into a callback URL.
    #[error("Invalid callback URL: {0}")]
    InvalidCallbackUrl(String),
}
