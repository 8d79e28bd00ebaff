//! Client side of the external inference provider.
//!
//! - [`api`]: REST client for prediction creation.
//! - [`dispatcher`]: turns a job into a prediction with a callback URL.
//! - [`webhook`]: verifies and decodes completion callbacks.

pub mod api;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod webhook;

pub use api::{Prediction, PredictionRequest, ReplicateApi};
pub use config::{ModelVersions, ReplicateConfig};
pub use dispatcher::{Dispatcher, Predictor};
pub use error::ReplicateError;
pub use webhook::{SignatureError, WebhookVerifier};
