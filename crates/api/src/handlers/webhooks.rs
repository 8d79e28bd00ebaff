//! Provider completion callbacks.
//!
//! Only signature failures and malformed deliveries are refused. Everything
//! past those checks is acknowledged with 200, including internal errors,
//! so the provider never retries into a half-applied state.

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, Uri};
use axum::response::IntoResponse;
use axum::Json;
use mu2mi_core::error::CoreError;
use mu2mi_pipeline::{WebhookDelivery, WebhookRejection};
use mu2mi_replicate::webhook::{
    RawCallbackQuery, SignedHeaders, WEBHOOK_ID_HEADER, WEBHOOK_SIGNATURE_HEADER,
    WEBHOOK_TIMESTAMP_HEADER,
};

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

/// POST /api/v1/webhooks/replicate/{kind}?jobId=..&userId=..
pub async fn replicate(
    State(state): State<AppState>,
    Path(kind): Path<String>,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<impl IntoResponse> {
    let Query(query) = Query::<RawCallbackQuery>::try_from_uri(&uri)
        .map_err(|e| AppError::BadRequest(format!("Invalid callback query: {e}")))?;

    let delivery = WebhookDelivery {
        kind: &kind,
        query: &query,
        headers: SignedHeaders {
            id: header_str(&headers, WEBHOOK_ID_HEADER),
            timestamp: header_str(&headers, WEBHOOK_TIMESTAMP_HEADER),
            signature: header_str(&headers, WEBHOOK_SIGNATURE_HEADER),
        },
        body: &body,
    };

    match state.services.reconciler.handle(delivery).await {
        Ok(outcome) => {
            tracing::debug!(kind = %kind, outcome = ?outcome, "Webhook handled");
            Ok(Json(DataResponse { data: outcome }))
        }
        Err(WebhookRejection::Unauthenticated(e)) => {
            tracing::warn!(kind = %kind, error = %e, "Webhook signature rejected");
            Err(AppError::Core(CoreError::Unauthenticated(
                "Invalid webhook signature".into(),
            )))
        }
        Err(WebhookRejection::BadRequest(msg)) => {
            tracing::warn!(kind = %kind, error = %msg, "Malformed webhook");
            Err(AppError::BadRequest(msg))
        }
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}
