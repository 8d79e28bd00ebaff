//! Handlers for the `/assets` resource.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use mu2mi_core::asset::UploadRequest;

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// POST /api/v1/assets/presigned-upload
///
/// Reserve an object key for the caller and return a time-limited PUT URL
/// together with the new asset id. The upload itself is not confirmed.
pub async fn presigned_upload(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<UploadRequest>,
) -> AppResult<impl IntoResponse> {
    let upload = state
        .services
        .registry
        .create_pending_upload(&auth.user_id, &input)
        .await?;

    Ok((StatusCode::CREATED, Json(DataResponse { data: upload })))
}
