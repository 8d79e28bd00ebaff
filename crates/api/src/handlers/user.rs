use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/user/credits
///
/// Current quota state without consuming a point.
pub async fn credits(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let quota = state.services.quota.peek(&auth.user_id).await?;
    Ok(Json(DataResponse { data: quota }))
}
