use axum::routing::post;
use axum::Router;

use crate::handlers::assets;
use crate::state::AppState;

/// Routes mounted at `/assets`.
pub fn router() -> Router<AppState> {
    Router::new().route("/presigned-upload", post(assets::presigned_upload))
}
