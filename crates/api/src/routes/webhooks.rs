use axum::routing::post;
use axum::Router;

use crate::handlers::webhooks;
use crate::state::AppState;

/// Routes mounted at `/webhooks`. Authenticated by signature, not session.
pub fn router() -> Router<AppState> {
    Router::new().route("/replicate/{kind}", post(webhooks::replicate))
}
