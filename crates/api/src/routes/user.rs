use axum::routing::get;
use axum::Router;

use crate::handlers::user;
use crate::state::AppState;

/// Routes mounted at `/user`.
pub fn router() -> Router<AppState> {
    Router::new().route("/credits", get(user::credits))
}
