pub mod assets;
pub mod health;
pub mod jobs;
pub mod user;
pub mod webhooks;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /assets/presigned-upload                   presigned PUT grant (POST)
///
/// /jobs                                      list own jobs (GET)
/// /jobs/generate                             submit generation (POST)
/// /jobs/separate                             submit separation (POST)
/// /jobs/analyze                              submit analysis (POST)
/// /jobs/transcribe-midi                      submit MIDI transcription (POST)
/// /jobs/transcribe-lyrics                    submit lyrics transcription (POST)
/// /jobs/{id}                                 get, update, delete
///
/// /user/credits                              quota state (GET)
///
/// /webhooks/replicate/{kind}                 provider callback (POST, signed)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/assets", assets::router())
        .nest("/jobs", jobs::router())
        .nest("/user", user::router())
        .nest("/webhooks", webhooks::router())
}
