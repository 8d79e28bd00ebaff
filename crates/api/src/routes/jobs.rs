//! Route definitions for the `/jobs` resource.

use axum::routing::{get, post};
use axum::Router;
use mu2mi_core::params::{
    AnalysisParams, GenerationParams, LyricsParams, MidiParams, SeparationParams,
};

use crate::handlers::jobs;
use crate::state::AppState;

/// Routes mounted at `/jobs`.
///
/// ```text
/// GET    /                     -> list_jobs
/// POST   /generate             -> submit::<GenerationParams>
/// POST   /separate             -> submit::<SeparationParams>
/// POST   /analyze              -> submit::<AnalysisParams>
/// POST   /transcribe-midi      -> submit::<MidiParams>
/// POST   /transcribe-lyrics    -> submit::<LyricsParams>
/// GET    /{id}                 -> get_job
/// PATCH  /{id}                 -> update_job
/// DELETE /{id}                 -> delete_job
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(jobs::list_jobs))
        .route("/generate", post(jobs::submit::<GenerationParams>))
        .route("/separate", post(jobs::submit::<SeparationParams>))
        .route("/analyze", post(jobs::submit::<AnalysisParams>))
        .route("/transcribe-midi", post(jobs::submit::<MidiParams>))
        .route("/transcribe-lyrics", post(jobs::submit::<LyricsParams>))
        .route(
            "/{id}",
            get(jobs::get_job)
                .patch(jobs::update_job)
                .delete(jobs::delete_job),
        )
}
