//! Route definitions for the `/jobs` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::jobs;
use crate::state::AppState;

/// Routes mounted at `/jobs`.
///
/// ```text
/// GET    /                -> list_jobs
/// GET    /{id}            -> get_job
/// DELETE /{id}            -> delete_job
/// POST   /{id}/cancel     -> cancel_job
/// GET    /{id}/events     -> job_events
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(jobs::list_jobs))
        .route("/{id}", get(jobs::get_job).delete(jobs::delete_job))
        .route("/{id}/cancel", post(jobs::cancel_job))
        .route("/{id}/events", get(jobs::job_events))
}
