pub mod health;
pub mod jobs;

use axum::routing::post;
use axum::Router;

use crate::handlers;
use crate::state::AppState;

/// Build the `/api` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /generate                  submit a render job (POST)
///
/// /jobs                      list
/// /jobs/{id}                 status, delete
/// /jobs/{id}/cancel          cancel (POST)
/// /jobs/{id}/events          live event stream (SSE)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/generate", post(handlers::jobs::submit_job))
        .nest("/jobs", jobs::router())
}
