//! Handlers for `/generate` and the `/jobs` resource.
//!
//! Every handler returns as soon as the orchestrator call it wraps has
//! returned; none waits on job execution.

use std::convert::Infallible;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, Sse};
use axum::response::IntoResponse;
use axum::Json;
use futures::{Stream, StreamExt};
use serde::Serialize;
use songreel_core::error::CoreError;
use songreel_core::job::JobRecord;
use songreel_core::payload::JobPayload;
use songreel_core::status::JobState;
use songreel_core::types::JobId;
use songreel_store::JobListQuery;

use crate::error::{AppError, AppResult};
use crate::response::{DataResponse, OkResponse};
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

/// Body of a successful submission.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponse {
    pub job_id: JobId,
}

/// Client-facing view of one job.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStatusView {
    pub job_id: JobId,
    pub status: JobState,
    pub progress: u8,
    /// The submitted payload.
    pub data: JobPayload,
    pub result: Option<serde_json::Value>,
    pub failed_reason: Option<String>,
}

impl From<JobRecord> for JobStatusView {
    fn from(record: JobRecord) -> Self {
        Self {
            job_id: record.id,
            status: record.state,
            progress: record.progress,
            data: record.payload,
            result: record.result,
            failed_reason: record.failure_reason,
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn parse_job_id(raw: &str) -> AppResult<JobId> {
    raw.parse()
        .map_err(|_| AppError::BadRequest(format!("Invalid job id: {raw}")))
}

// ---------------------------------------------------------------------------
// Submit
// ---------------------------------------------------------------------------

/// POST /api/generate
///
/// Validate and queue a render job. Returns 201 with the new job id.
/// A body that does not deserialize into a payload is a validation error.
pub async fn submit_job(
    State(state): State<AppState>,
    payload: Result<Json<JobPayload>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let Json(payload) = payload.map_err(|rejection| {
        tracing::debug!(error = %rejection.body_text(), "Rejected job payload");
        CoreError::Validation(rejection.body_text())
    })?;
    let job_id = state.orchestrator.submit(payload)?;
    Ok((StatusCode::CREATED, Json(SubmitResponse { job_id })))
}

// ---------------------------------------------------------------------------
// Query
// ---------------------------------------------------------------------------

/// GET /api/jobs
///
/// Jobs in submission order. Supports `state`, `limit` and `offset`.
pub async fn list_jobs(
    State(state): State<AppState>,
    Query(params): Query<JobListQuery>,
) -> AppResult<impl IntoResponse> {
    let jobs: Vec<JobStatusView> = state
        .orchestrator
        .list(&params)
        .into_iter()
        .map(JobStatusView::from)
        .collect();
    Ok(Json(DataResponse { data: jobs }))
}

/// GET /api/jobs/{id}
pub async fn get_job(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let job_id = parse_job_id(&id)?;
    let record = state.orchestrator.status(job_id)?;
    Ok(Json(JobStatusView::from(record)))
}

// ---------------------------------------------------------------------------
// Actions
// ---------------------------------------------------------------------------

/// POST /api/jobs/{id}/cancel
///
/// 409 once the job has finished.
pub async fn cancel_job(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let job_id = parse_job_id(&id)?;
    state.orchestrator.cancel(job_id)?;
    Ok(Json(OkResponse::new()))
}

/// DELETE /api/jobs/{id}
///
/// 409 while the job is running.
pub async fn delete_job(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    let job_id = parse_job_id(&id)?;
    state.orchestrator.remove(job_id)?;
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// GET /api/jobs/{id}/events
///
/// Server-sent event stream for one job. Each job event becomes a named SSE
/// event whose data is the event's JSON body. The stream ends after the
/// terminal event; a client disconnect drops the subscription.
pub async fn job_events(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    let job_id = parse_job_id(&id)?;
    let subscription = state.orchestrator.subscribe(job_id);
    tracing::debug!(job_id = %job_id, "Event stream opened");

    let stream = subscription.map(|event| {
        Ok(Event::default()
            .event(event.name())
            .data(event.data().to_string()))
    });
    Ok(Sse::new(stream))
}
