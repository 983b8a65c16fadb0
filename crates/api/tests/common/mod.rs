#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use songreel_api::app::build_app;
use songreel_api::config::ServerConfig;
use songreel_api::state::AppState;
use songreel_core::status::JobState;
use songreel_core::types::JobId;
use songreel_pipeline::{RendererConfig, SimulatedRenderer};
use songreel_worker::{EngineConfig, JobOrchestrator};

/// Upper bound on any single wait in these tests.
pub const WAIT: Duration = Duration::from_secs(5);

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
    }
}

/// Build the full application router over a fresh job engine whose
/// simulated renderer does not sleep between segments.
///
/// Returns the orchestrator too so tests can wait on job state.
pub fn build_test_app() -> (Router, Arc<JobOrchestrator>) {
    let engine = EngineConfig {
        worker_count: 2,
        default_segments: 4,
        heartbeat_interval: Duration::from_secs(3600),
        shutdown_timeout: Duration::from_secs(1),
    };
    let renderer = SimulatedRenderer::new(RendererConfig {
        segment_delay: Duration::ZERO,
        public_base_url: "http://localhost:5000".to_string(),
    });
    let orchestrator = JobOrchestrator::start(engine, Arc::new(renderer));

    let state = AppState {
        config: Arc::new(test_config()),
        orchestrator: Arc::clone(&orchestrator),
    };
    (build_app(state), orchestrator)
}

pub async fn get(app: &Router, uri: &str) -> Response<Body> {
    send(app, Method::GET, uri, Body::empty()).await
}

pub async fn delete(app: &Router, uri: &str) -> Response<Body> {
    send(app, Method::DELETE, uri, Body::empty()).await
}

pub async fn post_json(app: &Router, uri: &str, body: Value) -> Response<Body> {
    send(app, Method::POST, uri, Body::from(body.to_string())).await
}

async fn send(app: &Router, method: Method, uri: &str, body: Body) -> Response<Body> {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(body)
        .unwrap();
    app.clone().oneshot(request).await.unwrap()
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec()
}

pub async fn body_json(response: Response<Body>) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

/// Submit a visualizer job and return its id.
pub async fn submit(app: &Router, segments: i64) -> String {
    let response = post_json(
        app,
        "/api/generate",
        serde_json::json!({
            "visualMode": "visualizer",
            "audioRef": "uploads/track.mp3",
            "segments": segments,
        }),
    )
    .await;
    let json = body_json(response).await;
    json["jobId"].as_str().unwrap().to_string()
}

/// Poll the engine until the job reaches `state`.
pub async fn wait_state(orchestrator: &JobOrchestrator, job_id: &str, state: JobState) {
    let job_id: JobId = job_id.parse().unwrap();
    tokio::time::timeout(WAIT, async {
        while !matches!(orchestrator.status(job_id), Ok(record) if record.state == state) {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap_or_else(|_| panic!("timed out waiting for job {job_id} to be {state}"));
}

/// Split an SSE body into `(event, data)` pairs.
pub fn parse_sse(body: &str) -> Vec<(String, Value)> {
    body.split("\n\n")
        .filter_map(|frame| {
            let mut name = None;
            let mut data = None;
            for line in frame.lines() {
                if let Some(rest) = line.strip_prefix("event:") {
                    name = Some(rest.trim().to_string());
                } else if let Some(rest) = line.strip_prefix("data:") {
                    data = serde_json::from_str(rest.trim()).ok();
                }
            }
            Some((name?, data?))
        })
        .collect()
}
