//! Integration tests for `/api/generate` and the `/api/jobs` resource.

mod common;

use axum::http::StatusCode;
use common::{body_bytes, body_json, delete, get, parse_sse, post_json, submit, wait_state};
use serde_json::json;
use songreel_core::status::JobState;

const UNKNOWN_ID: &str = "01890f3e-0000-7000-8000-000000000000";

// ---------------------------------------------------------------------------
// Submit
// ---------------------------------------------------------------------------

#[tokio::test]
async fn generate_returns_201_with_job_id() {
    let (app, _engine) = common::build_test_app();

    let response = post_json(
        &app,
        "/api/generate",
        json!({ "visualMode": "visualizer", "audioRef": "uploads/a.mp3" }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    assert!(json["jobId"].is_string());
}

#[tokio::test]
async fn generate_rejects_missing_audio_ref() {
    let (app, engine) = common::build_test_app();

    let response = post_json(&app, "/api/generate", json!({ "visualMode": "visualizer" })).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["code"], "VALIDATION_ERROR");
    assert_eq!(json["error"], "Missing audioRef");
    assert!(engine.list(&Default::default()).is_empty());
}

#[tokio::test]
async fn generate_requires_image_for_performance_mode() {
    let (app, _engine) = common::build_test_app();

    let response = post_json(
        &app,
        "/api/generate",
        json!({ "visualMode": "performance", "audioRef": "uploads/a.mp3" }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn generate_rejects_malformed_body_as_validation_error() {
    let (app, engine) = common::build_test_app();

    for body in [
        json!({ "visualMode": null, "audioRef": "a.mp3" }),
        json!({ "visualMode": "visualizer", "audioRef": "a.mp3", "segments": "4" }),
    ] {
        let response = post_json(&app, "/api/generate", body).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["code"], "VALIDATION_ERROR");
        assert!(json["error"].as_str().unwrap().contains("invalid type"));
    }
    assert!(engine.list(&Default::default()).is_empty());
}

// ---------------------------------------------------------------------------
// Status and list
// ---------------------------------------------------------------------------

#[tokio::test]
async fn completed_job_reports_result_and_payload() {
    let (app, engine) = common::build_test_app();
    let job_id = submit(&app, 3).await;
    wait_state(&engine, &job_id, JobState::Completed).await;

    let response = get(&app, &format!("/api/jobs/{job_id}")).await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["jobId"], job_id.as_str());
    assert_eq!(json["status"], "completed");
    assert_eq!(json["progress"], 100);
    assert_eq!(json["data"]["audioRef"], "uploads/track.mp3");
    assert!(json["result"]["finalVideoUrl"].is_string());
    assert!(json["failedReason"].is_null());
}

#[tokio::test]
async fn get_unknown_job_returns_404() {
    let (app, _engine) = common::build_test_app();

    let response = get(&app, &format!("/api/jobs/{UNKNOWN_ID}")).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = body_json(response).await;
    assert_eq!(json["code"], "NOT_FOUND");
}

#[tokio::test]
async fn malformed_job_id_returns_400() {
    let (app, _engine) = common::build_test_app();

    let response = get(&app, "/api/jobs/not-a-job").await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn list_returns_jobs_in_submission_order_and_filters_by_state() {
    let (app, engine) = common::build_test_app();
    let first = submit(&app, 1).await;
    let second = submit(&app, 1).await;
    wait_state(&engine, &first, JobState::Completed).await;
    wait_state(&engine, &second, JobState::Completed).await;

    let json = body_json(get(&app, "/api/jobs").await).await;
    let ids: Vec<&str> = json["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|job| job["jobId"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec![first.as_str(), second.as_str()]);

    let json = body_json(get(&app, "/api/jobs?state=failed").await).await;
    assert!(json["data"].as_array().unwrap().is_empty());

    let json = body_json(get(&app, "/api/jobs?limit=1&offset=1").await).await;
    let page = json["data"].as_array().unwrap();
    assert_eq!(page.len(), 1);
    assert_eq!(page[0]["jobId"], second.as_str());
}

// ---------------------------------------------------------------------------
// Cancel and delete
// ---------------------------------------------------------------------------

#[tokio::test]
async fn cancel_finished_job_returns_409() {
    let (app, engine) = common::build_test_app();
    let job_id = submit(&app, 1).await;
    wait_state(&engine, &job_id, JobState::Completed).await;

    let response = post_json(&app, &format!("/api/jobs/{job_id}/cancel"), json!({})).await;

    assert_eq!(response.status(), StatusCode::CONFLICT);
    let json = body_json(response).await;
    assert_eq!(json["error"], "Cannot cancel job in state: completed");
}

#[tokio::test]
async fn cancel_unknown_job_returns_404() {
    let (app, _engine) = common::build_test_app();

    let response = post_json(&app, &format!("/api/jobs/{UNKNOWN_ID}/cancel"), json!({})).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn delete_finished_job_returns_204_then_404() {
    let (app, engine) = common::build_test_app();
    let job_id = submit(&app, 1).await;
    wait_state(&engine, &job_id, JobState::Completed).await;

    let response = delete(&app, &format!("/api/jobs/{job_id}")).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = get(&app, &format!("/api/jobs/{job_id}")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = delete(&app, &format!("/api/jobs/{job_id}")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

#[tokio::test]
async fn events_for_finished_job_replay_status_then_completed() {
    let (app, engine) = common::build_test_app();
    let job_id = submit(&app, 2).await;
    wait_state(&engine, &job_id, JobState::Completed).await;

    let response = get(&app, &format!("/api/jobs/{job_id}/events")).await;

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response.headers()["content-type"].to_str().unwrap();
    assert!(content_type.starts_with("text/event-stream"));

    let body = String::from_utf8(body_bytes(response).await).unwrap();
    let events = parse_sse(&body);
    let names: Vec<&str> = events.iter().map(|(name, _)| name.as_str()).collect();
    assert_eq!(names, vec!["status", "completed"]);

    let (_, status) = &events[0];
    assert_eq!(status["jobId"], job_id.as_str());
    assert_eq!(status["status"], "completed");
    assert_eq!(status["progress"], 100);

    let (_, completed) = &events[1];
    assert!(completed["result"]["finalVideoUrl"].is_string());
}

#[tokio::test]
async fn events_for_unknown_job_send_failed_and_close() {
    let (app, _engine) = common::build_test_app();

    let response = get(&app, &format!("/api/jobs/{UNKNOWN_ID}/events")).await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = String::from_utf8(body_bytes(response).await).unwrap();
    let events = parse_sse(&body);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].0, "failed");
    assert_eq!(events[0].1["error"], "Job not found");
}
