#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use songreel_core::payload::JobPayload;
use songreel_core::status::JobState;
use songreel_core::types::JobId;
use songreel_events::{JobEvent, Subscription};
use songreel_pipeline::{PipelineError, PipelineExecutor};
use songreel_worker::{EngineConfig, JobOrchestrator};
use tokio::sync::Semaphore;

/// Upper bound on any single wait in these tests.
pub const WAIT: Duration = Duration::from_secs(5);

/// Engine config for tests: `workers` workers, no heartbeat noise.
pub fn test_config(workers: usize) -> EngineConfig {
    EngineConfig {
        worker_count: workers,
        default_segments: 12,
        heartbeat_interval: Duration::from_secs(3600),
        shutdown_timeout: Duration::from_secs(1),
    }
}

pub fn start(workers: usize, executor: Arc<dyn PipelineExecutor>) -> Arc<JobOrchestrator> {
    JobOrchestrator::start(test_config(workers), executor)
}

pub fn payload(audio_ref: &str, segments: i64) -> JobPayload {
    JobPayload::new("visualizer", audio_ref).with_segments(segments)
}

/// Next event, failing the test if none arrives in time.
pub async fn next_event(sub: &mut Subscription) -> Option<JobEvent> {
    tokio::time::timeout(WAIT, sub.recv())
        .await
        .expect("timed out waiting for a job event")
}

/// Every remaining event until the feed closes.
pub async fn drain(sub: &mut Subscription) -> Vec<JobEvent> {
    let mut events = Vec::new();
    while let Some(event) = next_event(sub).await {
        events.push(event);
    }
    events
}

/// Subscribe and wait for the job's terminal event.
pub async fn wait_terminal(orchestrator: &JobOrchestrator, job_id: JobId) -> JobEvent {
    let mut sub = orchestrator.subscribe(job_id);
    drain(&mut sub)
        .await
        .into_iter()
        .find(JobEvent::is_terminal)
        .expect("feed closed without a terminal event")
}

/// Poll the store until the job reaches `state`.
pub async fn wait_state(orchestrator: &JobOrchestrator, job_id: JobId, state: JobState) {
    tokio::time::timeout(WAIT, async {
        while !matches!(orchestrator.status(job_id), Ok(record) if record.state == state) {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap_or_else(|_| panic!("timed out waiting for job {job_id} to be {state}"));
}

/// Progress values carried by `progress` events, in order.
pub fn progress_values(events: &[JobEvent]) -> Vec<u8> {
    events
        .iter()
        .filter_map(|event| match event {
            JobEvent::Progress { progress, .. } => Some(*progress),
            _ => None,
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Executors
// ---------------------------------------------------------------------------

/// Renders a segment only when the test hands out a permit, and records
/// which `(audioRef, index)` pairs were rendered.
pub struct GatedExecutor {
    gate: Semaphore,
    rendered: Mutex<Vec<(String, u32)>>,
}

impl GatedExecutor {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            gate: Semaphore::new(0),
            rendered: Mutex::new(Vec::new()),
        })
    }

    /// Allow `segments` more segment renders to finish.
    pub fn release(&self, segments: usize) {
        self.gate.add_permits(segments);
    }

    pub fn rendered(&self) -> Vec<(String, u32)> {
        self.rendered.lock().unwrap().clone()
    }

    pub fn rendered_for(&self, audio_ref: &str) -> usize {
        self.rendered()
            .iter()
            .filter(|(audio, _)| audio == audio_ref)
            .count()
    }

    /// Wait until `count` segments have been rendered in total.
    pub async fn wait_rendered(&self, count: usize) {
        tokio::time::timeout(WAIT, async {
            while self.rendered().len() < count {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("timed out waiting for segment renders");
    }
}

#[async_trait]
impl PipelineExecutor for GatedExecutor {
    async fn render_segment(
        &self,
        payload: &JobPayload,
        index: u32,
        _total: u32,
    ) -> Result<Value, PipelineError> {
        self.gate
            .acquire()
            .await
            .map_err(|e| PipelineError::SegmentFailed {
                index,
                message: e.to_string(),
            })?
            .forget();
        self.rendered
            .lock()
            .unwrap()
            .push((payload.audio_ref.clone(), index));
        Ok(json!({ "index": index }))
    }

    async fn assemble(
        &self,
        payload: &JobPayload,
        segments: Vec<Value>,
    ) -> Result<Value, PipelineError> {
        Ok(json!({
            "finalVideoUrl": "http://localhost:5000/static/final.mp4",
            "mode": payload.visual_mode,
            "segments": segments.len(),
        }))
    }
}

/// Misbehaves according to the payload's `audioRef`:
/// `"panic"` panics in the first segment, `"fail"` errors in segment 1,
/// anything else renders instantly. Records the order jobs were assembled.
pub struct ScriptedExecutor {
    assembled: Mutex<Vec<String>>,
}

impl ScriptedExecutor {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            assembled: Mutex::new(Vec::new()),
        })
    }

    pub fn assembled(&self) -> Vec<String> {
        self.assembled.lock().unwrap().clone()
    }
}

#[async_trait]
impl PipelineExecutor for ScriptedExecutor {
    async fn render_segment(
        &self,
        payload: &JobPayload,
        index: u32,
        _total: u32,
    ) -> Result<Value, PipelineError> {
        match payload.audio_ref.as_str() {
            "panic" => panic!("decoder blew up"),
            "fail" if index == 1 => Err(PipelineError::SegmentFailed {
                index,
                message: "encoder crashed".to_string(),
            }),
            _ => Ok(json!({ "index": index })),
        }
    }

    async fn assemble(
        &self,
        payload: &JobPayload,
        _segments: Vec<Value>,
    ) -> Result<Value, PipelineError> {
        self.assembled.lock().unwrap().push(payload.audio_ref.clone());
        Ok(json!({ "finalVideoUrl": "final.mp4", "mode": payload.visual_mode }))
    }
}
