//! The worker loop and single-job execution.
//!
//! Each worker pulls a job id from the [`ExecutionQueue`], claims the job
//! with a `queued -> running` transition, then drives the pipeline segment
//! by segment. Every store write is a guarded transition, so a cancel that
//! lands at any point makes the worker's next write fail and the worker
//! stops without emitting anything further.

use std::any::Any;
use std::sync::Arc;

use serde_json::Value;
use songreel_core::payload::JobPayload;
use songreel_core::progress::{segment_progress, PROGRESS_COMPLETE};
use songreel_core::status::JobState;
use songreel_core::types::JobId;
use songreel_events::{EventBroadcaster, JobEvent};
use songreel_pipeline::PipelineExecutor;
use songreel_store::JobStore;
use tokio_util::sync::CancellationToken;

use crate::queue::ExecutionQueue;

/// Failure reason recorded for a job whose worker was stopped at shutdown.
pub const WORKER_ABORTED: &str = "worker aborted at shutdown";

/// Shared handles every worker needs.
pub struct WorkerContext {
    pub store: Arc<JobStore>,
    pub queue: Arc<ExecutionQueue>,
    pub broadcaster: Arc<EventBroadcaster>,
    pub executor: Arc<dyn PipelineExecutor>,
    /// Segment count for payloads that do not set one.
    pub default_segments: u32,
}

/// How a job's pipeline run ended.
#[derive(Debug)]
enum Outcome {
    Completed(Value),
    Failed(String),
    /// The job left `running` under the worker; nothing more to write.
    Canceled,
}

/// Run one worker until `cancel` fires or the queue is closed and drained.
///
/// A job already in progress is finished before the loop notices `cancel`,
/// unless `abort` fires first: the job is then stopped and marked failed.
pub async fn run_worker(
    worker: usize,
    ctx: Arc<WorkerContext>,
    cancel: CancellationToken,
    abort: CancellationToken,
) {
    tracing::info!(worker, "Worker started");

    loop {
        // Cancellation wins over a ready queue so no new job is claimed
        // once shutdown has begun.
        let job_id = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            next = ctx.queue.pop() => match next {
                Some(job_id) => job_id,
                None => break,
            },
        };
        process_job(&ctx, worker, job_id, &abort).await;
    }

    tracing::info!(worker, "Worker stopped");
}

/// Claim and execute one dequeued job.
pub async fn process_job(
    ctx: &Arc<WorkerContext>,
    worker: usize,
    job_id: JobId,
    abort: &CancellationToken,
) {
    let record = match ctx.store.get(job_id) {
        Ok(record) => record,
        Err(_) => {
            tracing::debug!(job_id = %job_id, worker, "Dequeued job no longer exists, skipping");
            return;
        }
    };
    if record.state != JobState::Queued {
        tracing::debug!(job_id = %job_id, worker, state = %record.state, "Dequeued job is not queued, skipping");
        return;
    }
    if let Err(e) =
        ctx.store
            .compare_and_transition(job_id, JobState::Queued, JobState::Running, |_| {})
    {
        tracing::debug!(job_id = %job_id, worker, error = %e, "Lost claim on dequeued job");
        return;
    }

    let payload = record.payload;
    tracing::info!(
        job_id = %job_id,
        worker,
        mode = %payload.visual_mode,
        segments = payload.segment_count(ctx.default_segments),
        "Job started",
    );

    // The pipeline runs in its own task so a panic inside the executor is
    // contained here instead of killing the worker loop.
    let task_ctx = Arc::clone(ctx);
    let mut handle = tokio::spawn(async move { execute(&task_ctx, job_id, &payload).await });
    let outcome = tokio::select! {
        joined = &mut handle => match joined {
            Ok(outcome) => outcome,
            Err(e) if e.is_panic() => Outcome::Failed(format!(
                "worker panicked: {}",
                panic_message(e.into_panic().as_ref())
            )),
            Err(e) => Outcome::Failed(format!("worker task aborted: {e}")),
        },
        _ = abort.cancelled() => {
            handle.abort();
            tracing::warn!(job_id = %job_id, worker, "Aborting job at shutdown");
            Outcome::Failed(WORKER_ABORTED.to_string())
        }
    };

    finalize(ctx, worker, job_id, outcome);
}

/// Render every segment, reporting progress, then assemble the result.
async fn execute(ctx: &WorkerContext, job_id: JobId, payload: &JobPayload) -> Outcome {
    let total = payload.segment_count(ctx.default_segments);
    let mut segments = Vec::with_capacity(total as usize);
    let mut reported: u8 = 0;

    for index in 0..total {
        if !is_running(&ctx.store, job_id) {
            return Outcome::Canceled;
        }

        match ctx.executor.render_segment(payload, index, total).await {
            Ok(segment) => segments.push(segment),
            Err(e) => return Outcome::Failed(e.to_string()),
        }

        let finished = index + 1;
        if finished == total {
            break;
        }

        let progress = segment_progress(finished, total);
        match ctx.store.compare_and_transition(
            job_id,
            JobState::Running,
            JobState::Running,
            |record| record.progress = progress,
        ) {
            Ok(updated) if updated.progress > reported => {
                reported = updated.progress;
                ctx.broadcaster.publish(JobEvent::Progress {
                    job_id,
                    progress: reported,
                });
            }
            Ok(_) => {}
            Err(_) => return Outcome::Canceled,
        }
    }

    if !is_running(&ctx.store, job_id) {
        return Outcome::Canceled;
    }

    match ctx.executor.assemble(payload, segments).await {
        Ok(result) => Outcome::Completed(result),
        Err(e) => Outcome::Failed(e.to_string()),
    }
}

/// Write the terminal state and broadcast it. Losing the race against a
/// cancellation is a no-op.
fn finalize(ctx: &WorkerContext, worker: usize, job_id: JobId, outcome: Outcome) {
    match outcome {
        Outcome::Completed(result) => {
            match ctx.store.compare_and_transition(
                job_id,
                JobState::Running,
                JobState::Completed,
                |record| record.result = Some(result),
            ) {
                Ok(record) => {
                    ctx.broadcaster.publish(JobEvent::Progress {
                        job_id,
                        progress: PROGRESS_COMPLETE,
                    });
                    if let Some(event) = JobEvent::terminal_for(&record) {
                        ctx.broadcaster.publish(event);
                    }
                    tracing::info!(job_id = %job_id, worker, "Job completed");
                }
                Err(e) => {
                    tracing::debug!(job_id = %job_id, worker, error = %e, "Completion discarded");
                }
            }
        }
        Outcome::Failed(reason) => {
            match ctx.store.compare_and_transition(
                job_id,
                JobState::Running,
                JobState::Failed,
                |record| record.failure_reason = Some(reason.clone()),
            ) {
                Ok(record) => {
                    if let Some(event) = JobEvent::terminal_for(&record) {
                        ctx.broadcaster.publish(event);
                    }
                    tracing::warn!(job_id = %job_id, worker, reason = %reason, "Job failed");
                }
                Err(e) => {
                    tracing::debug!(job_id = %job_id, worker, error = %e, "Failure discarded");
                }
            }
        }
        Outcome::Canceled => {
            tracing::info!(job_id = %job_id, worker, "Job stopped after cancellation");
        }
    }
}

fn is_running(store: &JobStore, job_id: JobId) -> bool {
    matches!(store.state(job_id), Ok(JobState::Running))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
