//! The job service façade.
//!
//! [`JobOrchestrator`] is created once at startup with
//! [`JobOrchestrator::start`] and shared as `Arc<JobOrchestrator>`. None of
//! its operations wait on job execution: they return as soon as the store,
//! queue or broadcaster call they wrap has completed.

use std::sync::{Arc, Mutex, PoisonError};

use songreel_core::error::CoreError;
use songreel_core::job::JobRecord;
use songreel_core::payload::JobPayload;
use songreel_core::status::JobState;
use songreel_core::types::JobId;
use songreel_events::{start_heartbeat, EventBroadcaster, JobEvent, Subscription};
use songreel_pipeline::PipelineExecutor;
use songreel_store::{JobListQuery, JobStore};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::EngineConfig;
use crate::pool::WorkerPool;
use crate::queue::ExecutionQueue;
use crate::runner::WorkerContext;

pub struct JobOrchestrator {
    config: EngineConfig,
    store: Arc<JobStore>,
    queue: Arc<ExecutionQueue>,
    broadcaster: Arc<EventBroadcaster>,
    pool: WorkerPool,
    heartbeat: Mutex<Option<JoinHandle<()>>>,
    /// Master cancellation token for workers and the heartbeat task.
    cancel: CancellationToken,
}

impl JobOrchestrator {
    /// Build the store, queue and broadcaster, then spawn the worker pool
    /// and the heartbeat task.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(config: EngineConfig, executor: Arc<dyn PipelineExecutor>) -> Arc<Self> {
        let store = Arc::new(JobStore::new());
        let queue = Arc::new(ExecutionQueue::new());
        let broadcaster = Arc::new(EventBroadcaster::new());
        let cancel = CancellationToken::new();

        let ctx = Arc::new(WorkerContext {
            store: Arc::clone(&store),
            queue: Arc::clone(&queue),
            broadcaster: Arc::clone(&broadcaster),
            executor,
            default_segments: config.default_segments,
        });
        let pool = WorkerPool::start(config.worker_count, ctx, &cancel);
        let heartbeat = start_heartbeat(
            Arc::clone(&broadcaster),
            config.heartbeat_interval,
            cancel.child_token(),
        );

        tracing::info!(
            workers = config.worker_count,
            default_segments = config.default_segments,
            heartbeat_secs = config.heartbeat_interval.as_secs(),
            "Job orchestrator started",
        );

        Arc::new(Self {
            config,
            store,
            queue,
            broadcaster,
            pool,
            heartbeat: Mutex::new(Some(heartbeat)),
            cancel,
        })
    }

    /// Validate, store and enqueue a new job.
    ///
    /// A payload that fails validation never creates a record.
    pub fn submit(&self, payload: JobPayload) -> Result<JobId, CoreError> {
        payload.validate()?;

        let record = self.store.create(payload);
        let job_id = record.id;
        if let Err(e) = self.queue.push(job_id) {
            let _ = self.store.remove(job_id);
            return Err(e);
        }

        tracing::info!(
            job_id = %job_id,
            mode = %record.payload.visual_mode,
            queue_depth = self.queue.len(),
            "Job submitted",
        );
        Ok(job_id)
    }

    /// Current snapshot of a job.
    pub fn status(&self, job_id: JobId) -> Result<JobRecord, CoreError> {
        self.store.get(job_id)
    }

    /// Jobs in submission order, optionally filtered by state.
    pub fn list(&self, query: &JobListQuery) -> Vec<JobRecord> {
        self.store.list(query)
    }

    /// Cancel a queued or running job.
    ///
    /// A queued job is skipped when a worker dequeues it; a running one
    /// stops before its next segment. Fails with `Conflict` when the job
    /// already finished, including when a concurrent cancel got there
    /// first.
    pub fn cancel(&self, job_id: JobId) -> Result<(), CoreError> {
        loop {
            let state = self.store.state(job_id)?;
            if state.is_terminal() {
                return Err(CoreError::Conflict(format!(
                    "Cannot cancel job in state: {state}"
                )));
            }

            match self
                .store
                .compare_and_transition(job_id, state, JobState::Canceled, |_| {})
            {
                Ok(_) => {
                    self.broadcaster.publish(JobEvent::Canceled { job_id });
                    tracing::info!(job_id = %job_id, previous = %state, "Job canceled");
                    return Ok(());
                }
                // The state moved between the read and the transition
                // (typically queued -> running); look again.
                Err(CoreError::Conflict(_)) => continue,
                Err(e) => return Err(e),
            }
        }
    }

    /// Permanently delete a job that is not running.
    ///
    /// Open subscriptions to a removed job are closed without a terminal
    /// event.
    pub fn remove(&self, job_id: JobId) -> Result<(), CoreError> {
        let removed = self.store.remove(job_id)?;
        let closed = self.broadcaster.close_job(job_id);
        tracing::info!(job_id = %job_id, state = %removed.state, closed, "Job removed");
        Ok(())
    }

    /// Open a live event feed for one job.
    ///
    /// The first event is a `status` snapshot (or a synthetic `failed` for
    /// an unknown id). The feed ends after the job's terminal event.
    pub fn subscribe(&self, job_id: JobId) -> Subscription {
        self.broadcaster
            .subscribe(job_id, || self.store.get(job_id).ok())
    }

    /// Number of jobs waiting for a worker.
    pub fn queue_depth(&self) -> usize {
        self.queue.len()
    }

    pub fn worker_count(&self) -> usize {
        self.pool.size()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Stop accepting jobs, stop the workers and the heartbeat, and close
    /// every open subscription.
    ///
    /// Workers finish the job they are executing, bounded by
    /// `shutdown_timeout`; a job still running after that is stopped and
    /// marked `failed`. Jobs still queued stay `queued`.
    pub async fn shutdown(&self) {
        tracing::info!("Shutting down job orchestrator");
        self.queue.close();
        self.cancel.cancel();

        self.pool.join(self.config.shutdown_timeout).await;

        let heartbeat = self
            .heartbeat
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = heartbeat {
            let _ = handle.await;
        }

        self.broadcaster.close_all();
        tracing::info!("Job orchestrator shut down complete");
    }
}
