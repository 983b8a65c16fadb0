//! Lifecycle events delivered to job subscribers.

use serde_json::json;
use songreel_core::job::JobRecord;
use songreel_core::job_events::{
    EVENT_CANCELED, EVENT_COMPLETED, EVENT_FAILED, EVENT_PING, EVENT_PROGRESS, EVENT_STATUS,
};
use songreel_core::status::JobState;
use songreel_core::types::JobId;

/// Reason carried by the synthetic event sent to subscribers of an
/// unknown job id.
pub const JOB_NOT_FOUND: &str = "Job not found";

/// One event on a job's push feed.
#[derive(Debug, Clone, PartialEq)]
pub enum JobEvent {
    /// Snapshot sent once when a subscription opens.
    Status {
        job_id: JobId,
        state: JobState,
        progress: u8,
    },
    Progress {
        job_id: JobId,
        progress: u8,
    },
    Completed {
        job_id: JobId,
        result: serde_json::Value,
    },
    Failed {
        job_id: JobId,
        error: String,
    },
    Canceled {
        job_id: JobId,
    },
    /// Keep-alive; `t` is unix time in milliseconds.
    Heartbeat {
        t: i64,
    },
}

impl JobEvent {
    /// Snapshot of the record's current state and progress.
    pub fn status_of(record: &JobRecord) -> Self {
        JobEvent::Status {
            job_id: record.id,
            state: record.state,
            progress: record.progress,
        }
    }

    /// The terminal event matching a finished record, or `None` while the
    /// job is still queued or running.
    pub fn terminal_for(record: &JobRecord) -> Option<Self> {
        let job_id = record.id;
        match record.state {
            JobState::Completed => Some(JobEvent::Completed {
                job_id,
                result: record.result.clone().unwrap_or(serde_json::Value::Null),
            }),
            JobState::Failed => Some(JobEvent::Failed {
                job_id,
                error: record
                    .failure_reason
                    .clone()
                    .unwrap_or_else(|| "Job failed".to_string()),
            }),
            JobState::Canceled => Some(JobEvent::Canceled { job_id }),
            JobState::Queued | JobState::Running => None,
        }
    }

    /// Synthetic failure for a subscription to an id the store never had.
    pub fn not_found(job_id: JobId) -> Self {
        JobEvent::Failed {
            job_id,
            error: JOB_NOT_FOUND.to_string(),
        }
    }

    /// A heartbeat stamped with the current time.
    pub fn heartbeat() -> Self {
        JobEvent::Heartbeat {
            t: chrono::Utc::now().timestamp_millis(),
        }
    }

    /// Event name, used as the SSE `event:` field.
    pub fn name(&self) -> &'static str {
        match self {
            JobEvent::Status { .. } => EVENT_STATUS,
            JobEvent::Progress { .. } => EVENT_PROGRESS,
            JobEvent::Completed { .. } => EVENT_COMPLETED,
            JobEvent::Failed { .. } => EVENT_FAILED,
            JobEvent::Canceled { .. } => EVENT_CANCELED,
            JobEvent::Heartbeat { .. } => EVENT_PING,
        }
    }

    /// The job this event belongs to. Heartbeats belong to no job.
    pub fn job_id(&self) -> Option<JobId> {
        match self {
            JobEvent::Status { job_id, .. }
            | JobEvent::Progress { job_id, .. }
            | JobEvent::Completed { job_id, .. }
            | JobEvent::Failed { job_id, .. }
            | JobEvent::Canceled { job_id } => Some(*job_id),
            JobEvent::Heartbeat { .. } => None,
        }
    }

    /// `completed`, `failed` and `canceled` end a subscription.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobEvent::Completed { .. } | JobEvent::Failed { .. } | JobEvent::Canceled { .. }
        )
    }

    /// JSON body sent to clients.
    pub fn data(&self) -> serde_json::Value {
        match self {
            JobEvent::Status {
                job_id,
                state,
                progress,
            } => json!({ "jobId": job_id, "status": state, "progress": progress }),
            JobEvent::Progress { job_id, progress } => {
                json!({ "jobId": job_id, "progress": progress })
            }
            JobEvent::Completed { job_id, result } => json!({ "jobId": job_id, "result": result }),
            JobEvent::Failed { job_id, error } => json!({ "jobId": job_id, "error": error }),
            JobEvent::Canceled { job_id } => {
                json!({ "jobId": job_id, "status": JobState::Canceled })
            }
            JobEvent::Heartbeat { t } => json!({ "t": t }),
        }
    }
}
