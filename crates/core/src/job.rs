//! The job record: one unit of render work and its current state.

use serde::Serialize;

use crate::payload::JobPayload;
use crate::status::JobState;
use crate::types::{new_job_id, JobId, Timestamp};

/// A single render job as held by the job store.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRecord {
    pub id: JobId,
    pub payload: JobPayload,
    pub state: JobState,
    /// Integer percentage, 0..=100.
    pub progress: u8,
    /// Set only by the transition into `completed`.
    pub result: Option<serde_json::Value>,
    /// Set only by the transition into `failed`.
    pub failure_reason: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl JobRecord {
    /// A freshly submitted job: `queued`, no progress, no outcome.
    pub fn new(payload: JobPayload) -> Self {
        let now = chrono::Utc::now();
        Self {
            id: new_job_id(),
            payload,
            state: JobState::Queued,
            progress: 0,
            result: None,
            failure_reason: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }
}
