//! Registry of job records with per-job serialized transitions.
//!
//! The outer map lock is only held exclusively for insertion and removal.
//! Transitions take it shared and then lock the single record, so writers
//! on different jobs never contend, and a removal can never interleave
//! with a transition on the same job.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError, RwLock};

use serde::Deserialize;
use songreel_core::error::CoreError;
use songreel_core::job::JobRecord;
use songreel_core::payload::JobPayload;
use songreel_core::progress::{PROGRESS_CAP_BEFORE_COMPLETE, PROGRESS_COMPLETE};
use songreel_core::status::JobState;
use songreel_core::types::JobId;

/// Maximum page size for job listing.
const MAX_LIMIT: usize = 100;

/// Default page size for job listing.
const DEFAULT_LIMIT: usize = 50;

/// Query parameters for listing jobs.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JobListQuery {
    /// Only return jobs in this state.
    pub state: Option<JobState>,
    /// Maximum number of results. Defaults to 50, capped at 100.
    pub limit: Option<usize>,
    /// Number of results to skip. Defaults to 0.
    pub offset: Option<usize>,
}

/// Thread-safe job registry.
///
/// Designed to be wrapped in `Arc` and shared between the orchestrator and
/// every worker.
#[derive(Default)]
pub struct JobStore {
    jobs: RwLock<HashMap<JobId, Slot>>,
    next_seq: AtomicU64,
}

/// One stored job plus its insertion sequence number, used for listing
/// in submission order.
struct Slot {
    seq: u64,
    record: Mutex<JobRecord>,
}

impl Slot {
    fn lock(&self) -> std::sync::MutexGuard<'_, JobRecord> {
        self.record.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl JobStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new `queued` job and return it.
    pub fn create(&self, payload: JobPayload) -> JobRecord {
        let record = JobRecord::new(payload);
        let slot = Slot {
            seq: self.next_seq.fetch_add(1, Ordering::Relaxed),
            record: Mutex::new(record.clone()),
        };
        let mut jobs = self.jobs.write().unwrap_or_else(PoisonError::into_inner);
        jobs.insert(record.id, slot);
        tracing::debug!(job_id = %record.id, "Job record created");
        record
    }

    /// Fetch a snapshot of a job.
    pub fn get(&self, id: JobId) -> Result<JobRecord, CoreError> {
        let jobs = self.jobs.read().unwrap_or_else(PoisonError::into_inner);
        let slot = jobs.get(&id).ok_or_else(|| CoreError::job_not_found(id))?;
        let record = slot.lock().clone();
        Ok(record)
    }

    /// Current state of a job, without cloning the payload.
    pub fn state(&self, id: JobId) -> Result<JobState, CoreError> {
        let jobs = self.jobs.read().unwrap_or_else(PoisonError::into_inner);
        let slot = jobs.get(&id).ok_or_else(|| CoreError::job_not_found(id))?;
        let state = slot.lock().state;
        Ok(state)
    }

    /// Permanently remove a job.
    ///
    /// Running jobs must be canceled first; removing one fails with
    /// `InvalidState`. Ids are never reused after removal.
    pub fn remove(&self, id: JobId) -> Result<JobRecord, CoreError> {
        let mut jobs = self.jobs.write().unwrap_or_else(PoisonError::into_inner);
        let state = jobs
            .get(&id)
            .ok_or_else(|| CoreError::job_not_found(id))?
            .lock()
            .state;
        if state == JobState::Running {
            return Err(CoreError::InvalidState(format!(
                "Job {id} is running; cancel it before removing"
            )));
        }
        let removed = jobs
            .remove(&id)
            .ok_or_else(|| CoreError::job_not_found(id))?
            .record
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner);
        tracing::debug!(job_id = %id, state = %state, "Job record removed");
        Ok(removed)
    }

    /// Atomically move a job from `expected` to `next`, applying `mutation`.
    ///
    /// Fails with `Conflict` when the job is not currently in `expected`
    /// and with `InvalidState` when `expected -> next` is not a lifecycle
    /// edge. Whatever the mutation does, the record leaves this call with:
    /// - progress never lower than before;
    /// - progress below 100 unless the job just completed, and exactly 100
    ///   if it did;
    /// - `result` only on `completed`, `failure_reason` only on `failed`.
    pub fn compare_and_transition<F>(
        &self,
        id: JobId,
        expected: JobState,
        next: JobState,
        mutation: F,
    ) -> Result<JobRecord, CoreError>
    where
        F: FnOnce(&mut JobRecord),
    {
        if !expected.can_transition_to(next) {
            return Err(CoreError::InvalidState(format!(
                "Illegal transition {expected} -> {next}"
            )));
        }

        let jobs = self.jobs.read().unwrap_or_else(PoisonError::into_inner);
        let slot = jobs.get(&id).ok_or_else(|| CoreError::job_not_found(id))?;
        let mut record = slot.lock();

        if record.state != expected {
            return Err(CoreError::Conflict(format!(
                "Job {id} is {}, expected {expected}",
                record.state
            )));
        }

        let previous_progress = record.progress;
        mutation(&mut *record);

        record.state = next;
        record.progress = match next {
            JobState::Completed => PROGRESS_COMPLETE,
            _ => record
                .progress
                .max(previous_progress)
                .min(PROGRESS_CAP_BEFORE_COMPLETE),
        };
        if next != JobState::Completed {
            record.result = None;
        }
        if next != JobState::Failed {
            record.failure_reason = None;
        }
        record.updated_at = chrono::Utc::now();

        Ok(record.clone())
    }

    /// List jobs in creation order.
    pub fn list(&self, query: &JobListQuery) -> Vec<JobRecord> {
        let limit = query.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT);
        let offset = query.offset.unwrap_or(0);

        let mut records: Vec<(u64, JobRecord)> = {
            let jobs = self.jobs.read().unwrap_or_else(PoisonError::into_inner);
            jobs.values()
                .map(|slot| (slot.seq, slot.lock().clone()))
                .filter(|(_, record)| query.state.map_or(true, |state| record.state == state))
                .collect()
        };
        records.sort_by_key(|(seq, _)| *seq);
        records
            .into_iter()
            .skip(offset)
            .take(limit)
            .map(|(_, record)| record)
            .collect()
    }

    /// Number of jobs currently held.
    pub fn len(&self) -> usize {
        self.jobs.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
