//! FIFO handoff of queued job ids to the worker pool.
//!
//! Backed by an unbounded `mpsc` channel. The single receiver sits behind
//! an async mutex so any number of workers can compete for it; each id is
//! handed to exactly one of them.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use songreel_core::error::CoreError;
use songreel_core::types::JobId;
use tokio::sync::mpsc;

pub struct ExecutionQueue {
    tx: Mutex<Option<mpsc::UnboundedSender<JobId>>>,
    rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<JobId>>,
    depth: AtomicUsize,
}

impl ExecutionQueue {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx: Mutex::new(Some(tx)),
            rx: tokio::sync::Mutex::new(rx),
            depth: AtomicUsize::new(0),
        }
    }

    /// Append a job id. Fails once the queue has been closed.
    pub fn push(&self, job_id: JobId) -> Result<(), CoreError> {
        let guard = self.tx.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(tx) = guard.as_ref() else {
            return Err(CoreError::Internal("Execution queue is closed".to_string()));
        };

        self.depth.fetch_add(1, Ordering::SeqCst);
        tx.send(job_id).map_err(|_| {
            self.depth.fetch_sub(1, Ordering::SeqCst);
            CoreError::Internal("Execution queue is closed".to_string())
        })
    }

    /// Wait for the next job id.
    ///
    /// Returns `None` once the queue is closed and drained. Cancel-safe:
    /// dropping the future never loses an id.
    pub async fn pop(&self) -> Option<JobId> {
        let mut rx = self.rx.lock().await;
        let job_id = rx.recv().await?;
        self.depth.fetch_sub(1, Ordering::SeqCst);
        Some(job_id)
    }

    /// Number of ids pushed but not yet popped.
    pub fn len(&self) -> usize {
        self.depth.load(Ordering::SeqCst)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Refuse further pushes. Ids already queued can still be popped.
    pub fn close(&self) {
        let closed = self
            .tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .is_some();
        if closed {
            tracing::info!(pending = self.len(), "Execution queue closed");
        }
    }
}

impl Default for ExecutionQueue {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
