//! Fixed-size pool of worker tasks sharing one execution queue.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::runner::{run_worker, WorkerContext};

/// How long aborted workers get to record their job as failed.
const ABORT_GRACE: Duration = Duration::from_secs(1);

pub struct WorkerPool {
    handles: Mutex<Vec<JoinHandle<()>>>,
    /// Stops in-flight jobs once the shutdown deadline has passed.
    abort: CancellationToken,
    size: usize,
}

impl WorkerPool {
    /// Spawn `size` workers. They stop when `cancel` is triggered.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(size: usize, ctx: Arc<WorkerContext>, cancel: &CancellationToken) -> Self {
        let abort = CancellationToken::new();
        let handles = (0..size)
            .map(|worker| {
                tokio::spawn(run_worker(
                    worker,
                    Arc::clone(&ctx),
                    cancel.clone(),
                    abort.clone(),
                ))
            })
            .collect();
        tracing::info!(size, "Worker pool started");
        Self {
            handles: Mutex::new(handles),
            abort,
            size,
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Wait for every worker to exit. The pool's cancellation token must
    /// already have been triggered.
    ///
    /// Workers still busy once `timeout` has elapsed have their job stopped
    /// and marked failed; a worker that does not exit within a short grace
    /// period after that is aborted outright.
    pub async fn join(&self, timeout: Duration) {
        let handles = {
            let mut guard = self.handles.lock().unwrap_or_else(PoisonError::into_inner);
            std::mem::take(&mut *guard)
        };
        let deadline = tokio::time::Instant::now() + timeout;

        for (worker, mut handle) in handles.into_iter().enumerate() {
            let joined = match tokio::time::timeout_at(deadline, &mut handle).await {
                Ok(joined) => joined,
                Err(_) => {
                    tracing::warn!(worker, "Worker did not stop in time, stopping its job");
                    self.abort.cancel();
                    match tokio::time::timeout(ABORT_GRACE, &mut handle).await {
                        Ok(joined) => joined,
                        Err(_) => {
                            tracing::error!(worker, "Worker ignored abort, killing task");
                            handle.abort();
                            continue;
                        }
                    }
                }
            };
            if let Err(e) = joined {
                tracing::error!(worker, error = %e, "Worker task ended abnormally");
            }
        }
        tracing::info!("Worker pool stopped");
    }
}
