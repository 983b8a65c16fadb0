//! Per-job subscriber registry.
//!
//! Each subscriber owns an unbounded channel; the broadcaster keeps the
//! sending halves keyed by job id and subscriber id. The registry sits
//! behind a synchronous mutex so a [`Subscription`] can deregister itself
//! from `Drop`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use songreel_core::job::JobRecord;
use songreel_core::types::JobId;
use tokio::sync::mpsc;

use crate::event::JobEvent;
use crate::subscription::Subscription;

/// Identifier of one subscription, unique per broadcaster.
pub type SubscriberId = u64;

/// Channel sender half feeding one subscription.
pub type EventSender = mpsc::UnboundedSender<JobEvent>;

type Subscribers = HashMap<JobId, HashMap<SubscriberId, EventSender>>;

pub(crate) type Registry = Mutex<Subscribers>;

pub(crate) fn lock_registry(registry: &Registry) -> MutexGuard<'_, Subscribers> {
    registry.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Fans job events out to the live subscribers of each job.
///
/// Designed to be wrapped in `Arc` and shared between the orchestrator,
/// the workers and the heartbeat task.
pub struct EventBroadcaster {
    registry: Arc<Registry>,
    next_id: AtomicU64,
}

impl EventBroadcaster {
    pub fn new() -> Self {
        Self {
            registry: Arc::new(Mutex::new(HashMap::new())),
            next_id: AtomicU64::new(1),
        }
    }

    /// Open a subscription to one job.
    ///
    /// `snapshot` reads the job from the store and runs while the registry
    /// is locked, so no event published for the job can slip in between
    /// the snapshot and the registration. It must not call back into the
    /// broadcaster.
    ///
    /// - unknown job: a single synthetic `failed` event, then closed;
    /// - terminal job: `status` followed by the terminal event, then closed;
    /// - otherwise: `status`, then live events until a terminal one.
    pub fn subscribe<F>(&self, job_id: JobId, snapshot: F) -> Subscription
    where
        F: FnOnce() -> Option<JobRecord>,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        let subscriber_id = self.next_id.fetch_add(1, Ordering::Relaxed);

        let mut registry = lock_registry(&self.registry);
        let Some(record) = snapshot() else {
            let _ = tx.send(JobEvent::not_found(job_id));
            tracing::debug!(job_id = %job_id, "Subscription to unknown job");
            return Subscription::closed(job_id, subscriber_id, rx);
        };

        let _ = tx.send(JobEvent::status_of(&record));
        if let Some(terminal) = JobEvent::terminal_for(&record) {
            let _ = tx.send(terminal);
            tracing::debug!(job_id = %job_id, state = %record.state, "Subscription to finished job");
            return Subscription::closed(job_id, subscriber_id, rx);
        }

        registry
            .entry(job_id)
            .or_default()
            .insert(subscriber_id, tx);
        tracing::debug!(job_id = %job_id, subscriber_id, "Subscriber registered");

        Subscription::registered(job_id, subscriber_id, rx, Arc::downgrade(&self.registry))
    }

    /// Deliver an event to every subscriber of its job.
    ///
    /// Subscribers whose receiving end is gone are pruned. A terminal event
    /// removes the job's entry, closing every stream and dropping any late
    /// events for that job. Heartbeats go to all subscribers of all jobs.
    pub fn publish(&self, event: JobEvent) {
        let Some(job_id) = event.job_id() else {
            self.broadcast_all(event);
            return;
        };

        let mut registry = lock_registry(&self.registry);
        let Some(subscribers) = registry.get_mut(&job_id) else {
            return;
        };

        subscribers.retain(|_, tx| tx.send(event.clone()).is_ok());
        let delivered = subscribers.len();

        if event.is_terminal() || subscribers.is_empty() {
            registry.remove(&job_id);
        }
        tracing::trace!(job_id = %job_id, event = event.name(), delivered, "Event published");
    }

    /// Send a heartbeat to every open subscription. Returns the number of
    /// subscriptions still alive.
    pub fn heartbeat(&self) -> usize {
        self.broadcast_all(JobEvent::heartbeat())
    }

    fn broadcast_all(&self, event: JobEvent) -> usize {
        let mut registry = lock_registry(&self.registry);
        for subscribers in registry.values_mut() {
            subscribers.retain(|_, tx| tx.send(event.clone()).is_ok());
        }
        registry.retain(|_, subscribers| !subscribers.is_empty());
        registry.values().map(HashMap::len).sum()
    }

    /// Number of live subscribers of one job.
    pub fn subscriber_count(&self, job_id: JobId) -> usize {
        lock_registry(&self.registry)
            .get(&job_id)
            .map_or(0, HashMap::len)
    }

    /// Number of live subscribers across all jobs.
    pub fn total_subscribers(&self) -> usize {
        lock_registry(&self.registry)
            .values()
            .map(HashMap::len)
            .sum()
    }

    /// End every subscription to one job without sending anything.
    ///
    /// Used when a job is removed from the store before it finished.
    pub fn close_job(&self, job_id: JobId) -> usize {
        lock_registry(&self.registry)
            .remove(&job_id)
            .map_or(0, |subscribers| subscribers.len())
    }

    /// Drop every registration, ending all open streams.
    ///
    /// Used during graceful shutdown.
    pub fn close_all(&self) {
        let mut registry = lock_registry(&self.registry);
        let count: usize = registry.values().map(HashMap::len).sum();
        registry.clear();
        tracing::info!(count, "Closed all job subscriptions");
    }
}

impl Default for EventBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
