//! Receiving handle for one job's event feed.

use std::pin::Pin;
use std::sync::Weak;
use std::task::{Context, Poll};

use futures::Stream;
use songreel_core::types::JobId;
use tokio::sync::mpsc;

use crate::broadcaster::{lock_registry, Registry, SubscriberId};
use crate::event::JobEvent;

/// A live subscription to one job.
///
/// Yields events in emission order and ends after the terminal event.
/// Dropping the handle (or calling [`unsubscribe`](Self::unsubscribe))
/// releases its registration immediately; other subscribers of the same
/// job and the job itself are unaffected.
pub struct Subscription {
    job_id: JobId,
    subscriber_id: SubscriberId,
    rx: mpsc::UnboundedReceiver<JobEvent>,
    /// `None` when the stream was closed at subscription time.
    registry: Option<Weak<Registry>>,
}

impl Subscription {
    pub(crate) fn registered(
        job_id: JobId,
        subscriber_id: SubscriberId,
        rx: mpsc::UnboundedReceiver<JobEvent>,
        registry: Weak<Registry>,
    ) -> Self {
        Self {
            job_id,
            subscriber_id,
            rx,
            registry: Some(registry),
        }
    }

    pub(crate) fn closed(
        job_id: JobId,
        subscriber_id: SubscriberId,
        rx: mpsc::UnboundedReceiver<JobEvent>,
    ) -> Self {
        Self {
            job_id,
            subscriber_id,
            rx,
            registry: None,
        }
    }

    pub fn job_id(&self) -> JobId {
        self.job_id
    }

    /// Wait for the next event. `None` once the feed has ended.
    pub async fn recv(&mut self) -> Option<JobEvent> {
        self.rx.recv().await
    }

    /// Take an already-delivered event without waiting.
    pub fn try_recv(&mut self) -> Option<JobEvent> {
        self.rx.try_recv().ok()
    }

    /// Stop receiving events for this job.
    pub fn unsubscribe(self) {}

    fn deregister(&mut self) {
        let Some(shared) = self.registry.take().and_then(|weak| weak.upgrade()) else {
            return;
        };
        let mut registry = lock_registry(&shared);
        if let Some(subscribers) = registry.get_mut(&self.job_id) {
            if subscribers.remove(&self.subscriber_id).is_some() {
                tracing::debug!(
                    job_id = %self.job_id,
                    subscriber_id = self.subscriber_id,
                    "Subscriber released"
                );
            }
            if subscribers.is_empty() {
                registry.remove(&self.job_id);
            }
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.deregister();
    }
}

impl Stream for Subscription {
    type Item = JobEvent;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<JobEvent>> {
        self.get_mut().rx.poll_recv(cx)
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("job_id", &self.job_id)
            .field("subscriber_id", &self.subscriber_id)
            .field("registered", &self.registry.is_some())
            .finish()
    }
}
