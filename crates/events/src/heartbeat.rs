use std::sync::Arc;
use std::time::Duration;

use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::broadcaster::EventBroadcaster;

/// Spawn a background task that sends a `ping` event to every open
/// subscription once per `interval`.
///
/// Sending also prunes subscribers whose receiving end has gone away
/// without unsubscribing. The task runs until `cancel` is triggered.
pub fn start_heartbeat(
    broadcaster: Arc<EventBroadcaster>,
    interval: Duration,
    cancel: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval_at(Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::debug!("Heartbeat task stopped");
                    break;
                }
                _ = ticker.tick() => {
                    let alive = broadcaster.heartbeat();
                    tracing::debug!(alive, "Subscription heartbeat");
                }
            }
        }
    })
}
