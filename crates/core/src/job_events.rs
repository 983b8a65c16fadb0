//! Event names for the per-job push feed.
//!
//! Used by `songreel-events` when tagging events and by the API's
//! server-sent-events route as the SSE `event:` field.

/// Snapshot of state and progress, sent once when a subscription opens.
pub const EVENT_STATUS: &str = "status";

/// Progress update during job execution (percentage).
pub const EVENT_PROGRESS: &str = "progress";

/// Job completed successfully; carries the result.
pub const EVENT_COMPLETED: &str = "completed";

/// Job failed, or the subscribed job does not exist; carries the reason.
pub const EVENT_FAILED: &str = "failed";

/// Job was canceled by a caller.
pub const EVENT_CANCELED: &str = "canceled";

/// Keep-alive sent to every open subscription.
pub const EVENT_PING: &str = "ping";
