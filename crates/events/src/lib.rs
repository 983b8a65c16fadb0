//! Per-job event fan-out for the render job service.
//!
//! - [`EventBroadcaster`]: registry mapping each job id to its live
//!   subscribers, each fed through its own unbounded channel.
//! - [`JobEvent`]: the lifecycle events pushed to subscribers.
//! - [`Subscription`]: receiving handle; dropping it unsubscribes.
//! - [`start_heartbeat`]: background keep-alive task.

pub mod broadcaster;
pub mod event;
pub mod heartbeat;
pub mod subscription;

pub use broadcaster::EventBroadcaster;
pub use event::JobEvent;
pub use heartbeat::start_heartbeat;
pub use subscription::Subscription;
