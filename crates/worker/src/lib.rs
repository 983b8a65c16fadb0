//! Job execution engine.
//!
//! - [`ExecutionQueue`]: FIFO handoff of job ids to workers.
//! - [`WorkerPool`]: fixed set of tokio tasks running the worker loop.
//! - [`JobOrchestrator`]: the service façade (submit, status, cancel,
//!   subscribe) that owns the store, queue, broadcaster and pool.

pub mod config;
pub mod orchestrator;
pub mod pool;
pub mod queue;
pub mod runner;

pub use config::EngineConfig;
pub use orchestrator::JobOrchestrator;
pub use pool::WorkerPool;
pub use queue::ExecutionQueue;
pub use runner::{WorkerContext, WORKER_ABORTED};
