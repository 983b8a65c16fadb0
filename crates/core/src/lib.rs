//! Domain types shared by every songreel crate.
//!
//! Holds the job record model, the lifecycle state machine, payload
//! validation, the segment progress policy, and the error taxonomy.
//! Has no async or I/O dependencies.

pub mod error;
pub mod job;
pub mod job_events;
pub mod payload;
pub mod progress;
pub mod status;
pub mod types;
