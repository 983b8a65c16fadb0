//! In-process job registry.
//!
//! [`JobStore`] is the single source of truth for job state. Every state
//! change goes through [`JobStore::compare_and_transition`], which
//! serializes writers per job id.

pub mod job_store;

pub use job_store::{JobListQuery, JobStore};
