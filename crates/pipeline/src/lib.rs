//! Render pipeline seam.
//!
//! The worker loop only knows the [`PipelineExecutor`] trait: render one
//! segment at a time, then assemble the segments into a final result.
//! [`SimulatedRenderer`] stands in for real media synthesis.

pub mod executor;
pub mod simulated;

pub use executor::{PipelineError, PipelineExecutor};
pub use simulated::{RendererConfig, SimulatedRenderer};
