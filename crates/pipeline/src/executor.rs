//! The executor trait every render backend implements.

use async_trait::async_trait;
use serde_json::Value;
use songreel_core::payload::JobPayload;

/// Failures raised by a pipeline executor.
///
/// The worker records these on the job as its failure reason; they never
/// reach the submitter directly.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Segment {index} failed: {message}")]
    SegmentFailed { index: u32, message: String },

    #[error("Assembly failed: {0}")]
    Assembly(String),
}

/// A render backend driven segment by segment.
///
/// Calls for one job are strictly sequential: `render_segment` for
/// `index = 0..total`, then `assemble` once with every segment output in
/// order. Cancellation is cooperative and happens between calls, so a
/// single call may run to completion after its job was canceled.
#[async_trait]
pub trait PipelineExecutor: Send + Sync {
    /// Render one segment and return its artifact descriptor.
    async fn render_segment(
        &self,
        payload: &JobPayload,
        index: u32,
        total: u32,
    ) -> Result<Value, PipelineError>;

    /// Combine the rendered segments into the job's final result.
    async fn assemble(
        &self,
        payload: &JobPayload,
        segments: Vec<Value>,
    ) -> Result<Value, PipelineError>;
}
