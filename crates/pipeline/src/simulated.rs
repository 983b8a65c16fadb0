//! Stand-in renderer that sleeps per segment and returns canned URLs.
//!
//! Used by the API binary until a real media backend is wired in, and by
//! tests with a zero delay.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use songreel_core::payload::{JobPayload, MODE_PERFORMANCE};

use crate::executor::{PipelineError, PipelineExecutor};

/// Settings for [`SimulatedRenderer`].
#[derive(Debug, Clone)]
pub struct RendererConfig {
    /// Time spent "rendering" each segment (default: 800 ms).
    pub segment_delay: Duration,
    /// Public base URL the output links are built from
    /// (default: `http://localhost:5000`).
    pub public_base_url: String,
}

impl RendererConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var           | Default                 |
    /// |-------------------|-------------------------|
    /// | `SEGMENT_DELAY_MS`| `800`                   |
    /// | `PUBLIC_BASE_URL` | `http://localhost:5000` |
    pub fn from_env() -> Self {
        let segment_delay_ms: u64 = std::env::var("SEGMENT_DELAY_MS")
            .unwrap_or_else(|_| "800".into())
            .parse()
            .expect("SEGMENT_DELAY_MS must be a valid u64");

        let public_base_url = std::env::var("PUBLIC_BASE_URL")
            .unwrap_or_else(|_| "http://localhost:5000".into())
            .trim_end_matches('/')
            .to_string();

        Self {
            segment_delay: Duration::from_millis(segment_delay_ms),
            public_base_url,
        }
    }
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            segment_delay: Duration::from_millis(800),
            public_base_url: "http://localhost:5000".to_string(),
        }
    }
}

/// Renderer that fakes work with a fixed delay per segment.
pub struct SimulatedRenderer {
    config: RendererConfig,
}

impl SimulatedRenderer {
    pub fn new(config: RendererConfig) -> Self {
        Self { config }
    }

    fn static_url(&self, file: &str) -> String {
        format!("{}/static/{file}", self.config.public_base_url)
    }
}

#[async_trait]
impl PipelineExecutor for SimulatedRenderer {
    async fn render_segment(
        &self,
        payload: &JobPayload,
        index: u32,
        total: u32,
    ) -> Result<Value, PipelineError> {
        if !self.config.segment_delay.is_zero() {
            tokio::time::sleep(self.config.segment_delay).await;
        }
        tracing::trace!(mode = %payload.visual_mode, index, total, "Segment rendered");
        Ok(json!({
            "index": index,
            "uri": self.static_url(&format!("segments/{index:04}.mp4")),
        }))
    }

    async fn assemble(
        &self,
        payload: &JobPayload,
        segments: Vec<Value>,
    ) -> Result<Value, PipelineError> {
        if segments.is_empty() {
            return Err(PipelineError::Assembly("no segments rendered".to_string()));
        }

        let mut result = json!({
            "finalVideoUrl": self.static_url("final.mp4"),
            "mode": payload.visual_mode,
        });
        // Only the performer render produces a separate low-res preview.
        if payload.visual_mode == MODE_PERFORMANCE {
            result["previewVideoUrl"] = json!(self.static_url("preview.mp4"));
        }
        Ok(result)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
