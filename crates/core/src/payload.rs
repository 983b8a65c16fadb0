//! Render job payload and submission-time validation.
//!
//! The payload carries references to already-uploaded media (never the
//! bytes themselves), the visual mode, and an optional segment count.
//! Anything else the client sends (style preset, aspect ratio, seed, ...)
//! is kept verbatim in [`JobPayload::options`] for the pipeline executor.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Visual modes
// ---------------------------------------------------------------------------

/// Audio-reactive visualizer. Needs only the audio track.
pub const MODE_VISUALIZER: &str = "visualizer";
/// Performer lip-sync render. Needs a performer image in addition to audio.
pub const MODE_PERFORMANCE: &str = "performance";
/// Story-driven render. Needs only the audio track.
pub const MODE_NARRATIVE: &str = "narrative";

/// Modes that cannot be rendered without `performanceImageRef`.
pub const MODES_REQUIRING_IMAGE: &[&str] = &[MODE_PERFORMANCE];

// ---------------------------------------------------------------------------
// Segment limits
// ---------------------------------------------------------------------------

/// Segment count used when the payload does not specify one.
pub const DEFAULT_SEGMENTS: u32 = 12;
/// Hard ceiling on segments per job to prevent runaway renders.
pub const MAX_SEGMENTS: u32 = 500;

// ---------------------------------------------------------------------------
// Payload
// ---------------------------------------------------------------------------

/// Caller-supplied input for one render job. Immutable once queued.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobPayload {
    /// Mode selector, e.g. `"visualizer"` or `"performance"`.
    #[serde(default)]
    pub visual_mode: String,

    /// Reference (URL or upload id) of the audio track.
    #[serde(default)]
    pub audio_ref: String,

    /// Reference of the performer image; mandatory for `performance` mode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub performance_image_ref: Option<String>,

    /// Number of segments to partition the render into.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub segments: Option<i64>,

    /// Remaining mode-specific parameters, passed through untouched.
    #[serde(flatten)]
    pub options: serde_json::Map<String, serde_json::Value>,
}

impl JobPayload {
    /// Create a payload with only the two fields every mode requires.
    pub fn new(visual_mode: impl Into<String>, audio_ref: impl Into<String>) -> Self {
        Self {
            visual_mode: visual_mode.into(),
            audio_ref: audio_ref.into(),
            performance_image_ref: None,
            segments: None,
            options: serde_json::Map::new(),
        }
    }

    /// Attach the performer image reference.
    pub fn with_performance_image(mut self, image_ref: impl Into<String>) -> Self {
        self.performance_image_ref = Some(image_ref.into());
        self
    }

    /// Request an explicit segment count.
    pub fn with_segments(mut self, segments: i64) -> Self {
        self.segments = Some(segments);
        self
    }

    /// Attach a pass-through option.
    pub fn with_option(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.options.insert(key.into(), value);
        self
    }

    /// Check the mode-specific required fields.
    ///
    /// Unknown modes are accepted; only the rules for known modes and the
    /// universal fields are enforced here.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.visual_mode.trim().is_empty() {
            return Err(CoreError::Validation("Missing visualMode".to_string()));
        }
        if self.audio_ref.trim().is_empty() {
            return Err(CoreError::Validation("Missing audioRef".to_string()));
        }
        if MODES_REQUIRING_IMAGE.contains(&self.visual_mode.as_str()) && !self.has_image() {
            return Err(CoreError::Validation(format!(
                "Missing performanceImageRef (required for {} mode)",
                self.visual_mode
            )));
        }
        if let Some(segments) = self.segments {
            if segments < 1 || segments > i64::from(MAX_SEGMENTS) {
                return Err(CoreError::Validation(format!(
                    "segments must be between 1 and {MAX_SEGMENTS}, got {segments}"
                )));
            }
        }
        Ok(())
    }

    /// Segment count for this job, falling back to `default` when unset.
    ///
    /// Always at least 1 and at most [`MAX_SEGMENTS`], even for payloads
    /// that skipped validation.
    pub fn segment_count(&self, default: u32) -> u32 {
        let requested = self.segments.unwrap_or_else(|| i64::from(default));
        requested.clamp(1, i64::from(MAX_SEGMENTS)) as u32
    }

    fn has_image(&self) -> bool {
        self.performance_image_ref
            .as_deref()
            .is_some_and(|r| !r.trim().is_empty())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
