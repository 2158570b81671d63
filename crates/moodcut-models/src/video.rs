//! Video metadata models.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Basic properties of a source video.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct VideoInfo {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Frame rate (fps)
    pub fps: f64,
    /// Duration in seconds
    pub duration: f64,
}

impl Default for VideoInfo {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
            fps: 30.0,
            duration: 0.0,
        }
    }
}

impl VideoInfo {
    /// Create video info.
    pub fn new(width: u32, height: u32, fps: f64, duration: f64) -> Self {
        Self {
            width,
            height,
            fps,
            duration,
        }
    }

    /// Frame center in pixels.
    pub fn center(&self) -> (f64, f64) {
        (self.width as f64 / 2.0, self.height as f64 / 2.0)
    }

    /// Duration to plan over: the probed duration, or the given fallback
    /// (usually the end of the timeline) when the probe reported none.
    pub fn effective_duration(&self, fallback: f64) -> f64 {
        if self.duration > 0.0 && self.duration.is_finite() {
            self.duration
        } else {
            fallback.max(0.0)
        }
    }
}
