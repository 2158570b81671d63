//! Shared data models for the moodcut editing pipeline.
//!
//! This crate provides Serde-serializable types for:
//! - Collaborator signals (audio windows, transcript segments, face samples)
//! - Fused records and the compacted emotion timeline
//! - Effect segments for zoom and color grading
//! - Video and encoding settings

pub mod effect;
pub mod emotion;
pub mod encoding;
pub mod error;
pub mod signal;
pub mod timeline;
pub mod video;

// Re-export common types
pub use effect::{
    ColorParams, ColorStyle, CropRect, EffectKind, EffectParams, EffectSegment, ZoomParams,
};
pub use emotion::EmotionCategory;
pub use encoding::EncodingConfig;
pub use error::{ModelError, ModelResult};
pub use signal::{AudioWindowSample, FaceSample, TranscriptSegment};
pub use timeline::{CategoryStats, FusedRecord, TimelineSegment, TimelineSummary};
pub use video::VideoInfo;

/// Round a value to two decimal places, the precision used for time keys and
/// serialized timeline values.
#[inline]
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Clamp a value into the unit interval, mapping non-finite input to zero.
#[inline]
pub fn clamp_unit(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round2() {
        assert_eq!(round2(0.875), 0.88);
        assert_eq!(round2(1.234), 1.23);
        assert_eq!(round2(-0.004), -0.0);
    }

    #[test]
    fn test_clamp_unit() {
        assert_eq!(clamp_unit(1.7), 1.0);
        assert_eq!(clamp_unit(-0.2), 0.0);
        assert_eq!(clamp_unit(f64::NAN), 0.0);
        assert_eq!(clamp_unit(0.42), 0.42);
    }
}
