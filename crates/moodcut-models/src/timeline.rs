//! Fused records and the compacted emotion timeline.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::emotion::EmotionCategory;
use crate::round2;

/// One time-aligned record combining audio features and transcript emotion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FusedRecord {
    /// Aligned time key in seconds (two-decimal precision)
    pub time: f64,
    /// Interval start in seconds
    pub start: f64,
    /// Interval end in seconds
    pub end: f64,
    /// Weighted acoustic energy (0.0 to 1.0)
    pub energy: f64,
    /// Emotion category
    #[serde(rename = "emotion")]
    pub category: EmotionCategory,
    /// Emotion confidence (0.0 to 1.0)
    #[serde(rename = "emotion_confidence")]
    pub confidence: f64,
    /// Raw amplitude feature
    pub amplitude: f64,
    /// Raw speaking-rate feature
    pub speaking_rate: f64,
    /// Raw spectral-centroid feature
    pub spectral_centroid: f64,
    /// Transcript text at this key, empty when absent
    #[serde(default)]
    pub text: String,
}

impl FusedRecord {
    /// Interval length in seconds.
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

/// A canonical, compacted timeline entry.
///
/// This is the record written to the timeline file:
/// `{"start": 0.0, "end": 4.0, "emotion": "excitement", "energy": 0.88}`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TimelineSegment {
    /// Start in seconds
    pub start: f64,
    /// End in seconds
    pub end: f64,
    /// Emotion category
    #[serde(rename = "emotion")]
    pub category: EmotionCategory,
    /// Energy (0.0 to 1.0)
    #[serde(default)]
    pub energy: f64,
}

impl TimelineSegment {
    /// Create a new timeline segment.
    pub fn new(start: f64, end: f64, category: EmotionCategory, energy: f64) -> Self {
        Self {
            start,
            end,
            category,
            energy,
        }
    }

    /// Segment length in seconds.
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// Segment midpoint in seconds.
    pub fn midpoint(&self) -> f64 {
        (self.start + self.end) / 2.0
    }

    /// Copy with every value rounded to two decimals for serialization.
    pub fn rounded(&self) -> Self {
        Self {
            start: round2(self.start),
            end: round2(self.end),
            category: self.category,
            energy: round2(self.energy),
        }
    }
}

/// Aggregate statistics for one emotion category.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct CategoryStats {
    /// Number of segments
    pub count: usize,
    /// Total duration in seconds
    pub total_duration: f64,
    /// Duration-weighted average energy
    pub avg_energy: f64,
}

/// Summary of a whole timeline.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct TimelineSummary {
    /// Per-category statistics
    pub categories: BTreeMap<EmotionCategory, CategoryStats>,
    /// Sum of segment durations in seconds
    pub total_duration: f64,
    /// Duration-weighted average energy over all segments
    pub avg_energy: f64,
    /// Number of segments
    pub total_segments: usize,
}

impl TimelineSummary {
    /// Statistics for one category, if present.
    pub fn category(&self, category: EmotionCategory) -> Option<&CategoryStats> {
        self.categories.get(&category)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeline_segment_file_format() {
        let seg = TimelineSegment::new(0.0, 4.0, EmotionCategory::Excitement, 0.875).rounded();
        let json = serde_json::to_value(seg).unwrap();
        assert_eq!(json["emotion"], "excitement");
        assert_eq!(json["energy"], 0.88);
        assert_eq!(json["end"], 4.0);
    }

    #[test]
    fn test_timeline_segment_parse() {
        let json = r#"[{"start": 1.25, "end": 3.5, "emotion": "sadness", "energy": 0.31}]"#;
        let segs: Vec<TimelineSegment> = serde_json::from_str(json).unwrap();
        assert_eq!(segs.len(), 1);
        assert_eq!(segs[0].category, EmotionCategory::Sadness);
        assert!((segs[0].duration() - 2.25).abs() < 1e-9);
    }
}
