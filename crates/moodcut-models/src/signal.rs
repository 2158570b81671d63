//! Records produced by the external collaborators.
//!
//! These are the data contracts of the audio feature extractor, the transcript
//! emotion classifier and the face detector. All of them are immutable once
//! produced.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::emotion::EmotionCategory;
use crate::error::{ModelError, ModelResult};

/// One analysis window emitted by the audio feature extractor.
///
/// Feature fields are pre-normalized to `[0, 1]` by the extractor.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct AudioWindowSample {
    /// Window start in seconds
    pub time: f64,
    /// Window end in seconds
    pub end_time: f64,
    /// RMS amplitude
    #[serde(default)]
    pub amplitude: f64,
    /// Onset-based speaking rate
    #[serde(default)]
    pub speaking_rate: f64,
    /// Spectral centroid
    #[serde(default)]
    pub spectral_centroid: f64,
}

impl AudioWindowSample {
    /// Create a new audio window sample.
    pub fn new(
        time: f64,
        end_time: f64,
        amplitude: f64,
        speaking_rate: f64,
        spectral_centroid: f64,
    ) -> Self {
        Self {
            time,
            end_time,
            amplitude,
            speaking_rate,
            spectral_centroid,
        }
    }

    /// Window length in seconds.
    pub fn duration(&self) -> f64 {
        self.end_time - self.time
    }
}

/// A transcribed speech segment with its classified emotion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TranscriptSegment {
    /// Segment start in seconds
    pub start: f64,
    /// Segment end in seconds
    pub end: f64,
    /// Transcribed text
    #[serde(default)]
    pub text: String,
    /// Classified emotion
    #[serde(rename = "emotion", alias = "emotion_category", default)]
    pub emotion_category: EmotionCategory,
    /// Classification confidence (0.0 to 1.0)
    #[serde(rename = "emotion_confidence", alias = "confidence", default = "default_confidence")]
    pub confidence: f64,
}

fn default_confidence() -> f64 {
    0.5
}

impl TranscriptSegment {
    /// Create a validated transcript segment.
    pub fn new(
        start: f64,
        end: f64,
        text: impl Into<String>,
        emotion_category: EmotionCategory,
        confidence: f64,
    ) -> ModelResult<Self> {
        let segment = Self {
            start,
            end,
            text: text.into(),
            emotion_category,
            confidence,
        };
        segment.validate()?;
        Ok(segment)
    }

    /// Check the segment invariants (`end > start`, confidence in range).
    pub fn validate(&self) -> ModelResult<()> {
        if !(self.end > self.start) {
            return Err(ModelError::InvalidInterval {
                start: self.start,
                end: self.end,
            });
        }
        if !(0.0..=1.0).contains(&self.confidence) {
            return Err(ModelError::OutOfRange {
                field: "confidence",
                value: self.confidence,
            });
        }
        Ok(())
    }

    /// Interval midpoint in seconds.
    pub fn midpoint(&self) -> f64 {
        (self.start + self.end) / 2.0
    }
}

/// One entry of a face track: the detector result at a sampled time.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct FaceSample {
    /// Sample time in seconds
    pub time: f64,
    /// Whether a face was found at this time
    pub face_detected: bool,
    /// Face center x in pixels
    pub face_center_x: Option<f64>,
    /// Face center y in pixels
    pub face_center_y: Option<f64>,
    /// Detector confidence
    #[serde(default)]
    pub confidence: f64,
}

impl FaceSample {
    /// A sample where a face was found.
    pub fn detected(time: f64, x: f64, y: f64, confidence: f64) -> Self {
        Self {
            time,
            face_detected: true,
            face_center_x: Some(x),
            face_center_y: Some(y),
            confidence,
        }
    }

    /// A sample with no face.
    pub fn missing(time: f64) -> Self {
        Self {
            time,
            ..Default::default()
        }
    }

    /// The face center, if this sample carries a usable detection.
    pub fn center(&self) -> Option<(f64, f64)> {
        if !self.face_detected {
            return None;
        }
        match (self.face_center_x, self.face_center_y) {
            (Some(x), Some(y)) if x.is_finite() && y.is_finite() => Some((x, y)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transcript_validation() {
        assert!(TranscriptSegment::new(1.0, 2.0, "hi", EmotionCategory::Neutral, 0.9).is_ok());
        assert!(TranscriptSegment::new(2.0, 2.0, "hi", EmotionCategory::Neutral, 0.9).is_err());
        assert!(TranscriptSegment::new(1.0, 2.0, "hi", EmotionCategory::Neutral, 1.5).is_err());
    }

    #[test]
    fn test_transcript_field_aliases() {
        let json = r#"{"start": 0.0, "end": 1.0, "text": "wow", "emotion": "joy", "emotion_confidence": 0.8}"#;
        let seg: TranscriptSegment = serde_json::from_str(json).unwrap();
        assert_eq!(seg.emotion_category, EmotionCategory::Excitement);
        assert!((seg.confidence - 0.8).abs() < f64::EPSILON);

        let json = r#"{"start": 0.0, "end": 1.0, "emotion_category": "sadness", "confidence": 0.3}"#;
        let seg: TranscriptSegment = serde_json::from_str(json).unwrap();
        assert_eq!(seg.emotion_category, EmotionCategory::Sadness);
        assert!(seg.text.is_empty());
    }

    #[test]
    fn test_face_sample_center() {
        assert_eq!(FaceSample::detected(0.0, 10.0, 20.0, 0.9).center(), Some((10.0, 20.0)));
        assert_eq!(FaceSample::missing(0.0).center(), None);

        let json = r#"{"time": 1.0, "face_detected": false, "face_center_x": null, "face_center_y": null, "confidence": 0.0}"#;
        let sample: FaceSample = serde_json::from_str(json).unwrap();
        assert!(sample.center().is_none());
    }
}
