//! Feature fusion of audio windows and transcript emotions.
//!
//! The audio feature extractor and the transcript classifier sample time
//! independently: audio in fixed overlapping windows, transcript in variable
//! speech segments. Fusion aligns both onto one key space (time rounded to
//! hundredths of a second) and produces one [`FusedRecord`] per distinct key.
//!
//! - Audio samples are keyed by window start; a later sample with the same key
//!   replaces the earlier one.
//! - Transcript segments are keyed by interval midpoint; on collision the
//!   higher confidence wins and ties keep the first seen.
//! - Missing sides degrade to defaults: zero audio features, `neutral` at the
//!   default confidence.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use moodcut_models::{
    clamp_unit, AudioWindowSample, EmotionCategory, FusedRecord, TranscriptSegment,
};

/// Weights of the energy formula.
///
/// The weights are not required to sum to one; the result is clipped.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnergyWeights {
    /// Weight of the RMS amplitude
    pub amplitude: f64,
    /// Weight of the speaking rate
    pub speaking_rate: f64,
    /// Weight of the spectral centroid
    pub spectral_centroid: f64,
}

impl Default for EnergyWeights {
    fn default() -> Self {
        Self {
            amplitude: 0.4,
            speaking_rate: 0.3,
            spectral_centroid: 0.3,
        }
    }
}

/// Configuration for [`FeatureFusionEngine`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FusionConfig {
    /// Energy formula weights
    pub weights: EnergyWeights,
    /// Window length assumed for keys that have no audio sample (seconds)
    pub default_window: f64,
    /// Confidence used when no transcript segment lands on a key
    pub default_confidence: f64,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            weights: EnergyWeights::default(),
            default_window: 0.5,
            default_confidence: 0.5,
        }
    }
}

impl FusionConfig {
    /// Builder-style setter for the energy weights. Negative weights become zero.
    pub fn with_weights(mut self, amplitude: f64, speaking_rate: f64, spectral_centroid: f64) -> Self {
        self.weights = EnergyWeights {
            amplitude: amplitude.max(0.0),
            speaking_rate: speaking_rate.max(0.0),
            spectral_centroid: spectral_centroid.max(0.0),
        };
        self
    }

    /// Builder-style setter for the default window length.
    pub fn with_default_window(mut self, seconds: f64) -> Self {
        self.default_window = seconds.max(0.01);
        self
    }
}

/// Time key in integer hundredths of a second.
pub fn time_key(seconds: f64) -> Option<i64> {
    if seconds.is_finite() {
        Some((seconds * 100.0).round() as i64)
    } else {
        None
    }
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

/// Combines audio windows and transcript emotions into fused records.
#[derive(Debug, Clone, Default)]
pub struct FeatureFusionEngine {
    config: FusionConfig,
}

impl FeatureFusionEngine {
    /// Create a fusion engine with the given configuration.
    pub fn new(config: FusionConfig) -> Self {
        Self { config }
    }

    /// Access the configuration.
    pub fn config(&self) -> &FusionConfig {
        &self.config
    }

    /// Weighted energy of one audio window, clipped to `[0, 1]`.
    pub fn calculate_energy(&self, sample: &AudioWindowSample) -> f64 {
        let w = &self.config.weights;
        let energy = w.amplitude * finite_or_zero(sample.amplitude)
            + w.speaking_rate * finite_or_zero(sample.speaking_rate)
            + w.spectral_centroid * finite_or_zero(sample.spectral_centroid);
        clamp_unit(energy)
    }

    /// Fuse both streams into one record per distinct time key, sorted by time.
    pub fn fuse(
        &self,
        audio: &[AudioWindowSample],
        transcript: &[TranscriptSegment],
    ) -> Vec<FusedRecord> {
        let mut audio_by_key: BTreeMap<i64, &AudioWindowSample> = BTreeMap::new();
        for sample in audio {
            match time_key(sample.time) {
                Some(key) => {
                    audio_by_key.insert(key, sample);
                }
                None => debug!(time = sample.time, "Skipping audio window with non-finite time"),
            }
        }

        let mut transcript_by_key: BTreeMap<i64, &TranscriptSegment> = BTreeMap::new();
        for segment in transcript {
            let Some(key) = time_key(segment.midpoint()) else {
                debug!(start = segment.start, "Skipping transcript segment with non-finite bounds");
                continue;
            };
            match transcript_by_key.get(&key) {
                Some(existing) if existing.confidence >= segment.confidence => {}
                _ => {
                    transcript_by_key.insert(key, segment);
                }
            }
        }

        let mut keys: Vec<i64> = audio_by_key
            .keys()
            .chain(transcript_by_key.keys())
            .copied()
            .collect();
        keys.sort_unstable();
        keys.dedup();

        let records: Vec<FusedRecord> = keys
            .into_iter()
            .map(|key| {
                let time = key as f64 / 100.0;
                let audio = audio_by_key.get(&key).copied();
                let speech = transcript_by_key.get(&key).copied();
                self.fuse_key(time, audio, speech)
            })
            .collect();

        debug!(
            audio_samples = audio.len(),
            transcript_segments = transcript.len(),
            fused = records.len(),
            "Fused audio and transcript streams"
        );

        records
    }

    fn fuse_key(
        &self,
        time: f64,
        audio: Option<&AudioWindowSample>,
        speech: Option<&TranscriptSegment>,
    ) -> FusedRecord {
        let features = audio.copied().unwrap_or_default();
        let energy = self.calculate_energy(&features);

        let (mut start, mut end) = match audio {
            Some(sample) => (sample.time, sample.end_time.max(sample.time)),
            None => (time, time + self.config.default_window),
        };

        let (category, confidence, text) = match speech {
            Some(segment) => {
                start = start.min(segment.start);
                end = end.max(segment.end);
                (
                    segment.emotion_category,
                    clamp_unit(segment.confidence),
                    segment.text.clone(),
                )
            }
            None => (
                EmotionCategory::Neutral,
                self.config.default_confidence,
                String::new(),
            ),
        };

        FusedRecord {
            time,
            start,
            end,
            energy,
            category,
            confidence,
            amplitude: finite_or_zero(features.amplitude),
            speaking_rate: finite_or_zero(features.speaking_rate),
            spectral_centroid: finite_or_zero(features.spectral_centroid),
            text,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window(time: f64, amp: f64) -> AudioWindowSample {
        AudioWindowSample::new(time, time + 1.0, amp, amp, amp)
    }

    #[test]
    fn test_calculate_energy_weights() {
        let engine = FeatureFusionEngine::default();
        let sample = AudioWindowSample::new(0.0, 1.0, 1.0, 0.0, 0.0);
        assert!((engine.calculate_energy(&sample) - 0.4).abs() < 1e-9);

        let sample = AudioWindowSample::new(0.0, 1.0, 0.5, 0.5, 0.5);
        assert!((engine.calculate_energy(&sample) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_calculate_energy_clipped() {
        let engine = FeatureFusionEngine::new(FusionConfig::default().with_weights(1.0, 1.0, 1.0));
        let sample = AudioWindowSample::new(0.0, 1.0, 0.9, 0.9, 0.9);
        assert_eq!(engine.calculate_energy(&sample), 1.0);

        let sample = AudioWindowSample::new(0.0, 1.0, f64::NAN, 0.1, 0.0);
        assert!((engine.calculate_energy(&sample) - 0.1).abs() < 1e-9);
    }

    #[test]
    fn test_fuse_union_of_keys() {
        let engine = FeatureFusionEngine::default();
        let audio = vec![window(0.0, 0.5), window(0.5, 0.8)];
        let transcript =
            vec![TranscriptSegment::new(1.0, 3.0, "wow", EmotionCategory::Excitement, 0.9).unwrap()];

        let fused = engine.fuse(&audio, &transcript);
        let times: Vec<f64> = fused.iter().map(|r| r.time).collect();
        assert_eq!(times, vec![0.0, 0.5, 2.0]);

        // Transcript-only key: zero energy, default window widened to the segment
        let speech_only = &fused[2];
        assert_eq!(speech_only.energy, 0.0);
        assert_eq!(speech_only.category, EmotionCategory::Excitement);
        assert_eq!(speech_only.start, 1.0);
        assert_eq!(speech_only.end, 3.0);
        assert_eq!(speech_only.text, "wow");

        // Audio-only key: neutral at default confidence
        assert_eq!(fused[0].category, EmotionCategory::Neutral);
        assert!((fused[0].confidence - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_fuse_widens_audio_window() {
        let engine = FeatureFusionEngine::default();
        let audio = vec![window(2.0, 0.5)];
        let transcript =
            vec![TranscriptSegment::new(1.5, 2.5, "", EmotionCategory::Sadness, 0.7).unwrap()];

        let fused = engine.fuse(&audio, &transcript);
        assert_eq!(fused.len(), 1);
        assert_eq!(fused[0].start, 1.5);
        assert_eq!(fused[0].end, 3.0);
        assert_eq!(fused[0].category, EmotionCategory::Sadness);
    }

    #[test]
    fn test_transcript_collision_keeps_higher_confidence() {
        let engine = FeatureFusionEngine::default();
        let transcript = vec![
            TranscriptSegment::new(0.0, 2.0, "a", EmotionCategory::Sadness, 0.6).unwrap(),
            TranscriptSegment::new(0.5, 1.5, "b", EmotionCategory::Anger, 0.9).unwrap(),
            TranscriptSegment::new(0.9, 1.1, "c", EmotionCategory::Excitement, 0.9).unwrap(),
        ];

        let fused = engine.fuse(&[], &transcript);
        assert_eq!(fused.len(), 1);
        assert_eq!(fused[0].category, EmotionCategory::Anger);
        assert_eq!(fused[0].text, "b");
    }

    #[test]
    fn test_audio_collision_keeps_later() {
        let engine = FeatureFusionEngine::default();
        let audio = vec![window(1.001, 0.1), window(1.0, 0.9)];
        let fused = engine.fuse(&audio, &[]);
        assert_eq!(fused.len(), 1);
        assert!((fused[0].amplitude - 0.9).abs() < 1e-9);
    }

    #[test]
    fn test_fuse_empty() {
        assert!(FeatureFusionEngine::default().fuse(&[], &[]).is_empty());
    }
}
