//! External analysis collaborators.
//!
//! The pipeline never computes audio features, transcripts or face positions
//! itself. It asks these collaborators, which are injected at construction.
//! The JSON-backed implementations replay precomputed output from disk.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{info, warn};

use moodcut_models::{AudioWindowSample, FaceSample, TranscriptSegment, VideoInfo};

use crate::error::MediaResult;
use crate::io::read_json_array;

/// Produces audio feature windows for a source video.
#[async_trait]
pub trait AudioFeatureExtractor: Send + Sync {
    /// Feature windows in time order, fields normalized to `[0, 1]`.
    async fn extract(&self, source: &Path) -> MediaResult<Vec<AudioWindowSample>>;
}

/// Transcribes a source video and classifies each segment's emotion.
#[async_trait]
pub trait TranscriptEmotionClassifier: Send + Sync {
    /// Transcript segments with emotion labels.
    async fn classify(&self, source: &Path) -> MediaResult<Vec<TranscriptSegment>>;
}

/// Samples face positions across a source video.
#[async_trait]
pub trait FaceDetector: Send + Sync {
    /// At most one sample per sampled time.
    async fn detect(&self, source: &Path, video: &VideoInfo) -> MediaResult<Vec<FaceSample>>;
}

/// Audio features read from an `audio_features.json` file.
#[derive(Debug, Clone)]
pub struct JsonAudioFeatures {
    path: PathBuf,
}

impl JsonAudioFeatures {
    /// Read features from `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl AudioFeatureExtractor for JsonAudioFeatures {
    async fn extract(&self, _source: &Path) -> MediaResult<Vec<AudioWindowSample>> {
        let mut samples: Vec<AudioWindowSample> = read_json_array(&self.path).await?;
        samples.sort_by(|a, b| a.time.total_cmp(&b.time));
        info!(path = %self.path.display(), windows = samples.len(), "Loaded audio features");
        Ok(samples)
    }
}

/// Transcript read from a `transcript.json` file.
///
/// Segments that break their invariants are skipped with a warning.
#[derive(Debug, Clone)]
pub struct JsonTranscript {
    path: PathBuf,
}

impl JsonTranscript {
    /// Read the transcript from `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl TranscriptEmotionClassifier for JsonTranscript {
    async fn classify(&self, _source: &Path) -> MediaResult<Vec<TranscriptSegment>> {
        let raw: Vec<TranscriptSegment> = read_json_array(&self.path).await?;
        let total = raw.len();
        let segments: Vec<TranscriptSegment> = raw
            .into_iter()
            .filter(|segment| match segment.validate() {
                Ok(()) => true,
                Err(e) => {
                    warn!(start = segment.start, end = segment.end, error = %e, "Skipping transcript segment");
                    false
                }
            })
            .collect();
        info!(
            path = %self.path.display(),
            segments = segments.len(),
            skipped = total - segments.len(),
            "Loaded transcript"
        );
        Ok(segments)
    }
}

/// Face track read from a face-track file.
#[derive(Debug, Clone)]
pub struct JsonFaceTrack {
    path: PathBuf,
}

impl JsonFaceTrack {
    /// Read the face track from `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl FaceDetector for JsonFaceTrack {
    async fn detect(&self, _source: &Path, _video: &VideoInfo) -> MediaResult<Vec<FaceSample>> {
        let samples: Vec<FaceSample> = read_json_array(&self.path).await?;
        let detected = samples.iter().filter(|s| s.center().is_some()).count();
        info!(
            path = %self.path.display(),
            samples = samples.len(),
            detected,
            "Loaded face track"
        );
        Ok(samples)
    }
}
