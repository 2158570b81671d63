//! Worker error types.

use std::path::PathBuf;

use thiserror::Error;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Missing input: {}", .0.display())]
    MissingInput(PathBuf),

    #[error("{stage} stage failed: {message}")]
    StageFailed { stage: &'static str, message: String },

    #[error("Media error: {0}")]
    Media(#[from] moodcut_media::MediaError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkerError {
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn stage_failed(stage: &'static str, msg: impl Into<String>) -> Self {
        Self::StageFailed {
            stage,
            message: msg.into(),
        }
    }

    /// Whether the failure came from the external renderer.
    pub fn is_render_failure(&self) -> bool {
        matches!(
            self,
            Self::Media(
                moodcut_media::MediaError::FfmpegFailed { .. }
                    | moodcut_media::MediaError::FfmpegNotFound
                    | moodcut_media::MediaError::Timeout(_)
                    | moodcut_media::MediaError::Cancelled
            )
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use moodcut_media::MediaError;

    #[test]
    fn test_render_failure_classification() {
        let err: WorkerError = MediaError::ffmpeg_failed("boom", None, Some(1)).into();
        assert!(err.is_render_failure());
        assert!(err.to_string().contains("boom"));

        let err = WorkerError::MissingInput(PathBuf::from("timeline.json"));
        assert!(!err.is_render_failure());
        assert_eq!(err.to_string(), "Missing input: timeline.json");
    }
}
