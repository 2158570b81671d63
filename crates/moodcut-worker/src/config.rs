//! Pipeline configuration.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use moodcut_media::{
    ColorConfig, CompactorConfig, FusionConfig, TransitionConfig, ZoomConfig, ZoomPolicy,
};
use moodcut_models::EncodingConfig;

use crate::error::{WorkerError, WorkerResult};

/// Configuration for one pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Audio/transcript fusion
    pub fusion: FusionConfig,
    /// Timeline compaction
    pub compactor: CompactorConfig,
    /// Zoom planning
    pub zoom: ZoomConfig,
    /// Color planning
    pub color: ColorConfig,
    /// Transitions between effect segments
    pub transitions: TransitionConfig,
    /// Encoder settings for effect renders
    pub encoding: EncodingConfig,
    /// Kill a render after this long
    pub render_timeout: Option<Duration>,
    /// Suffix of the intermediate zoom render (`<output>_zoom.mp4`)
    pub zoom_suffix: String,
    /// Work directory for intermediate files
    pub work_dir: Option<PathBuf>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            fusion: FusionConfig::default(),
            compactor: CompactorConfig::default(),
            zoom: ZoomConfig::default(),
            color: ColorConfig::default(),
            transitions: TransitionConfig::default(),
            encoding: EncodingConfig::default(),
            render_timeout: None,
            zoom_suffix: "_zoom".to_string(),
            work_dir: None,
        }
    }
}

impl PipelineConfig {
    /// Create config from `MOODCUT_*` environment variables.
    pub fn from_env() -> WorkerResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create config from any key lookup, falling back to defaults.
    ///
    /// Unparseable values are configuration errors rather than silently
    /// ignored.
    pub fn from_lookup<F>(lookup: F) -> WorkerResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(policy) = get("MOODCUT_ZOOM_POLICY") {
            config.zoom = config.zoom.with_policy(parse_policy(&policy)?);
        }
        if let Some(threshold) = parse(&get, "MOODCUT_ZOOM_THRESHOLD")? {
            config.zoom = config.zoom.with_threshold(threshold);
        }
        if let Some(max_zoom) = parse(&get, "MOODCUT_MAX_ZOOM")? {
            config.zoom = config.zoom.with_max_zoom(max_zoom);
        }
        if let Some(max) = parse(&get, "MOODCUT_MAX_ZOOM_SEGMENTS")? {
            config.zoom = config.zoom.with_max_segments(max);
        }
        if let Some(max) = parse(&get, "MOODCUT_MAX_COLOR_SEGMENTS")? {
            config.color = config.color.with_max_segments(max);
        }
        if let Some(cutoff) = parse(&get, "MOODCUT_HUMOR_ENERGY_CUTOFF")? {
            config.color = config.color.with_humor_cutoff(cutoff);
        }
        if let Some(threshold) = parse(&get, "MOODCUT_ENERGY_MERGE_THRESHOLD")? {
            config.compactor = config.compactor.with_energy_threshold(threshold);
        }
        if let Some(seconds) = parse(&get, "MOODCUT_MIN_SEGMENT_DURATION")? {
            config.compactor = config.compactor.with_min_segment_duration(seconds);
        }
        if let Some(enabled) = parse::<bool, _>(&get, "MOODCUT_TRANSITIONS")? {
            config.transitions.enabled = enabled;
        }
        if let Some(seconds) = parse(&get, "MOODCUT_TRANSITION_DURATION")? {
            config.transitions = config.transitions.with_duration(seconds);
        }
        if let Some(seconds) = parse(&get, "MOODCUT_MIN_TRANSITION_SEGMENT")? {
            config.transitions = config.transitions.with_min_segment_duration(seconds);
        }
        if let Some(max) = parse(&get, "MOODCUT_MAX_TRANSITIONS")? {
            config.transitions = config.transitions.with_max_transitions(max);
        }
        if let Some(crf) = parse(&get, "MOODCUT_CRF")? {
            config.encoding = config.encoding.with_crf(crf);
        }
        if let Some(preset) = get("MOODCUT_PRESET") {
            config.encoding = config.encoding.with_preset(preset);
        }
        if let Some(secs) = parse::<u64, _>(&get, "MOODCUT_RENDER_TIMEOUT_SECS")? {
            config.render_timeout = (secs > 0).then(|| Duration::from_secs(secs));
        }
        if let Some(dir) = get("MOODCUT_WORK_DIR") {
            config.work_dir = Some(PathBuf::from(dir));
        }

        Ok(config)
    }
}

fn parse<T, G>(get: &G, key: &str) -> WorkerResult<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    get(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|e| WorkerError::config_error(format!("{}={:?}: {}", key, raw, e)))
        })
        .transpose()
}

fn parse_policy(raw: &str) -> WorkerResult<ZoomPolicy> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "threshold" => Ok(ZoomPolicy::Threshold),
        "banded" => Ok(ZoomPolicy::Banded),
        other => Err(WorkerError::config_error(format!(
            "MOODCUT_ZOOM_POLICY must be threshold or banded, got {:?}",
            other
        ))),
    }
}
