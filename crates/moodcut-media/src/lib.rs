#![deny(unreachable_patterns)]
//! Emotion-driven editing engine.
//!
//! This crate provides:
//! - Fusion of audio feature windows and transcript emotions into time-aligned records
//! - Compaction of fused records into an emotion timeline
//! - Zoom and color effect planning with overlap resolution and segment caps
//! - Filter graph synthesis with a transition state machine
//! - Type-safe FFmpeg command building, probing and rendering
//! - Collaborator traits and a telemetry hook for the orchestration layer

pub mod collaborators;
pub mod command;
pub mod error;
pub mod face;
pub mod fusion;
pub mod graph;
pub mod io;
pub mod observer;
pub mod planner;
pub mod probe;
pub mod progress;
pub mod render;
pub mod timeline;


pub use collaborators::{
    AudioFeatureExtractor, FaceDetector, JsonAudioFeatures, JsonFaceTrack, JsonTranscript,
    TranscriptEmotionClassifier,
};
pub use command::{check_ffmpeg, check_ffprobe, FfmpegCommand, FfmpegRunner};
pub use error::{MediaError, MediaResult};
pub use face::{crop_for_zoom, FaceLookup, FaceTrack};
pub use fusion::{EnergyWeights, FeatureFusionEngine, FusionConfig};
pub use graph::{
    FilterGraph, FilterGraphSynthesizer, FilterNode, FilterOp, Join, RenderPlan, TransitionConfig,
    TransitionEdge,
};
pub use io::{load_face_track, load_timeline, save_face_track, save_timeline};
pub use observer::{
    FanoutObserver, MetricsObserver, NoopObserver, PipelineObserver, SharedObserver, TracingObserver,
};
pub use planner::{
    ColorConfig, ColorPlanner, EffectPlan, EffectPlanner, PlanLimits, ZoomConfig, ZoomPlanner,
    ZoomPolicy,
};
pub use probe::probe_video;
pub use progress::{ProgressCallback, RenderProgress};
pub use render::{FfmpegRenderer, MediaRenderer};
pub use timeline::{detect_energy_peaks, summarize, CompactorConfig, TimelineCompactor};
