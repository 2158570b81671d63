//! The editing pipeline.
//!
//! ```text
//!  source ──▶ detect ──▶ timeline.json
//!     │                      │
//!     └────▶ zoom ◀──────────┤        <output>_zoom.mp4
//!              │             │
//!              └──▶ color ◀──┘        <output>
//! ```
//!
//! Stages run one after another and each can be skipped. Detection fuses the
//! collaborator signals into an emotion timeline and saves it; a skipped
//! detection loads the saved timeline instead. Zoom renders an intermediate
//! file that color then grades into the final output. With only one effect
//! stage enabled, that stage renders the final output directly.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use metrics::counter;
use serde::{Deserialize, Serialize};
use tracing::Instrument;

use moodcut_media::{
    load_timeline, save_timeline, summarize, AudioFeatureExtractor, ColorPlanner, EffectPlan,
    EffectPlanner, FaceDetector, FaceTrack, FeatureFusionEngine, FilterGraphSynthesizer,
    MediaRenderer, NoopObserver, SharedObserver, TimelineCompactor, TranscriptEmotionClassifier,
    ZoomPlanner,
};
use moodcut_models::{TimelineSegment, TimelineSummary, VideoInfo};

use crate::config::PipelineConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::logging::RunLogger;

/// Counter of finished runs, labelled by status.
pub const RUNS_TOTAL: &str = "moodcut_runs_total";

/// Pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EditStage {
    /// Emotion timeline detection
    Detect,
    /// Dynamic zoom
    Zoom,
    /// Color grading
    Color,
}

impl EditStage {
    /// Stage name as logged and serialized.
    pub fn as_str(&self) -> &'static str {
        match self {
            EditStage::Detect => "detect",
            EditStage::Zoom => "zoom",
            EditStage::Color => "color",
        }
    }
}

impl std::fmt::Display for EditStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What to run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditRequest {
    /// Source video
    pub source: PathBuf,
    /// Final output video
    pub output: PathBuf,
    /// Timeline file written by detection and read when it is skipped
    pub timeline_path: PathBuf,
    /// Load the timeline instead of detecting it
    pub skip_detect: bool,
    /// Skip the zoom stage
    pub skip_zoom: bool,
    /// Skip the color stage
    pub skip_color: bool,
}

impl EditRequest {
    /// Run every stage, keeping the timeline next to the output.
    pub fn new(source: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        let output = output.into();
        Self {
            source: source.into(),
            timeline_path: default_timeline_path(&output),
            output,
            skip_detect: false,
            skip_zoom: false,
            skip_color: false,
        }
    }

    /// Use `path` for the timeline file.
    pub fn with_timeline(mut self, path: impl Into<PathBuf>) -> Self {
        self.timeline_path = path.into();
        self
    }

    /// Load the timeline instead of detecting it.
    pub fn skip_detect(mut self, skip: bool) -> Self {
        self.skip_detect = skip;
        self
    }

    /// Skip the zoom stage.
    pub fn skip_zoom(mut self, skip: bool) -> Self {
        self.skip_zoom = skip;
        self
    }

    /// Skip the color stage.
    pub fn skip_color(mut self, skip: bool) -> Self {
        self.skip_color = skip;
        self
    }
}

/// `<output stem>_timeline.json` next to `output`.
pub fn default_timeline_path(output: &Path) -> PathBuf {
    let stem = output
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "output".to_string());
    output.with_file_name(format!("{}_timeline.json", stem))
}

/// Outcome of one stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageReport {
    /// Which stage ran
    pub stage: EditStage,
    /// Timeline or effect segments produced
    pub segments: usize,
    /// High-energy timeline segments, or non-default effect segments
    pub active_segments: usize,
    /// Fades inserted
    pub transitions: usize,
    /// Whether the render copied the input unchanged
    pub pass_through: bool,
    /// File written by the stage
    pub output: Option<PathBuf>,
    /// Wall-clock time of the stage
    pub elapsed_ms: u64,
}

/// Outcome of a whole run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    /// Run id shared by every log line of the run
    pub run_id: String,
    /// Source video
    pub source: PathBuf,
    /// Last file produced (the source when every effect stage was skipped)
    pub output: PathBuf,
    /// Timeline file written or read
    pub timeline_path: PathBuf,
    /// Probed source properties
    pub video: VideoInfo,
    /// Per-category timeline statistics
    pub summary: TimelineSummary,
    /// Stages in the order they ran
    pub stages: Vec<StageReport>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl RunReport {
    /// Report for one stage, if it ran.
    pub fn stage(&self, stage: EditStage) -> Option<&StageReport> {
        self.stages.iter().find(|s| s.stage == stage)
    }
}

/// Runs detection, zoom and color over a source video.
pub struct EditPipeline {
    config: PipelineConfig,
    renderer: Arc<dyn MediaRenderer>,
    audio: Option<Arc<dyn AudioFeatureExtractor>>,
    transcript: Option<Arc<dyn TranscriptEmotionClassifier>>,
    faces: Option<Arc<dyn FaceDetector>>,
    observer: SharedObserver,
}

impl EditPipeline {
    /// Create a pipeline without collaborators; missing signals degrade to
    /// defaults (zero energy, neutral emotion, frame-centered zoom).
    pub fn new(config: PipelineConfig, renderer: Arc<dyn MediaRenderer>) -> Self {
        Self {
            config,
            renderer,
            audio: None,
            transcript: None,
            faces: None,
            observer: Arc::new(NoopObserver),
        }
    }

    pub fn with_audio_extractor(mut self, extractor: Arc<dyn AudioFeatureExtractor>) -> Self {
        self.audio = Some(extractor);
        self
    }

    pub fn with_transcript_classifier(mut self, classifier: Arc<dyn TranscriptEmotionClassifier>) -> Self {
        self.transcript = Some(classifier);
        self
    }

    pub fn with_face_detector(mut self, detector: Arc<dyn FaceDetector>) -> Self {
        self.faces = Some(detector);
        self
    }

    pub fn with_observer(mut self, observer: SharedObserver) -> Self {
        self.observer = observer;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run the requested stages.
    pub async fn run(&self, request: &EditRequest) -> WorkerResult<RunReport> {
        let logger = RunLogger::new("edit");
        let span = logger.create_span();
        let result = self.run_inner(request, &logger).instrument(span).await;

        let status = if result.is_ok() { "ok" } else { "error" };
        counter!(RUNS_TOTAL, "status" => status).increment(1);
        if let Err(e) = &result {
            logger.log_error(&e.to_string());
        }
        result
    }

    async fn run_inner(&self, request: &EditRequest, logger: &RunLogger) -> WorkerResult<RunReport> {
        let started_at = Utc::now();
        logger.log_start(&format!(
            "{} -> {}",
            request.source.display(),
            request.output.display()
        ));

        if !request.source.exists() {
            return Err(WorkerError::MissingInput(request.source.clone()));
        }
        let video = self.renderer.probe(&request.source).await?;

        let mut stages = Vec::with_capacity(3);
        let (timeline, summary) = if request.skip_detect {
            let timeline = self.load_saved_timeline(&request.timeline_path, logger).await?;
            let summary = summarize(&timeline);
            self.observer.on_timeline(&timeline, &summary);
            (timeline, summary)
        } else {
            let (timeline, summary, report) = self.detect(request, &video, logger).await?;
            stages.push(report);
            (timeline, summary)
        };

        let mut current = request.source.clone();

        if !request.skip_zoom {
            let target = if request.skip_color {
                request.output.clone()
            } else {
                self.intermediate_path(&request.output)
            };
            let stage_logger = logger.for_stage(EditStage::Zoom.as_str());
            let samples = match &self.faces {
                Some(detector) => detector.detect(&current, &video).await?,
                None => {
                    stage_logger.log_warning("No face detector, zooming on the frame center");
                    Vec::new()
                }
            };
            let planner = ZoomPlanner::new(self.config.zoom.clone(), FaceTrack::new(&samples));
            let plan = planner.plan(&timeline, &video);
            stages.push(
                self.render_stage(EditStage::Zoom, &plan, &current, &target, &video, &stage_logger)
                    .await?,
            );
            current = target;
        }

        if !request.skip_color {
            let stage_logger = logger.for_stage(EditStage::Color.as_str());
            let planner = ColorPlanner::new(self.config.color.clone());
            let plan = planner.plan(&timeline, &video);
            stages.push(
                self.render_stage(EditStage::Color, &plan, &current, &request.output, &video, &stage_logger)
                    .await?,
            );
            current = request.output.clone();
        }

        logger.log_completion(&format!("{} stage(s), output {}", stages.len(), current.display()));

        Ok(RunReport {
            run_id: logger.run_id().to_string(),
            source: request.source.clone(),
            output: current,
            timeline_path: request.timeline_path.clone(),
            video,
            summary,
            stages,
            started_at,
            finished_at: Utc::now(),
        })
    }

    async fn load_saved_timeline(&self, path: &Path, logger: &RunLogger) -> WorkerResult<Vec<TimelineSegment>> {
        if !path.exists() {
            return Err(WorkerError::MissingInput(path.to_path_buf()));
        }
        let timeline = load_timeline(path).await?;
        logger.log_progress(&format!("loaded {} timeline segments from {}", timeline.len(), path.display()));
        Ok(timeline)
    }

    /// Fuse the collaborator signals, compact them and save the timeline.
    async fn detect(
        &self,
        request: &EditRequest,
        video: &VideoInfo,
        parent: &RunLogger,
    ) -> WorkerResult<(Vec<TimelineSegment>, TimelineSummary, StageReport)> {
        let logger = parent.for_stage(EditStage::Detect.as_str());
        let started = Instant::now();
        logger.log_start(&format!("{:.2}s of video", video.duration));

        let audio = match &self.audio {
            Some(extractor) => extractor.extract(&request.source).await?,
            None => {
                logger.log_warning("No audio feature extractor, energy defaults to zero");
                Vec::new()
            }
        };
        let transcript = match &self.transcript {
            Some(classifier) => classifier.classify(&request.source).await?,
            None => {
                logger.log_warning("No transcript classifier, emotion defaults to neutral");
                Vec::new()
            }
        };

        let fused = FeatureFusionEngine::new(self.config.fusion.clone()).fuse(&audio, &transcript);
        self.observer.on_fusion(audio.len(), transcript.len(), fused.len());

        let compactor = TimelineCompactor::new(self.config.compactor.clone());
        let timeline = compactor.generate_timeline(&fused);
        let summary = compactor.summarize(&timeline);
        self.observer.on_timeline(&timeline, &summary);

        save_timeline(&request.timeline_path, &timeline).await?;

        let report = StageReport {
            stage: EditStage::Detect,
            segments: timeline.len(),
            active_segments: compactor.peaks(&timeline).len(),
            transitions: 0,
            pass_through: false,
            output: Some(request.timeline_path.clone()),
            elapsed_ms: started.elapsed().as_millis() as u64,
        };
        logger.log_completion(&format!(
            "{} fused records, {} timeline segments",
            fused.len(),
            timeline.len()
        ));
        Ok((timeline, summary, report))
    }

    /// Synthesize and render one effect plan.
    async fn render_stage(
        &self,
        stage: EditStage,
        plan: &EffectPlan,
        input: &Path,
        output: &Path,
        video: &VideoInfo,
        logger: &RunLogger,
    ) -> WorkerResult<StageReport> {
        let started = Instant::now();
        self.observer.on_plan(plan);

        let synthesizer = FilterGraphSynthesizer::new(self.config.transitions.clone());
        let render_plan = synthesizer.synthesize(&plan.segments, video);
        self.observer.on_graph(plan.kind, &render_plan);

        logger.log_start(&format!(
            "{} segments ({} active) -> {}",
            plan.segments.len(),
            plan.active_segments(),
            output.display()
        ));

        let written = self.renderer.render(input, output, &render_plan).await?;
        let elapsed = started.elapsed();
        self.observer.on_render(plan.kind, elapsed.as_secs_f64());
        logger.log_completion(&format!("wrote {}", written.display()));

        Ok(StageReport {
            stage,
            segments: plan.segments.len(),
            active_segments: plan.active_segments(),
            transitions: render_plan.graph().map(|g| g.transitions.len()).unwrap_or(0),
            pass_through: render_plan.is_pass_through(),
            output: Some(written),
            elapsed_ms: elapsed.as_millis() as u64,
        })
    }

    /// Path of the intermediate zoom render.
    fn intermediate_path(&self, output: &Path) -> PathBuf {
        let stem = output
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "output".to_string());
        let ext = output
            .extension()
            .map(|e| e.to_string_lossy().to_string())
            .unwrap_or_else(|| "mp4".to_string());
        let name = format!("{}{}.{}", stem, self.config.zoom_suffix, ext);
        match &self.config.work_dir {
            Some(dir) => dir.join(name),
            None => output.with_file_name(name),
        }
    }
}
