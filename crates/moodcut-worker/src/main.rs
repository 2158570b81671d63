//! Emotion-driven editing CLI.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use moodcut_media::{
    FanoutObserver, FfmpegRenderer, FfmpegRunner, JsonAudioFeatures, JsonFaceTrack, JsonTranscript,
    MetricsObserver, SharedObserver, TracingObserver,
};
use moodcut_worker::{EditPipeline, EditRequest, PipelineConfig};

/// Command-line arguments for moodcut
#[derive(Parser, Debug)]
#[command(name = "moodcut")]
#[command(about = "Zoom and color-grade a video from its emotional timeline")]
#[command(version)]
struct Args {
    /// Source video
    input: PathBuf,

    /// Final output video
    #[arg(short, long)]
    output: PathBuf,

    /// Timeline file (default: <output>_timeline.json)
    #[arg(long, env = "MOODCUT_TIMELINE")]
    timeline: Option<PathBuf>,

    /// Face-track JSON file
    #[arg(long, env = "MOODCUT_FACE_TRACK")]
    face_track: Option<PathBuf>,

    /// Audio features JSON file
    #[arg(long, env = "MOODCUT_AUDIO_FEATURES")]
    audio_features: Option<PathBuf>,

    /// Transcript JSON file with emotion labels
    #[arg(long, env = "MOODCUT_TRANSCRIPT")]
    transcript: Option<PathBuf>,

    /// Reuse the saved timeline instead of detecting it
    #[arg(long)]
    skip_detect: bool,

    /// Skip dynamic zoom
    #[arg(long)]
    skip_zoom: bool,

    /// Skip color grading
    #[arg(long)]
    skip_color: bool,

    /// Join effect segments with plain cuts only
    #[arg(long)]
    no_transitions: bool,

    /// Write the run report as JSON
    #[arg(long)]
    report: Option<PathBuf>,
}

fn init_tracing() -> Result<()> {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::from_default_env().add_directive("moodcut=info".parse()?);

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing()?;

    let args = Args::parse();

    let mut config = PipelineConfig::from_env().context("Invalid MOODCUT_* configuration")?;
    if args.no_transitions {
        config.transitions.enabled = false;
    }
    info!("Pipeline config: {:?}", config);

    // Ctrl-C kills a running render.
    let (cancel_tx, cancel_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Received shutdown signal, cancelling render");
            let _ = cancel_tx.send(true);
        }
    });

    let mut runner = FfmpegRunner::new().with_cancel(cancel_rx);
    if let Some(timeout) = config.render_timeout {
        runner = runner.with_timeout(timeout.as_secs());
    }
    let renderer = FfmpegRenderer::new(config.encoding.clone()).with_runner(runner);

    let observers: Vec<SharedObserver> = vec![
        Arc::new(TracingObserver) as SharedObserver,
        Arc::new(MetricsObserver) as SharedObserver,
    ];
    let mut pipeline = EditPipeline::new(config, Arc::new(renderer))
        .with_observer(Arc::new(FanoutObserver::new(observers)));
    if let Some(path) = &args.audio_features {
        pipeline = pipeline.with_audio_extractor(Arc::new(JsonAudioFeatures::new(path)));
    }
    if let Some(path) = &args.transcript {
        pipeline = pipeline.with_transcript_classifier(Arc::new(JsonTranscript::new(path)));
    }
    if let Some(path) = &args.face_track {
        pipeline = pipeline.with_face_detector(Arc::new(JsonFaceTrack::new(path)));
    }

    let mut request = EditRequest::new(&args.input, &args.output)
        .skip_detect(args.skip_detect)
        .skip_zoom(args.skip_zoom)
        .skip_color(args.skip_color);
    if let Some(timeline) = &args.timeline {
        request = request.with_timeline(timeline);
    }

    let report = pipeline
        .run(&request)
        .await
        .with_context(|| format!("Editing {} failed", args.input.display()))?;

    if let Some(path) = &args.report {
        let json = serde_json::to_vec_pretty(&report)?;
        tokio::fs::write(path, json)
            .await
            .with_context(|| format!("Failed to write report to {}", path.display()))?;
    }

    info!(
        run_id = %report.run_id,
        output = %report.output.display(),
        stages = report.stages.len(),
        "Done"
    );
    Ok(())
}
