//! Rendering a [`RenderPlan`] against a source video.

use std::path::{Path, PathBuf};
use std::time::Instant;

use async_trait::async_trait;
use tracing::{debug, info};

use moodcut_models::{EncodingConfig, VideoInfo};

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};
use crate::graph::RenderPlan;
use crate::probe::probe_video;

/// Reads source videos and renders filter graphs over them.
#[async_trait]
pub trait MediaRenderer: Send + Sync {
    /// Size, frame rate and duration of `source`.
    async fn probe(&self, source: &Path) -> MediaResult<VideoInfo>;

    /// Render `plan` over `source` into `output` and return the output path.
    ///
    /// A failing render is returned as an error and never retried.
    async fn render(&self, source: &Path, output: &Path, plan: &RenderPlan) -> MediaResult<PathBuf>;
}

/// [`MediaRenderer`] backed by the `ffmpeg` and `ffprobe` binaries.
#[derive(Debug, Clone, Default)]
pub struct FfmpegRenderer {
    encoding: EncodingConfig,
    runner: FfmpegRunner,
}

impl FfmpegRenderer {
    /// Create a renderer with the given encoder settings.
    pub fn new(encoding: EncodingConfig) -> Self {
        Self {
            encoding,
            runner: FfmpegRunner::new(),
        }
    }

    /// Use a preconfigured runner (timeout, cancellation).
    pub fn with_runner(mut self, runner: FfmpegRunner) -> Self {
        self.runner = runner;
        self
    }

    /// Encoder settings of graph renders.
    pub fn encoding(&self) -> &EncodingConfig {
        &self.encoding
    }

    /// The FFmpeg invocation for `plan`.
    pub fn command(&self, source: &Path, output: &Path, plan: &RenderPlan) -> FfmpegCommand {
        let cmd = FfmpegCommand::new(source, output);
        match plan {
            RenderPlan::PassThrough => cmd.stream_copy(),
            RenderPlan::Graph(graph) => cmd
                .filter_complex(graph.to_filter_complex())
                .map(format!("[{}]", graph.output_label()))
                .map("0:a?")
                .encoding(&self.encoding),
        }
    }
}

#[async_trait]
impl MediaRenderer for FfmpegRenderer {
    async fn probe(&self, source: &Path) -> MediaResult<VideoInfo> {
        probe_video(source).await
    }

    async fn render(&self, source: &Path, output: &Path, plan: &RenderPlan) -> MediaResult<PathBuf> {
        if !source.exists() {
            return Err(MediaError::FileNotFound(source.to_path_buf()));
        }
        if source == output {
            return Err(MediaError::invalid_input(format!(
                "Render output must differ from the source: {}",
                source.display()
            )));
        }
        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let cmd = self.command(source, output, plan);
        let started = Instant::now();
        let expected = plan.graph().map(|g| g.duration()).unwrap_or(0.0);

        self.runner
            .run_with_progress(&cmd, move |progress| {
                debug!(
                    frame = progress.frame,
                    fraction = progress.fraction(expected),
                    speed = progress.speed,
                    "Render progress"
                );
            })
            .await?;

        info!(
            source = %source.display(),
            output = %output.display(),
            pass_through = plan.is_pass_through(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Rendered video"
        );
        Ok(output.to_path_buf())
    }
}
