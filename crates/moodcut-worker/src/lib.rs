//! Emotion-driven editing pipeline runner.
//!
//! This crate provides:
//! - Environment-driven pipeline configuration
//! - The detect, zoom and color pipeline with injected collaborators
//! - Structured run logging and run reports

pub mod config;
pub mod error;
pub mod logging;
pub mod pipeline;

pub use config::PipelineConfig;
pub use error::{WorkerError, WorkerResult};
pub use logging::RunLogger;
pub use pipeline::{default_timeline_path, EditPipeline, EditRequest, EditStage, RunReport, StageReport};
