//! Structured run logging.
//!
//! Every pipeline run gets a fresh run id; each stage logs through a
//! [`RunLogger`] carrying that id and the stage name.

use tracing::{error, info, warn, Span};
use uuid::Uuid;

/// Logger for one pipeline run and stage.
#[derive(Debug, Clone)]
pub struct RunLogger {
    run_id: String,
    stage: String,
}

impl RunLogger {
    /// Start a new run with a random id.
    pub fn new(stage: &str) -> Self {
        Self::from_string(&Uuid::new_v4().to_string(), stage)
    }

    /// Logger for an existing run id.
    pub fn from_string(run_id: &str, stage: &str) -> Self {
        Self {
            run_id: run_id.to_string(),
            stage: stage.to_string(),
        }
    }

    /// Same run, another stage.
    pub fn for_stage(&self, stage: &str) -> Self {
        Self::from_string(&self.run_id, stage)
    }

    pub fn log_start(&self, message: &str) {
        info!(run_id = %self.run_id, stage = %self.stage, "Stage started: {}", message);
    }

    pub fn log_progress(&self, message: &str) {
        info!(run_id = %self.run_id, stage = %self.stage, "Stage progress: {}", message);
    }

    pub fn log_warning(&self, message: &str) {
        warn!(run_id = %self.run_id, stage = %self.stage, "Stage warning: {}", message);
    }

    pub fn log_error(&self, message: &str) {
        error!(run_id = %self.run_id, stage = %self.stage, "Stage error: {}", message);
    }

    pub fn log_completion(&self, message: &str) {
        info!(run_id = %self.run_id, stage = %self.stage, "Stage completed: {}", message);
    }

    /// Get the run ID.
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Get the stage name.
    pub fn stage(&self) -> &str {
        &self.stage
    }

    /// Tracing span for this run and stage.
    pub fn create_span(&self) -> Span {
        tracing::info_span!("run", run_id = %self.run_id, stage = %self.stage)
    }
}
