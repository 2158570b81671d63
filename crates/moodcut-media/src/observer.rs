//! Pipeline telemetry hook.
//!
//! Stages report what they produced through a [`PipelineObserver`]. Every
//! method has a no-op default so observers only implement what they need.
//!
//! - [`NoopObserver`]: discards everything
//! - [`TracingObserver`]: structured `tracing` events
//! - [`MetricsObserver`]: `metrics` counters, histograms and gauges

use std::sync::Arc;

use metrics::{counter, gauge, histogram};
use tracing::info;

use moodcut_models::{EffectKind, TimelineSegment, TimelineSummary};

use crate::graph::RenderPlan;
use crate::planner::EffectPlan;

/// Receives stage results as the pipeline runs.
pub trait PipelineObserver: Send + Sync {
    /// Audio and transcript streams were fused.
    fn on_fusion(&self, _audio_samples: usize, _transcript_segments: usize, _fused: usize) {}

    /// The timeline was compacted.
    fn on_timeline(&self, _timeline: &[TimelineSegment], _summary: &TimelineSummary) {}

    /// An effect plan was resolved.
    fn on_plan(&self, _plan: &EffectPlan) {}

    /// A filter graph was synthesized.
    fn on_graph(&self, _kind: EffectKind, _plan: &RenderPlan) {}

    /// A render finished.
    fn on_render(&self, _kind: EffectKind, _elapsed_secs: f64) {}
}

/// Shared observer handle.
pub type SharedObserver = Arc<dyn PipelineObserver>;

/// Observer that ignores everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl PipelineObserver for NoopObserver {}

/// Observer that emits structured `tracing` events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl PipelineObserver for TracingObserver {
    fn on_fusion(&self, audio_samples: usize, transcript_segments: usize, fused: usize) {
        info!(audio_samples, transcript_segments, fused, "Fusion complete");
    }

    fn on_timeline(&self, timeline: &[TimelineSegment], summary: &TimelineSummary) {
        info!(
            segments = timeline.len(),
            total_duration = summary.total_duration,
            avg_energy = summary.avg_energy,
            "Timeline compacted"
        );
        for (category, stats) in &summary.categories {
            info!(
                emotion = %category,
                count = stats.count,
                duration = stats.total_duration,
                avg_energy = stats.avg_energy,
                "Timeline category"
            );
        }
    }

    fn on_plan(&self, plan: &EffectPlan) {
        info!(
            effect = %plan.kind,
            candidates = plan.candidates,
            segments = plan.segments.len(),
            active = plan.active_segments(),
            demoted = plan.demoted,
            "Effect planned"
        );
    }

    fn on_graph(&self, kind: EffectKind, plan: &RenderPlan) {
        match plan.graph() {
            Some(graph) => info!(
                effect = %kind,
                nodes = graph.nodes.len(),
                transitions = graph.transitions.len(),
                duration = graph.duration(),
                "Filter graph ready"
            ),
            None => info!(effect = %kind, "Pass-through render"),
        }
    }

    fn on_render(&self, kind: EffectKind, elapsed_secs: f64) {
        info!(effect = %kind, elapsed_secs, "Render finished");
    }
}

/// Metric name constants for consistency.
pub mod metric_names {
    /// Fused records produced.
    pub const FUSED_RECORDS_TOTAL: &str = "moodcut_fused_records_total";

    /// Timeline segments produced, by emotion.
    pub const TIMELINE_SEGMENTS_TOTAL: &str = "moodcut_timeline_segments_total";

    /// Duration-weighted timeline energy of the last run.
    pub const TIMELINE_AVG_ENERGY: &str = "moodcut_timeline_avg_energy";

    /// Effect segments planned, by effect.
    pub const EFFECT_SEGMENTS_TOTAL: &str = "moodcut_effect_segments_total";

    /// Segments removed by the segment cap, by effect.
    pub const EFFECT_SEGMENTS_DEMOTED_TOTAL: &str = "moodcut_effect_segments_demoted_total";

    /// Transitions inserted, by effect.
    pub const TRANSITIONS_TOTAL: &str = "moodcut_transitions_total";

    /// Renders by effect and mode (graph or pass_through).
    pub const RENDERS_TOTAL: &str = "moodcut_renders_total";

    /// Render wall time in seconds, by effect.
    pub const RENDER_DURATION_SECONDS: &str = "moodcut_render_duration_seconds";
}

/// Observer that records `metrics` counters, histograms and gauges.
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsObserver;

impl PipelineObserver for MetricsObserver {
    fn on_fusion(&self, _audio_samples: usize, _transcript_segments: usize, fused: usize) {
        counter!(metric_names::FUSED_RECORDS_TOTAL).increment(fused as u64);
    }

    fn on_timeline(&self, _timeline: &[TimelineSegment], summary: &TimelineSummary) {
        for (category, stats) in &summary.categories {
            counter!(
                metric_names::TIMELINE_SEGMENTS_TOTAL,
                "emotion" => category.as_str()
            )
            .increment(stats.count as u64);
        }
        gauge!(metric_names::TIMELINE_AVG_ENERGY).set(summary.avg_energy);
    }

    fn on_plan(&self, plan: &EffectPlan) {
        counter!(
            metric_names::EFFECT_SEGMENTS_TOTAL,
            "effect" => plan.kind.as_str()
        )
        .increment(plan.segments.len() as u64);
        if plan.demoted > 0 {
            counter!(
                metric_names::EFFECT_SEGMENTS_DEMOTED_TOTAL,
                "effect" => plan.kind.as_str()
            )
            .increment(plan.demoted as u64);
        }
    }

    fn on_graph(&self, kind: EffectKind, plan: &RenderPlan) {
        let mode = if plan.is_pass_through() { "pass_through" } else { "graph" };
        counter!(
            metric_names::RENDERS_TOTAL,
            "effect" => kind.as_str(),
            "mode" => mode
        )
        .increment(1);
        if let Some(graph) = plan.graph() {
            counter!(
                metric_names::TRANSITIONS_TOTAL,
                "effect" => kind.as_str()
            )
            .increment(graph.transitions.len() as u64);
        }
    }

    fn on_render(&self, kind: EffectKind, elapsed_secs: f64) {
        histogram!(
            metric_names::RENDER_DURATION_SECONDS,
            "effect" => kind.as_str()
        )
        .record(elapsed_secs);
    }
}

/// Forwards every event to several observers.
#[derive(Clone, Default)]
pub struct FanoutObserver {
    observers: Vec<SharedObserver>,
}

impl FanoutObserver {
    /// Create from a list of observers.
    pub fn new(observers: Vec<SharedObserver>) -> Self {
        Self { observers }
    }
}

impl PipelineObserver for FanoutObserver {
    fn on_fusion(&self, audio_samples: usize, transcript_segments: usize, fused: usize) {
        for o in &self.observers {
            o.on_fusion(audio_samples, transcript_segments, fused);
        }
    }

    fn on_timeline(&self, timeline: &[TimelineSegment], summary: &TimelineSummary) {
        for o in &self.observers {
            o.on_timeline(timeline, summary);
        }
    }

    fn on_plan(&self, plan: &EffectPlan) {
        for o in &self.observers {
            o.on_plan(plan);
        }
    }

    fn on_graph(&self, kind: EffectKind, plan: &RenderPlan) {
        for o in &self.observers {
            o.on_graph(kind, plan);
        }
    }

    fn on_render(&self, kind: EffectKind, elapsed_secs: f64) {
        for o in &self.observers {
            o.on_render(kind, elapsed_secs);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_metric_names() {
        assert!(metric_names::FUSED_RECORDS_TOTAL.starts_with("moodcut_"));
        assert!(metric_names::RENDER_DURATION_SECONDS.ends_with("_seconds"));
    }

    #[derive(Default)]
    struct CountingObserver {
        plans: AtomicUsize,
    }

    impl PipelineObserver for CountingObserver {
        fn on_plan(&self, _plan: &EffectPlan) {
            self.plans.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_fanout_forwards() {
        let counter = Arc::new(CountingObserver::default());
        let fanout = FanoutObserver::new(vec![
            counter.clone() as SharedObserver,
            Arc::new(NoopObserver) as SharedObserver,
            Arc::new(MetricsObserver) as SharedObserver,
        ]);
        fanout.on_plan(&EffectPlan::empty(EffectKind::Color));
        fanout.on_graph(EffectKind::Color, &RenderPlan::PassThrough);
        assert_eq!(counter.plans.load(Ordering::SeqCst), 1);
    }
}
