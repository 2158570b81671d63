//! Emotion-driven color grading planning.

use serde::{Deserialize, Serialize};

use moodcut_models::{
    ColorStyle, EffectKind, EffectParams, EffectSegment, TimelineSegment, VideoInfo,
};

use super::{EffectPlanner, PlanLimits};

/// Configuration for [`ColorPlanner`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColorConfig {
    /// Excitement below this energy is graded as humor.
    pub humor_energy_cutoff: f64,

    /// Shared planner limits (default cap 20).
    pub limits: PlanLimits,
}

impl Default for ColorConfig {
    fn default() -> Self {
        Self {
            humor_energy_cutoff: ColorStyle::HUMOR_ENERGY_CUTOFF,
            limits: PlanLimits::with_max_segments(20),
        }
    }
}

impl ColorConfig {
    /// Builder-style setter for the humor cutoff.
    pub fn with_humor_cutoff(mut self, energy: f64) -> Self {
        self.humor_energy_cutoff = energy.clamp(0.0, 1.0);
        self
    }

    /// Builder-style setter for the segment cap.
    pub fn with_max_segments(mut self, max_segments: usize) -> Self {
        self.limits.max_segments = max_segments.max(1);
        self
    }
}

/// Plans color grading segments from the timeline emotions.
#[derive(Debug, Clone, Default)]
pub struct ColorPlanner {
    config: ColorConfig,
}

impl ColorPlanner {
    /// Create a color planner.
    pub fn new(config: ColorConfig) -> Self {
        Self { config }
    }

    /// Access the configuration.
    pub fn config(&self) -> &ColorConfig {
        &self.config
    }

    /// Grading style for one timeline segment.
    pub fn style_for(&self, segment: &TimelineSegment) -> ColorStyle {
        ColorStyle::for_segment(segment.category, segment.energy, self.config.humor_energy_cutoff)
    }
}

impl EffectPlanner for ColorPlanner {
    fn kind(&self) -> EffectKind {
        EffectKind::Color
    }

    fn limits(&self) -> &PlanLimits {
        &self.config.limits
    }

    fn default_params(&self, _video: &VideoInfo) -> EffectParams {
        EffectParams::Color(ColorStyle::Neutral.preset())
    }

    fn candidates(&self, timeline: &[TimelineSegment], _video: &VideoInfo) -> Vec<EffectSegment> {
        timeline
            .iter()
            .map(|segment| {
                let params = self.style_for(segment).preset().clamped();
                EffectSegment::new(segment.start, segment.end, EffectParams::Color(params))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use moodcut_models::EmotionCategory;

    fn seg(start: f64, end: f64, category: EmotionCategory, energy: f64) -> TimelineSegment {
        TimelineSegment::new(start, end, category, energy)
    }

    fn style(segment: &EffectSegment) -> ColorStyle {
        match segment.params {
            EffectParams::Color(c) => c.style,
            _ => panic!("expected color"),
        }
    }

    #[test]
    fn test_style_mapping() {
        let planner = ColorPlanner::default();
        assert_eq!(planner.style_for(&seg(0.0, 1.0, EmotionCategory::Anger, 0.9)), ColorStyle::Tension);
        assert_eq!(planner.style_for(&seg(0.0, 1.0, EmotionCategory::Excitement, 0.1)), ColorStyle::Humor);
        assert_eq!(planner.style_for(&seg(0.0, 1.0, EmotionCategory::Excitement, 0.8)), ColorStyle::Excitement);
        assert_eq!(planner.style_for(&seg(0.0, 1.0, EmotionCategory::Neutral, 0.8)), ColorStyle::Neutral);
    }

    #[test]
    fn test_plan_covers_video() {
        let planner = ColorPlanner::default();
        let video = VideoInfo::new(1920, 1080, 30.0, 8.0);
        let timeline = vec![
            seg(0.0, 2.0, EmotionCategory::Excitement, 0.9),
            seg(3.0, 5.0, EmotionCategory::Sadness, 0.2),
        ];
        let plan = planner.plan(&timeline, &video);
        let styles: Vec<ColorStyle> = plan.segments.iter().map(style).collect();
        assert_eq!(
            styles,
            vec![
                ColorStyle::Excitement,
                ColorStyle::Neutral,
                ColorStyle::Sadness,
                ColorStyle::Neutral
            ]
        );
        assert_eq!(plan.segments.last().map(|s| s.end), Some(8.0));
    }

    #[test]
    fn test_duration_falls_back_to_timeline_end() {
        let planner = ColorPlanner::default();
        let video = VideoInfo::default();
        let plan = planner.plan(&[seg(0.0, 4.5, EmotionCategory::Anger, 0.6)], &video);
        assert_eq!(plan.duration, 4.5);
        assert_eq!(plan.segments.len(), 1);
    }

    #[test]
    fn test_segment_cap() {
        let planner = ColorPlanner::new(ColorConfig::default().with_max_segments(3));
        let video = VideoInfo::new(1920, 1080, 30.0, 10.0);
        let timeline: Vec<TimelineSegment> = (0..10)
            .map(|i| {
                let category = if i % 2 == 0 { EmotionCategory::Excitement } else { EmotionCategory::Sadness };
                seg(i as f64, i as f64 + 1.0, category, 0.8)
            })
            .collect();
        let plan = planner.plan(&timeline, &video);
        assert!(plan.segments.len() <= 3);
        assert_eq!(plan.segments.first().map(|s| s.start), Some(0.0));
        assert_eq!(plan.segments.last().map(|s| s.end), Some(10.0));
        for pair in plan.segments.windows(2) {
            assert_eq!(pair[0].end, pair[1].start);
        }
    }
}
