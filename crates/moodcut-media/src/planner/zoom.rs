//! Energy-driven dynamic zoom planning.
//!
//! Two zoom policies are available:
//!
//! - [`ZoomPolicy::Threshold`] (default): segments below the energy threshold
//!   get no zoom; above it the zoom grows linearly with energy up to the
//!   maximum (energy 1.0 maps to 1.12 with the defaults).
//! - [`ZoomPolicy::Banded`]: energies are normalized over the timeline and
//!   mapped to three bands (zoom out, gentle zoom in, strong zoom in).
//!
//! The crop is aimed at the face center interpolated at the segment midpoint,
//! or at the frame center when the face track has nothing usable.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::warn;

use moodcut_models::{
    EffectKind, EffectParams, EffectSegment, TimelineSegment, VideoInfo, ZoomParams,
};

use super::{EffectPlanner, PlanLimits};
use crate::face::{crop_for_zoom, FaceTrack};

/// How energy maps to a zoom factor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZoomPolicy {
    /// Single knee at the energy threshold
    #[default]
    Threshold,
    /// Three bands over timeline-normalized energy
    Banded,
}

/// Configuration for [`ZoomPlanner`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZoomConfig {
    /// Energy to zoom mapping
    pub policy: ZoomPolicy,

    /// Energy below which no zoom is applied (threshold policy).
    pub energy_threshold: f64,

    /// Zoom factor at the threshold.
    pub min_zoom: f64,

    /// Upper zoom bound (threshold policy).
    pub max_zoom: f64,

    /// Zoom increase per unit of energy above the threshold.
    ///
    /// Default is `(1.12 - 1.0) / (1.0 - 0.75) = 0.48`.
    pub slope: f64,

    /// Zoom bounds of the banded policy.
    pub banded_range: (f64, f64),

    /// Shared planner limits (default cap 15).
    pub limits: PlanLimits,
}

impl Default for ZoomConfig {
    fn default() -> Self {
        Self {
            policy: ZoomPolicy::Threshold,
            energy_threshold: 0.75,
            min_zoom: 1.0,
            max_zoom: 1.12,
            slope: 0.48,
            banded_range: (0.95, 1.25),
            limits: PlanLimits::with_max_segments(15),
        }
    }
}

impl ZoomConfig {
    /// Builder-style setter for the zoom policy.
    pub fn with_policy(mut self, policy: ZoomPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Builder-style setter for the energy threshold.
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.energy_threshold = threshold.clamp(0.0, 1.0);
        self
    }

    /// Builder-style setter for the maximum zoom (at least the minimum zoom).
    pub fn with_max_zoom(mut self, max_zoom: f64) -> Self {
        self.max_zoom = max_zoom.max(self.min_zoom);
        self
    }

    /// Builder-style setter for the segment cap.
    pub fn with_max_segments(mut self, max_segments: usize) -> Self {
        self.limits.max_segments = max_segments.max(1);
        self
    }
}

/// Plans crop-and-rescale zoom segments from the timeline energy.
#[derive(Debug, Clone, Default)]
pub struct ZoomPlanner {
    config: ZoomConfig,
    faces: FaceTrack,
}

impl ZoomPlanner {
    /// Create a zoom planner with a face track.
    pub fn new(config: ZoomConfig, faces: FaceTrack) -> Self {
        Self { config, faces }
    }

    /// Access the configuration.
    pub fn config(&self) -> &ZoomConfig {
        &self.config
    }

    /// Zoom factor for an energy under the threshold policy.
    ///
    /// Returns `None` below the threshold.
    pub fn calculate_zoom(&self, energy: f64) -> Option<f64> {
        let c = &self.config;
        if !(energy >= c.energy_threshold) {
            return None;
        }
        let zoom = c.min_zoom + (energy - c.energy_threshold) * c.slope;
        Some(zoom.clamp(c.min_zoom, c.max_zoom))
    }

    /// Zoom factor for a timeline-normalized energy under the banded policy.
    pub fn banded_zoom(&self, normalized: f64) -> f64 {
        let zoom = if normalized < 0.3 {
            0.95
        } else if normalized < 0.6 {
            1.0 + (normalized - 0.3) * 0.5
        } else {
            1.15 + (normalized - 0.6) * 0.25
        };
        let (lo, hi) = self.config.banded_range;
        zoom.clamp(lo, hi)
    }

    fn zoom_params(&self, segment: &TimelineSegment, zoom: f64, video: &VideoInfo) -> ZoomParams {
        let lookup = self.faces.center_at(segment.midpoint());
        let (center_x, center_y) = lookup.center_or(video.center());
        ZoomParams {
            zoom,
            crop: crop_for_zoom(zoom, (center_x, center_y), video.width, video.height),
            center_x,
            center_y,
            face_detected: lookup.center.is_some(),
            energy: segment.energy,
        }
    }
}

impl EffectPlanner for ZoomPlanner {
    fn kind(&self) -> EffectKind {
        EffectKind::Zoom
    }

    fn limits(&self) -> &PlanLimits {
        &self.config.limits
    }

    fn default_params(&self, video: &VideoInfo) -> EffectParams {
        EffectParams::Zoom(ZoomParams::identity(video.width, video.height))
    }

    fn candidates(&self, timeline: &[TimelineSegment], video: &VideoInfo) -> Vec<EffectSegment> {
        if self.faces.is_empty() {
            warn!(
                samples = self.faces.sampled(),
                "No usable face detections, zooming on the frame center"
            );
        }

        let (min_energy, max_energy) = timeline.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), s| {
            (lo.min(s.energy), hi.max(s.energy))
        });
        let range = max_energy - min_energy;

        timeline
            .par_iter()
            .filter_map(|segment| {
                let zoom = match self.config.policy {
                    ZoomPolicy::Threshold => self.calculate_zoom(segment.energy)?,
                    ZoomPolicy::Banded => {
                        let normalized = if range > 0.0 {
                            (segment.energy - min_energy) / range
                        } else {
                            0.0
                        };
                        self.banded_zoom(normalized)
                    }
                };
                let params = self.zoom_params(segment, zoom, video);
                Some(EffectSegment::new(segment.start, segment.end, EffectParams::Zoom(params)))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use moodcut_models::{EmotionCategory, FaceSample};

    fn seg(start: f64, end: f64, energy: f64) -> TimelineSegment {
        TimelineSegment::new(start, end, EmotionCategory::Excitement, energy)
    }

    #[test]
    fn test_below_threshold_has_no_zoom() {
        let planner = ZoomPlanner::default();
        assert_eq!(planner.calculate_zoom(0.2), None);
        assert_eq!(planner.calculate_zoom(0.7499), None);
    }

    #[test]
    fn test_threshold_formula() {
        let planner = ZoomPlanner::default();
        assert_eq!(planner.calculate_zoom(0.75), Some(1.0));
        let top = planner.calculate_zoom(1.0).unwrap();
        assert!((top - 1.12).abs() < 1e-9);
        let mid = planner.calculate_zoom(0.875).unwrap();
        assert!((mid - 1.06).abs() < 1e-9);
    }

    #[test]
    fn test_banded_formula() {
        let planner = ZoomPlanner::default();
        assert_eq!(planner.banded_zoom(0.1), 0.95);
        assert!((planner.banded_zoom(0.5) - 1.1).abs() < 1e-9);
        assert!((planner.banded_zoom(1.0) - 1.25).abs() < 1e-9);
    }

    #[test]
    fn test_candidates_skip_low_energy() {
        let planner = ZoomPlanner::default();
        let video = VideoInfo::new(1920, 1080, 30.0, 6.0);
        let timeline = vec![seg(0.0, 2.0, 0.2), seg(2.0, 4.0, 1.0), seg(4.0, 6.0, 0.5)];
        let candidates = planner.candidates(&timeline, &video);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].start, 2.0);
    }

    #[test]
    fn test_banded_candidates_cover_every_segment() {
        let planner = ZoomPlanner::new(ZoomConfig::default().with_policy(ZoomPolicy::Banded), FaceTrack::default());
        let video = VideoInfo::new(1280, 720, 30.0, 6.0);
        let timeline = vec![seg(0.0, 2.0, 0.1), seg(2.0, 4.0, 0.5), seg(4.0, 6.0, 0.3)];
        let candidates = planner.candidates(&timeline, &video);
        assert_eq!(candidates.len(), 3);
        match candidates[0].params {
            EffectParams::Zoom(z) => {
                assert_eq!(z.zoom, 0.95);
                assert_eq!(z.crop.width, 1280);
            }
            _ => panic!("expected zoom"),
        }
    }

    #[test]
    fn test_crop_follows_face() {
        let faces = FaceTrack::new(&[
            FaceSample::detected(0.0, 1200.0, 600.0, 0.9),
            FaceSample::detected(4.0, 1200.0, 600.0, 0.9),
        ]);
        let planner = ZoomPlanner::new(ZoomConfig::default(), faces);
        let video = VideoInfo::new(1920, 1080, 30.0, 4.0);
        let candidates = planner.candidates(&[seg(0.0, 4.0, 1.0)], &video);
        match candidates[0].params {
            EffectParams::Zoom(z) => {
                assert!(z.face_detected);
                assert_eq!((z.center_x, z.center_y), (1200.0, 600.0));
                assert_eq!((z.crop.x, z.crop.y), (1200 - 1714 / 2, 600 - 964 / 2));
                assert!(z.crop.fits(1920, 1080));
            }
            _ => panic!("expected zoom"),
        }
    }

    #[test]
    fn test_plan_is_gapless() {
        let planner = ZoomPlanner::default();
        let video = VideoInfo::new(1920, 1080, 30.0, 10.0);
        let timeline = vec![seg(1.0, 3.0, 0.9), seg(5.0, 7.0, 1.0)];
        let plan = planner.plan(&timeline, &video);
        assert_eq!(plan.segments.first().map(|s| s.start), Some(0.0));
        assert_eq!(plan.segments.last().map(|s| s.end), Some(10.0));
        for pair in plan.segments.windows(2) {
            assert_eq!(pair[0].end, pair[1].start);
        }
        assert_eq!(plan.active_segments(), 2);
    }
}
