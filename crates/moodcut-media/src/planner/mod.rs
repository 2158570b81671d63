//! Effect segment planning.
//!
//! Both planners share one algorithm shape:
//!
//! 1. **Parameter mapping** (per planner): every timeline segment becomes at
//!    most one candidate interval with effect parameters.
//! 2. **Overlap resolution** (shared): the time axis is cut at every candidate
//!    boundary; each minimal sub-interval takes the best overlapping candidate
//!    (non-default beats default, then higher priority, ties keep the earlier
//!    candidate) or the default style when nothing overlaps. Equal neighbours
//!    are coalesced.
//! 3. **Segment cap** (shared): while the plan is over budget the weakest
//!    non-default segment is demoted to the default style and re-coalesced.
//!
//! The result is ordered, contiguous and covers `[0, duration]`.

pub mod color;
pub mod zoom;

pub use color::{ColorConfig, ColorPlanner};
pub use zoom::{ZoomConfig, ZoomPlanner, ZoomPolicy};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use moodcut_models::{EffectKind, EffectParams, EffectSegment, TimelineSegment, VideoInfo};

/// Boundaries closer than this are treated as the same point (seconds).
const BOUNDARY_EPSILON: f64 = 1e-6;

/// Limits shared by both planners.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanLimits {
    /// Maximum number of segments in a plan.
    pub max_segments: usize,

    /// Default-style sub-intervals shorter than this are absorbed into the
    /// preceding segment (seconds).
    pub min_default_sliver: f64,

    /// Rank segments by distance from default times duration when capping.
    pub duration_weighted_cap: bool,
}

impl PlanLimits {
    /// Limits with the given segment cap and the shared defaults.
    pub fn with_max_segments(max_segments: usize) -> Self {
        Self {
            max_segments: max_segments.max(1),
            min_default_sliver: 0.1,
            duration_weighted_cap: false,
        }
    }
}

impl Default for PlanLimits {
    fn default() -> Self {
        Self::with_max_segments(20)
    }
}

/// A resolved effect plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectPlan {
    /// Effect the plan is for
    pub kind: EffectKind,
    /// Ordered, gapless effect segments
    pub segments: Vec<EffectSegment>,
    /// Number of candidates produced by parameter mapping
    pub candidates: usize,
    /// Number of segments the segment cap removed
    pub demoted: usize,
    /// Planned duration in seconds
    pub duration: f64,
}

impl EffectPlan {
    /// An empty plan (renders as pass-through).
    pub fn empty(kind: EffectKind) -> Self {
        Self {
            kind,
            segments: Vec::new(),
            candidates: 0,
            demoted: 0,
            duration: 0.0,
        }
    }

    /// Whether every segment is the default style (or there are none).
    pub fn is_identity(&self) -> bool {
        self.segments.iter().all(|s| s.params.is_default())
    }

    /// Number of non-default segments.
    pub fn active_segments(&self) -> usize {
        self.segments.iter().filter(|s| !s.params.is_default()).count()
    }
}

/// A planner that maps a timeline onto effect parameters.
///
/// Implementors provide parameter mapping; overlap resolution and capping are
/// shared through [`EffectPlanner::plan`].
pub trait EffectPlanner {
    /// Effect produced by this planner.
    fn kind(&self) -> EffectKind;

    /// Shared planning limits.
    fn limits(&self) -> &PlanLimits;

    /// Parameters for time not covered by any candidate.
    fn default_params(&self, video: &VideoInfo) -> EffectParams;

    /// Map timeline segments to candidate intervals, preserving order.
    fn candidates(&self, timeline: &[TimelineSegment], video: &VideoInfo) -> Vec<EffectSegment>;

    /// Plan the effect for a whole timeline.
    fn plan(&self, timeline: &[TimelineSegment], video: &VideoInfo) -> EffectPlan {
        let kind = self.kind();
        if timeline.is_empty() {
            debug!(effect = %kind, "Empty timeline, nothing to plan");
            return EffectPlan::empty(kind);
        }

        let timeline_end = timeline.iter().map(|s| s.end).fold(0.0, f64::max);
        let duration = video.effective_duration(timeline_end);
        let default = self.default_params(video);
        let limits = self.limits();

        let candidates = self.candidates(timeline, video);
        let resolved = resolve_overlaps(&candidates, duration, default, limits.min_default_sliver);
        let before_cap = resolved.len();
        let segments = cap_segments(resolved, limits.max_segments, default, limits.duration_weighted_cap);

        let demoted = before_cap.saturating_sub(segments.len());
        if segments.len() < before_cap {
            warn!(
                effect = %kind,
                before = before_cap,
                after = segments.len(),
                max_segments = limits.max_segments,
                "Too many effect segments, kept the strongest"
            );
        }

        for segment in &segments {
            debug!(
                effect = %kind,
                start = segment.start,
                end = segment.end,
                style = %segment.params.label(),
                "Planned segment"
            );
        }

        let plan = EffectPlan {
            kind,
            candidates: candidates.len(),
            demoted,
            duration,
            segments,
        };

        info!(
            effect = %kind,
            candidates = plan.candidates,
            segments = plan.segments.len(),
            active = plan.active_segments(),
            duration,
            "Effect plan resolved"
        );

        plan
    }
}

/// Resolve possibly-overlapping candidates into one gapless sequence over
/// `[0, duration]`.
pub fn resolve_overlaps(
    candidates: &[EffectSegment],
    duration: f64,
    default: EffectParams,
    min_default_sliver: f64,
) -> Vec<EffectSegment> {
    if !(duration > 0.0) || !duration.is_finite() {
        return Vec::new();
    }

    let mut breakpoints: Vec<f64> = Vec::with_capacity(candidates.len() * 2 + 2);
    breakpoints.push(0.0);
    breakpoints.push(duration);
    for candidate in candidates {
        for t in [candidate.start, candidate.end] {
            if t.is_finite() {
                breakpoints.push(t.clamp(0.0, duration));
            }
        }
    }
    breakpoints.sort_by(f64::total_cmp);
    breakpoints.dedup_by(|b, a| (*b - *a).abs() < BOUNDARY_EPSILON);

    let mut resolved: Vec<EffectSegment> = Vec::new();
    for window in breakpoints.windows(2) {
        let (start, end) = (window[0], window[1]);
        let params = best_candidate(candidates, start, end)
            .map(|c| c.params)
            .unwrap_or(default);

        if let Some(last) = resolved.last_mut() {
            let sliver = params.is_default() && end - start < min_default_sliver;
            if sliver || last.params.same_style(&params) {
                last.end = end;
                continue;
            }
        }
        resolved.push(EffectSegment::new(start, end, params));
    }

    resolved
}

/// Best candidate overlapping `[start, end)`.
fn best_candidate(candidates: &[EffectSegment], start: f64, end: f64) -> Option<&EffectSegment> {
    let mut best: Option<&EffectSegment> = None;
    for candidate in candidates {
        if !(candidate.end > start && candidate.start < end) {
            continue;
        }
        best = match best {
            None => Some(candidate),
            Some(current) if outranks(&candidate.params, &current.params) => Some(candidate),
            keep => keep,
        };
    }
    best
}

/// Strict ordering: non-default first, then priority. Equal ranks do not outrank.
fn outranks(a: &EffectParams, b: &EffectParams) -> bool {
    match (a.is_default(), b.is_default()) {
        (false, true) => true,
        (true, false) => false,
        _ => a.priority() > b.priority(),
    }
}

/// Merge neighbours that resolve to the same style.
pub fn coalesce(segments: Vec<EffectSegment>) -> Vec<EffectSegment> {
    let mut merged: Vec<EffectSegment> = Vec::with_capacity(segments.len());
    for segment in segments {
        if let Some(last) = merged.last_mut() {
            if last.params.same_style(&segment.params) {
                last.end = segment.end;
                continue;
            }
        }
        merged.push(segment);
    }
    merged
}

/// Bring a plan down to `max_segments` by demoting the weakest non-default
/// segments to `default` and re-coalescing. The plan stays gapless.
pub fn cap_segments(
    mut segments: Vec<EffectSegment>,
    max_segments: usize,
    default: EffectParams,
    duration_weighted: bool,
) -> Vec<EffectSegment> {
    let max_segments = max_segments.max(1);

    while segments.len() > max_segments {
        let score = |s: &EffectSegment| {
            let distance = s.params.distance_from_default();
            if duration_weighted {
                distance * s.duration()
            } else {
                distance
            }
        };

        // Weakest first; among equals demote the later one.
        let weakest = segments
            .iter()
            .enumerate()
            .filter(|(_, s)| !s.params.is_default())
            .min_by(|(ia, a), (ib, b)| score(*a).total_cmp(&score(*b)).then(ib.cmp(ia)))
            .map(|(idx, _)| idx);

        let Some(idx) = weakest else {
            break;
        };
        segments[idx].params = default;
        segments = coalesce(segments);
    }

    segments
}

#[cfg(test)]
mod tests {
    use super::*;
    use moodcut_models::{ColorStyle, ZoomParams};

    fn color(start: f64, end: f64, style: ColorStyle) -> EffectSegment {
        EffectSegment::new(start, end, EffectParams::Color(style.preset()))
    }

    fn neutral() -> EffectParams {
        EffectParams::Color(ColorStyle::Neutral.preset())
    }

    fn styles(segments: &[EffectSegment]) -> Vec<(f64, f64, String)> {
        segments
            .iter()
            .map(|s| (s.start, s.end, s.params.label()))
            .collect()
    }

    #[test]
    fn test_higher_priority_splits_lower() {
        let candidates = vec![
            color(0.0, 5.0, ColorStyle::Sadness),
            color(2.0, 3.0, ColorStyle::Excitement),
        ];
        let resolved = resolve_overlaps(&candidates, 5.0, neutral(), 0.1);
        assert_eq!(
            styles(&resolved),
            vec![
                (0.0, 2.0, "sadness".to_string()),
                (2.0, 3.0, "excitement".to_string()),
                (3.0, 5.0, "sadness".to_string()),
            ]
        );
    }

    #[test]
    fn test_gaps_filled_with_default() {
        let candidates = vec![color(1.0, 2.0, ColorStyle::Tension)];
        let resolved = resolve_overlaps(&candidates, 4.0, neutral(), 0.1);
        assert_eq!(resolved.len(), 3);
        assert_eq!(resolved[0].start, 0.0);
        assert!(resolved[0].params.is_default());
        assert_eq!(resolved[2].end, 4.0);
    }

    #[test]
    fn test_equal_priority_keeps_earlier() {
        let candidates = vec![
            color(0.0, 3.0, ColorStyle::Tension),
            color(1.0, 4.0, ColorStyle::Sadness),
        ];
        let resolved = resolve_overlaps(&candidates, 4.0, neutral(), 0.1);
        assert_eq!(
            styles(&resolved),
            vec![(0.0, 3.0, "tension".to_string()), (3.0, 4.0, "sadness".to_string())]
        );
    }

    #[test]
    fn test_default_sliver_absorbed() {
        let candidates = vec![
            color(0.0, 2.0, ColorStyle::Excitement),
            color(2.05, 4.0, ColorStyle::Sadness),
        ];
        let resolved = resolve_overlaps(&candidates, 4.0, neutral(), 0.1);
        assert_eq!(resolved.len(), 2);
        assert_eq!(resolved[0].end, 2.05);
        assert_eq!(resolved[1].start, 2.05);
    }

    #[test]
    fn test_candidates_clipped_to_duration() {
        let candidates = vec![color(-1.0, 10.0, ColorStyle::Humor)];
        let resolved = resolve_overlaps(&candidates, 3.0, neutral(), 0.1);
        assert_eq!(resolved.len(), 1);
        assert_eq!((resolved[0].start, resolved[0].end), (0.0, 3.0));
    }

    #[test]
    fn test_zero_duration_is_empty() {
        assert!(resolve_overlaps(&[], 0.0, neutral(), 0.1).is_empty());
    }

    #[test]
    fn test_cap_demotes_weakest() {
        let default = EffectParams::Zoom(ZoomParams::identity(100, 100));
        let zoom = |start: f64, factor: f64| {
            let mut params = ZoomParams::identity(100, 100);
            params.zoom = factor;
            EffectSegment::new(start, start + 1.0, EffectParams::Zoom(params))
        };
        let segments = vec![
            zoom(0.0, 1.05),
            EffectSegment::new(1.0, 2.0, default),
            zoom(2.0, 1.12),
            EffectSegment::new(3.0, 4.0, default),
            zoom(4.0, 1.02),
        ];

        let capped = cap_segments(segments, 3, default, false);
        assert!(capped.len() <= 3);
        assert_eq!(capped.first().map(|s| s.start), Some(0.0));
        assert_eq!(capped.last().map(|s| s.end), Some(5.0));
        for pair in capped.windows(2) {
            assert_eq!(pair[0].end, pair[1].start);
        }
        let kept: Vec<f64> = capped
            .iter()
            .filter_map(|s| match s.params {
                EffectParams::Zoom(z) if !z.is_identity() => Some(z.zoom),
                _ => None,
            })
            .collect();
        assert_eq!(kept, vec![1.12]);
    }
}
