//! Transition eligibility between adjacent effect segments.
//!
//! # State Machine
//!
//! ```text
//!              first segment
//!   ┌───────┐ ───────────────▶ ┌──────────────────────────┐
//!   │ Empty │                  │ Merged { accumulated, k } │◀─┐
//!   └───────┘                  └──────────────────────────┘  │
//!                                   │ next segment            │
//!                                   ├── eligible ──▶ Fade ────┤
//!                                   └── otherwise ─▶ Cut ─────┘
//! ```
//!
//! Each step joins the running merged node with the next segment. A join is a
//! fade (out on the tail of the merged node, in on the head of the next
//! segment) when both neighbours are long enough, their parameters differ
//! enough, and the transition budget is not spent; otherwise it is a plain cut.
//! Segments are concatenated without overlap either way, so the merged
//! duration is always the sum of the segment durations.

use serde::{Deserialize, Serialize};
use tracing::debug;

use moodcut_models::EffectSegment;

/// Configuration for transitions between effect segments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionConfig {
    /// Whether transitions are inserted at all.
    pub enabled: bool,

    /// Both neighbours must be at least this long (seconds).
    pub min_segment_duration: f64,

    /// Neighbours must also be at least this fraction of the total duration.
    pub adaptive_fraction: f64,

    /// Minimum parameter change between neighbours.
    pub min_param_delta: f64,

    /// Nominal fade length (seconds).
    pub duration: f64,

    /// Upper bound on fades per plan.
    pub max_transitions: usize,

    /// A fade never exceeds this fraction of the shorter neighbour.
    pub max_fade_fraction: f64,
}

impl Default for TransitionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_segment_duration: 2.5,
            adaptive_fraction: 0.08,
            min_param_delta: 0.05,
            duration: 0.3,
            max_transitions: 4,
            max_fade_fraction: 0.4,
        }
    }
}

impl TransitionConfig {
    /// Configuration with transitions turned off.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// Builder-style setter for the minimum neighbour duration.
    pub fn with_min_segment_duration(mut self, seconds: f64) -> Self {
        self.min_segment_duration = seconds.max(0.0);
        self
    }

    /// Builder-style setter for the fade length.
    pub fn with_duration(mut self, seconds: f64) -> Self {
        self.duration = seconds.clamp(0.0, 2.0);
        self
    }

    /// Builder-style setter for the transition budget.
    pub fn with_max_transitions(mut self, max: usize) -> Self {
        self.max_transitions = max;
        self
    }

    /// Transition budget for a plan of `segments` segments lasting `total` seconds.
    pub fn dynamic_cap(&self, segments: usize, total: f64) -> usize {
        let mut cap = self.max_transitions.min(segments / 3);
        if total < 12.0 {
            cap = cap.min(1);
        } else if total < 20.0 {
            cap = cap.min(2);
        }
        cap
    }
}

/// How two adjacent segments are joined.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "join", rename_all = "snake_case")]
pub enum Join {
    /// Plain concatenation
    Cut,
    /// Fade out then fade in, each lasting `duration` seconds
    Fade { duration: f64 },
}

/// Why a join stayed a cut.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CutReason {
    /// Transitions are disabled
    Disabled,
    /// A neighbour is shorter than the minimum
    TooShort,
    /// The parameters barely change
    SmallDelta,
    /// The transition budget is spent
    BudgetSpent,
}

/// A fade between segment `index` and segment `index + 1`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransitionEdge {
    /// Index of the earlier segment
    pub index: usize,
    /// Boundary time in source seconds
    pub at: f64,
    /// Fade length on each side
    pub duration: f64,
}

/// Walk state.
#[derive(Debug, Clone, Copy, PartialEq)]
enum State {
    Empty,
    Merged { accumulated: f64, transitions: usize },
}

/// Decides the joins for a whole segment sequence.
#[derive(Debug, Clone)]
pub struct TransitionWalker<'a> {
    config: &'a TransitionConfig,
    min_neighbour: f64,
    cap: usize,
    state: State,
}

impl<'a> TransitionWalker<'a> {
    /// Prepare a walk over `segments`.
    pub fn new(config: &'a TransitionConfig, segments: &[EffectSegment]) -> Self {
        let total: f64 = segments.iter().map(EffectSegment::duration).sum();
        Self {
            config,
            min_neighbour: config.min_segment_duration.max(total * config.adaptive_fraction),
            cap: config.dynamic_cap(segments.len(), total),
            state: State::Empty,
        }
    }

    /// Transition budget of this walk.
    pub fn cap(&self) -> usize {
        self.cap
    }

    /// Start the merged node with the first segment.
    pub fn start(&mut self, first: &EffectSegment) {
        self.state = State::Merged {
            accumulated: first.duration(),
            transitions: 0,
        };
    }

    fn eligibility(&self, current: &EffectSegment, next: &EffectSegment, used: usize) -> Result<f64, CutReason> {
        if !self.config.enabled {
            return Err(CutReason::Disabled);
        }
        let shorter = current.duration().min(next.duration());
        if shorter < self.min_neighbour {
            return Err(CutReason::TooShort);
        }
        if current.params.delta(&next.params) < self.config.min_param_delta {
            return Err(CutReason::SmallDelta);
        }
        if used >= self.cap {
            return Err(CutReason::BudgetSpent);
        }
        Ok(self.config.duration.min(self.config.max_fade_fraction * shorter))
    }

    /// Join the merged node (ending with `current`) to `next`.
    pub fn step(&mut self, current: &EffectSegment, next: &EffectSegment) -> Join {
        let (accumulated, used) = match self.state {
            State::Empty => (current.duration(), 0),
            State::Merged {
                accumulated,
                transitions,
            } => (accumulated, transitions),
        };

        let join = match self.eligibility(current, next, used) {
            Ok(duration) if duration > 0.0 => Join::Fade { duration },
            Ok(_) => Join::Cut,
            Err(reason) => {
                debug!(at = next.start, ?reason, "Plain cut between segments");
                Join::Cut
            }
        };

        self.state = State::Merged {
            accumulated: accumulated + next.duration(),
            transitions: used + usize::from(matches!(join, Join::Fade { .. })),
        };
        join
    }

    /// Duration of the merged node so far.
    pub fn accumulated(&self) -> f64 {
        match self.state {
            State::Empty => 0.0,
            State::Merged { accumulated, .. } => accumulated,
        }
    }

    /// Number of fades inserted so far.
    pub fn transitions(&self) -> usize {
        match self.state {
            State::Empty => 0,
            State::Merged { transitions, .. } => transitions,
        }
    }
}

/// Joins for every adjacent pair of `segments` (one fewer than segments).
pub fn plan_joins(config: &TransitionConfig, segments: &[EffectSegment]) -> Vec<Join> {
    let Some(first) = segments.first() else {
        return Vec::new();
    };
    let mut walker = TransitionWalker::new(config, segments);
    walker.start(first);
    segments
        .windows(2)
        .map(|pair| walker.step(&pair[0], &pair[1]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use moodcut_models::{ColorStyle, EffectParams};

    fn color(start: f64, end: f64, style: ColorStyle) -> EffectSegment {
        EffectSegment::new(start, end, EffectParams::Color(style.preset()))
    }

    #[test]
    fn test_dynamic_cap() {
        let config = TransitionConfig::default();
        assert_eq!(config.dynamic_cap(2, 60.0), 0);
        assert_eq!(config.dynamic_cap(9, 60.0), 3);
        assert_eq!(config.dynamic_cap(30, 60.0), 4);
        assert_eq!(config.dynamic_cap(30, 15.0), 2);
        assert_eq!(config.dynamic_cap(30, 10.0), 1);
    }

    #[test]
    fn test_short_segments_get_plain_cut() {
        let config = TransitionConfig::default();
        let segments = vec![
            color(0.0, 1.5, ColorStyle::Excitement),
            color(1.5, 3.0, ColorStyle::Sadness),
        ];
        let mut walker = TransitionWalker::new(&config, &segments);
        walker.start(&segments[0]);
        assert_eq!(walker.step(&segments[0], &segments[1]), Join::Cut);
        assert!((walker.accumulated() - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_long_distinct_segments_fade() {
        let config = TransitionConfig::default();
        let segments = vec![
            color(0.0, 10.0, ColorStyle::Excitement),
            color(10.0, 20.0, ColorStyle::Sadness),
            color(20.0, 30.0, ColorStyle::Excitement),
        ];
        let joins = plan_joins(&config, &segments);
        // Three segments allow a single transition.
        assert_eq!(joins, vec![Join::Fade { duration: 0.3 }, Join::Cut]);
    }

    #[test]
    fn test_small_delta_is_cut() {
        let config = TransitionConfig::default();
        let segments = vec![
            color(0.0, 10.0, ColorStyle::Tension),
            color(10.0, 20.0, ColorStyle::Tension),
            color(20.0, 30.0, ColorStyle::Neutral),
        ];
        let joins = plan_joins(&config, &segments);
        assert_eq!(joins[0], Join::Cut);
    }

    #[test]
    fn test_disabled() {
        let config = TransitionConfig::disabled();
        let segments = vec![
            color(0.0, 10.0, ColorStyle::Excitement),
            color(10.0, 20.0, ColorStyle::Sadness),
            color(20.0, 30.0, ColorStyle::Excitement),
        ];
        assert!(plan_joins(&config, &segments).iter().all(|j| *j == Join::Cut));
    }

    #[test]
    fn test_fade_limited_by_shorter_neighbour() {
        let config = TransitionConfig::default()
            .with_min_segment_duration(0.5)
            .with_duration(1.0);
        let segments = vec![
            color(0.0, 1.0, ColorStyle::Excitement),
            color(1.0, 2.0, ColorStyle::Sadness),
            color(2.0, 3.0, ColorStyle::Excitement),
        ];
        let joins = plan_joins(&config, &segments);
        assert_eq!(joins[0], Join::Fade { duration: 0.4 });
    }
}
