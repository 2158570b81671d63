//! Filter graph synthesis.
//!
//! Compiles a resolved effect plan into an FFmpeg `-filter_complex` graph:
//!
//! ```text
//! [0:v]trim,setpts,<transform>[,fade][v0]
//! [0:v]trim,setpts,<transform>[,fade][v1]      per segment
//! ...
//! [v0][v1]concat[m1];[m1][v2]concat[m2] ...   pairwise joins
//! ... [outv]                                  single terminal node
//! ```
//!
//! Each segment is cut from the source with `trim` and re-timed with
//! `setpts=PTS-STARTPTS`, then transformed (crop+scale, scale+pad, or a color
//! chain). Adjacent segments are joined pairwise; joins picked by the
//! [`transition`] state machine also fade out the tail of the earlier segment
//! and fade in the head of the later one. Nothing overlaps, so the output
//! lasts exactly as long as the segments put together.

pub mod transition;

pub use transition::{plan_joins, Join, TransitionConfig, TransitionEdge, TransitionWalker};

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use moodcut_models::{ColorParams, CropRect, EffectParams, EffectSegment, VideoInfo, ZoomParams};

/// Label of the source video stream.
pub const SOURCE_LABEL: &str = "0:v";

/// Label of the terminal node.
pub const OUTPUT_LABEL: &str = "outv";

/// Fade direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FadeKind {
    /// Fade from black
    In,
    /// Fade to black
    Out,
}

/// One FFmpeg filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", content = "args", rename_all = "snake_case")]
pub enum FilterOp {
    /// Keep `[start, end)` of the input
    Trim { start: f64, end: f64 },
    /// Reset timestamps to start at zero
    ResetPts,
    /// Crop to a rectangle
    Crop(CropRect),
    /// Rescale
    Scale { width: u32, height: u32 },
    /// Pad to a frame size, centered
    Pad { width: u32, height: u32 },
    /// Saturation multiplier
    Saturation(f64),
    /// Contrast multiplier
    Contrast(f64),
    /// Warm (> 1) or cold (< 1) midtone shift
    Warmth(f64),
    /// Master curve lift (> 1) or drop (< 1)
    Brightness(f64),
    /// Extra blue/cyan shift
    BlueTint,
    /// Edge darkening; higher intensity narrows the angle
    Vignette { intensity: f64 },
    /// Hue rotation in degrees
    Hue(f64),
    /// Fade in or out
    Fade { kind: FadeKind, start: f64, duration: f64 },
    /// Concatenate `n` video inputs
    Concat { n: usize },
}

/// Curve shift applied per unit of warmth or brightness change.
const CURVE_SCALE: f64 = 0.15;

impl fmt::Display for FilterOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterOp::Trim { start, end } => write!(f, "trim=start={:.3}:end={:.3}", start, end),
            FilterOp::ResetPts => f.write_str("setpts=PTS-STARTPTS"),
            FilterOp::Crop(r) => write!(f, "crop={}:{}:{}:{}", r.width, r.height, r.x, r.y),
            FilterOp::Scale { width, height } => write!(f, "scale={}:{}:flags=lanczos", width, height),
            FilterOp::Pad { width, height } => {
                write!(f, "pad={}:{}:(ow-iw)/2:(oh-ih)/2:color=black", width, height)
            }
            FilterOp::Saturation(s) => write!(f, "eq=saturation={:.2}", s),
            FilterOp::Contrast(c) => write!(f, "eq=contrast={:.2}", c),
            FilterOp::Warmth(w) => {
                let shift = (w - 1.0).abs() * CURVE_SCALE;
                let (red, blue) = if *w > 1.0 {
                    (0.5 + shift, 0.5 - shift)
                } else {
                    (0.5 - shift, 0.5 + shift)
                };
                write!(
                    f,
                    "curves=all='0/0 0.5/0.5 1/1':r='0/0 0.5/{:.3} 1/1':b='0/0 0.5/{:.3} 1/1'",
                    red, blue
                )
            }
            FilterOp::Brightness(b) => {
                let lift = (b - 1.0).abs() * CURVE_SCALE;
                if *b > 1.0 {
                    write!(f, "curves=all='0/{:.3} 0.5/{:.3} 1/1'", lift, 0.5 + lift)
                } else {
                    write!(f, "curves=all='0/{:.3} 0.5/{:.3} 1/1'", lift, 0.5 - lift)
                }
            }
            FilterOp::BlueTint => {
                f.write_str("curves=all='0/0 0.5/0.5 1/1':r='0/0 0.5/0.48 1/1':b='0/0 0.5/0.52 1/1'")
            }
            FilterOp::Vignette { intensity } => {
                let angle = if *intensity <= 0.3 {
                    "PI/4"
                } else if *intensity <= 0.4 {
                    "PI/5"
                } else {
                    "PI/6"
                };
                write!(f, "vignette=angle={}:x0=w/2:y0=h/2:mode=forward", angle)
            }
            FilterOp::Hue(h) => write!(f, "hue=h={}", h),
            FilterOp::Fade { kind, start, duration } => {
                let t = match kind {
                    FadeKind::In => "in",
                    FadeKind::Out => "out",
                };
                write!(f, "fade=t={}:st={:.3}:d={:.3}", t, start, duration)
            }
            FilterOp::Concat { n } => write!(f, "concat=n={}:v=1:a=0", n),
        }
    }
}

/// A filter chain with labelled inputs and one labelled output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterNode {
    /// Input pad labels
    pub inputs: Vec<String>,
    /// Filters applied in order
    pub ops: Vec<FilterOp>,
    /// Output pad label
    pub output: String,
    /// Nominal duration of the node output (seconds)
    pub duration: f64,
}

impl fmt::Display for FilterNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for input in &self.inputs {
            write!(f, "[{}]", input)?;
        }
        for (i, op) in self.ops.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{}", op)?;
        }
        write!(f, "[{}]", self.output)
    }
}

/// A filter DAG that reduces to a single terminal node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterGraph {
    /// Nodes in evaluation order; the last one is terminal
    pub nodes: Vec<FilterNode>,
    /// Fades inserted between segments
    pub transitions: Vec<TransitionEdge>,
}

impl FilterGraph {
    /// The terminal node.
    pub fn terminal(&self) -> Option<&FilterNode> {
        self.nodes.last()
    }

    /// Label of the terminal node's output.
    pub fn output_label(&self) -> &str {
        self.terminal().map(|n| n.output.as_str()).unwrap_or(OUTPUT_LABEL)
    }

    /// Nominal duration of the terminal output.
    pub fn duration(&self) -> f64 {
        self.terminal().map(|n| n.duration).unwrap_or(0.0)
    }

    /// Render as an FFmpeg `-filter_complex` argument.
    pub fn to_filter_complex(&self) -> String {
        self.nodes
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(";")
    }
}

/// What the renderer should do with the source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum RenderPlan {
    /// Copy the source unchanged
    PassThrough,
    /// Re-encode through a filter graph
    Graph(FilterGraph),
}

impl RenderPlan {
    /// Whether this plan leaves the source untouched.
    pub fn is_pass_through(&self) -> bool {
        matches!(self, RenderPlan::PassThrough)
    }

    /// The filter graph, if any.
    pub fn graph(&self) -> Option<&FilterGraph> {
        match self {
            RenderPlan::PassThrough => None,
            RenderPlan::Graph(graph) => Some(graph),
        }
    }
}

/// Filters that realize a zoom in a `width` x `height` frame.
pub fn zoom_filters(params: &ZoomParams, width: u32, height: u32) -> Vec<FilterOp> {
    if params.is_identity() {
        return Vec::new();
    }
    if params.zoom > 1.0 {
        return vec![
            FilterOp::Crop(params.crop),
            FilterOp::Scale { width, height },
        ];
    }
    let scaled_w = even((width as f64 * params.zoom).round() as u32).max(2);
    let scaled_h = even((height as f64 * params.zoom).round() as u32).max(2);
    vec![
        FilterOp::Scale {
            width: scaled_w.min(width),
            height: scaled_h.min(height),
        },
        FilterOp::Pad { width, height },
    ]
}

fn even(v: u32) -> u32 {
    v - v % 2
}

/// Filters that realize a color grading preset.
pub fn color_filters(params: &ColorParams) -> Vec<FilterOp> {
    let differs = |v: f64| (v - 1.0).abs() > f64::EPSILON;
    let mut ops = Vec::new();

    if differs(params.saturation) {
        ops.push(FilterOp::Saturation(params.saturation));
    }
    if differs(params.contrast) {
        ops.push(FilterOp::Contrast(params.contrast));
    }
    if differs(params.warmth) {
        ops.push(FilterOp::Warmth(params.warmth));
    }
    if differs(params.vibrance) && (params.vibrance - params.saturation).abs() > 0.05 {
        ops.push(FilterOp::Saturation(params.vibrance));
    }
    if differs(params.brightness) {
        ops.push(FilterOp::Brightness(params.brightness));
    }
    if params.blue_tint {
        ops.push(FilterOp::BlueTint);
    }
    if let Some(intensity) = params.vignette {
        ops.push(FilterOp::Vignette { intensity });
    }
    if params.playful_overlay {
        ops.push(FilterOp::Hue(5.0));
    }
    ops
}

/// Compiles effect segments into a filter graph.
#[derive(Debug, Clone, Default)]
pub struct FilterGraphSynthesizer {
    transitions: TransitionConfig,
}

impl FilterGraphSynthesizer {
    /// Create a synthesizer with the given transition settings.
    pub fn new(transitions: TransitionConfig) -> Self {
        Self { transitions }
    }

    /// Access the transition configuration.
    pub fn transitions(&self) -> &TransitionConfig {
        &self.transitions
    }

    /// Compile `segments` for a `video`-sized source.
    ///
    /// Returns [`RenderPlan::PassThrough`] when there is nothing to apply.
    pub fn synthesize(&self, segments: &[EffectSegment], video: &VideoInfo) -> RenderPlan {
        if segments.is_empty() || segments.iter().all(|s| s.params.is_default()) {
            debug!(segments = segments.len(), "No effect to apply, passing source through");
            return RenderPlan::PassThrough;
        }

        let joins = plan_joins(&self.transitions, segments);

        // Fade lengths on each side of every segment.
        let mut fade_in = vec![0.0; segments.len()];
        let mut fade_out = vec![0.0; segments.len()];
        let mut edges = Vec::new();
        for (i, join) in joins.iter().enumerate() {
            if let Join::Fade { duration } = *join {
                fade_out[i] = duration;
                fade_in[i + 1] = duration;
                edges.push(TransitionEdge {
                    index: i,
                    at: segments[i].end,
                    duration,
                });
            }
        }

        let single = segments.len() == 1;
        let mut nodes: Vec<FilterNode> = Vec::with_capacity(segments.len() * 2);
        for (i, segment) in segments.iter().enumerate() {
            let label = if single {
                OUTPUT_LABEL.to_string()
            } else {
                format!("v{}", i)
            };
            nodes.push(self.segment_node(segment, video, label, fade_in[i], fade_out[i]));
        }

        // Pairwise joins: the running merged node absorbs one segment per step.
        if !single {
            let mut merged_label = "v0".to_string();
            let mut merged_duration = segments[0].duration();
            for i in 1..segments.len() {
                let output = if i == segments.len() - 1 {
                    OUTPUT_LABEL.to_string()
                } else {
                    format!("m{}", i)
                };
                merged_duration += segments[i].duration();
                nodes.push(FilterNode {
                    inputs: vec![merged_label, format!("v{}", i)],
                    ops: vec![FilterOp::Concat { n: 2 }],
                    output: output.clone(),
                    duration: merged_duration,
                });
                merged_label = output;
            }
        }

        let graph = FilterGraph {
            nodes,
            transitions: edges,
        };

        info!(
            segments = segments.len(),
            transitions = graph.transitions.len(),
            duration = graph.duration(),
            "Synthesized filter graph"
        );

        RenderPlan::Graph(graph)
    }

    fn segment_node(
        &self,
        segment: &EffectSegment,
        video: &VideoInfo,
        output: String,
        fade_in: f64,
        fade_out: f64,
    ) -> FilterNode {
        let duration = segment.duration();
        let mut ops = vec![
            FilterOp::Trim {
                start: segment.start,
                end: segment.end,
            },
            FilterOp::ResetPts,
        ];
        ops.extend(match &segment.params {
            EffectParams::Zoom(z) => zoom_filters(z, video.width, video.height),
            EffectParams::Color(c) => color_filters(c),
        });
        if fade_in > 0.0 {
            ops.push(FilterOp::Fade {
                kind: FadeKind::In,
                start: 0.0,
                duration: fade_in,
            });
        }
        if fade_out > 0.0 {
            ops.push(FilterOp::Fade {
                kind: FadeKind::Out,
                start: (duration - fade_out).max(0.0),
                duration: fade_out,
            });
        }

        FilterNode {
            inputs: vec![SOURCE_LABEL.to_string()],
            ops,
            output,
            duration,
        }
    }
}
