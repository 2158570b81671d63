//! Effect segment models for dynamic zoom and color grading.
//!
//! Both effect types share one segment shape: an interval plus a tagged
//! parameter set. The planner only needs the handful of questions answered by
//! [`EffectParams`] (is this the default style, how does it rank, how far is
//! it from the default), so the style tables live here as exhaustive matches.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::emotion::EmotionCategory;
use crate::error::ModelError;

/// Which effect a plan is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum EffectKind {
    /// Energy-driven crop zoom
    Zoom,
    /// Emotion-driven color grading
    Color,
}

impl EffectKind {
    /// Name used in logs, metrics labels and output file suffixes.
    pub fn as_str(&self) -> &'static str {
        match self {
            EffectKind::Zoom => "zoom",
            EffectKind::Color => "color",
        }
    }
}

impl fmt::Display for EffectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Color grading
// ============================================================================

/// Named color grading style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ColorStyle {
    /// Saturated, warm
    Excitement,
    /// High contrast, cold
    Tension,
    /// Light vibrance with a playful hue shift
    Humor,
    /// Desaturated, dark, vignetted, blue
    Sadness,
    /// Untouched
    Neutral,
}

impl ColorStyle {
    /// Energy below which excitement is graded as humor.
    pub const HUMOR_ENERGY_CUTOFF: f64 = 0.3;

    /// Base style for an emotion category.
    pub fn for_category(category: EmotionCategory) -> Self {
        match category {
            EmotionCategory::Excitement => ColorStyle::Excitement,
            EmotionCategory::Anger => ColorStyle::Tension,
            EmotionCategory::Sadness => ColorStyle::Sadness,
            EmotionCategory::Neutral => ColorStyle::Neutral,
        }
    }

    /// Style for a timeline segment, applying the humor override: excitement
    /// with energy below `humor_cutoff` becomes humor.
    pub fn for_segment(category: EmotionCategory, energy: f64, humor_cutoff: f64) -> Self {
        if category == EmotionCategory::Excitement && energy < humor_cutoff {
            ColorStyle::Humor
        } else {
            Self::for_category(category)
        }
    }

    /// Overlap-resolution rank. Higher wins.
    pub fn priority(&self) -> u8 {
        match self {
            ColorStyle::Excitement | ColorStyle::Humor => 4,
            ColorStyle::Tension | ColorStyle::Sadness => 3,
            ColorStyle::Neutral => 1,
        }
    }

    /// Fixed grading preset for this style.
    pub fn preset(&self) -> ColorParams {
        let base = ColorParams {
            style: *self,
            saturation: 1.0,
            contrast: 1.0,
            brightness: 1.0,
            warmth: 1.0,
            vibrance: 1.0,
            vignette: None,
            blue_tint: false,
            playful_overlay: false,
        };
        match self {
            ColorStyle::Excitement => ColorParams {
                saturation: 1.3,
                contrast: 1.1,
                brightness: 1.05,
                warmth: 1.15,
                vibrance: 1.2,
                ..base
            },
            ColorStyle::Tension => ColorParams {
                saturation: 0.95,
                contrast: 1.4,
                brightness: 0.95,
                warmth: 0.85,
                vibrance: 0.9,
                ..base
            },
            ColorStyle::Humor => ColorParams {
                saturation: 1.1,
                contrast: 1.05,
                brightness: 1.08,
                warmth: 1.1,
                vibrance: 1.15,
                playful_overlay: true,
                ..base
            },
            ColorStyle::Sadness => ColorParams {
                saturation: 0.5,
                contrast: 0.85,
                brightness: 0.85,
                warmth: 0.8,
                vignette: Some(0.5),
                blue_tint: true,
                ..base
            },
            ColorStyle::Neutral => base,
        }
    }

    /// Returns the style name as serialized.
    pub fn as_str(&self) -> &'static str {
        match self {
            ColorStyle::Excitement => "excitement",
            ColorStyle::Tension => "tension",
            ColorStyle::Humor => "humor",
            ColorStyle::Sadness => "sadness",
            ColorStyle::Neutral => "neutral",
        }
    }
}

impl fmt::Display for ColorStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ColorStyle {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "excitement" => Ok(ColorStyle::Excitement),
            "tension" => Ok(ColorStyle::Tension),
            "humor" => Ok(ColorStyle::Humor),
            "sadness" => Ok(ColorStyle::Sadness),
            "neutral" => Ok(ColorStyle::Neutral),
            _ => Err(ModelError::UnknownStyle(s.to_string())),
        }
    }
}

/// Rendering parameters for one color grading style.
///
/// Multipliers are relative to the source (1.0 = unchanged).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ColorParams {
    /// Style these parameters belong to
    pub style: ColorStyle,
    /// Saturation multiplier
    pub saturation: f64,
    /// Contrast multiplier
    pub contrast: f64,
    /// Brightness multiplier
    pub brightness: f64,
    /// Color temperature (> 1 warm, < 1 cold)
    pub warmth: f64,
    /// Vibrance multiplier
    pub vibrance: f64,
    /// Vignette intensity, if any
    pub vignette: Option<f64>,
    /// Extra blue/cyan shift
    pub blue_tint: bool,
    /// Subtle hue shift
    pub playful_overlay: bool,
}

impl ColorParams {
    /// Saturation and contrast bounds accepted by the `eq` filter range we use.
    pub const MULTIPLIER_RANGE: (f64, f64) = (0.0, 3.0);

    /// Copy with every multiplier clamped into its valid range.
    pub fn clamped(mut self) -> Self {
        let (lo, hi) = Self::MULTIPLIER_RANGE;
        self.saturation = self.saturation.clamp(lo, hi);
        self.contrast = self.contrast.clamp(lo, hi);
        self.brightness = self.brightness.clamp(lo, 2.0);
        self.warmth = self.warmth.clamp(lo, 2.0);
        self.vibrance = self.vibrance.clamp(lo, hi);
        self.vignette = self.vignette.map(|v| v.clamp(0.0, 1.0));
        self
    }

    fn numeric(&self) -> [f64; 5] {
        [
            self.saturation,
            self.contrast,
            self.brightness,
            self.warmth,
            self.vibrance,
        ]
    }
}

// ============================================================================
// Zoom
// ============================================================================

/// Integer crop rectangle in source pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct CropRect {
    /// Left edge
    pub x: u32,
    /// Top edge
    pub y: u32,
    /// Width
    pub width: u32,
    /// Height
    pub height: u32,
}

impl CropRect {
    /// Full-frame rectangle.
    pub fn full(width: u32, height: u32) -> Self {
        Self {
            x: 0,
            y: 0,
            width,
            height,
        }
    }

    /// Whether the rectangle lies inside a `width` x `height` frame.
    pub fn fits(&self, width: u32, height: u32) -> bool {
        self.width > 0
            && self.height > 0
            && self.x + self.width <= width
            && self.y + self.height <= height
    }
}

/// Zoom parameters for one segment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ZoomParams {
    /// Zoom factor (1.0 = unchanged, < 1.0 = zoom out)
    pub zoom: f64,
    /// Crop applied before rescaling to the frame size
    pub crop: CropRect,
    /// Center the crop was aimed at (pixels)
    pub center_x: f64,
    /// Center the crop was aimed at (pixels)
    pub center_y: f64,
    /// Whether the center came from a face detection
    pub face_detected: bool,
    /// Timeline energy that produced this zoom
    pub energy: f64,
}

impl ZoomParams {
    /// Tolerance under which two zoom factors count as the same style.
    pub const ZOOM_EPSILON: f64 = 1e-3;

    /// The default (no zoom) parameters for a frame.
    pub fn identity(width: u32, height: u32) -> Self {
        Self {
            zoom: 1.0,
            crop: CropRect::full(width, height),
            center_x: width as f64 / 2.0,
            center_y: height as f64 / 2.0,
            face_detected: false,
            energy: 0.0,
        }
    }

    /// Whether this is the no-zoom default.
    pub fn is_identity(&self) -> bool {
        (self.zoom - 1.0).abs() < Self::ZOOM_EPSILON
    }
}

// ============================================================================
// Segments
// ============================================================================

/// Parameter set of an effect segment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "effect", rename_all = "snake_case")]
pub enum EffectParams {
    /// Crop-and-rescale zoom
    Zoom(ZoomParams),
    /// Color grading
    Color(ColorParams),
}

impl EffectParams {
    /// Effect type of these parameters.
    pub fn kind(&self) -> EffectKind {
        match self {
            EffectParams::Zoom(_) => EffectKind::Zoom,
            EffectParams::Color(_) => EffectKind::Color,
        }
    }

    /// Whether these are the effect's default (no-op) parameters.
    pub fn is_default(&self) -> bool {
        match self {
            EffectParams::Zoom(z) => z.is_identity(),
            EffectParams::Color(c) => c.style == ColorStyle::Neutral,
        }
    }

    /// Overlap-resolution rank. Higher wins.
    pub fn priority(&self) -> f64 {
        match self {
            EffectParams::Zoom(z) => z.zoom,
            EffectParams::Color(c) => c.style.priority() as f64,
        }
    }

    /// Whether two parameter sets are the same style and may be coalesced.
    pub fn same_style(&self, other: &EffectParams) -> bool {
        match (self, other) {
            (EffectParams::Zoom(a), EffectParams::Zoom(b)) => {
                (a.zoom - b.zoom).abs() < ZoomParams::ZOOM_EPSILON && a.crop == b.crop
            }
            (EffectParams::Color(a), EffectParams::Color(b)) => a.style == b.style,
            _ => false,
        }
    }

    /// Magnitude of the departure from the default parameters.
    pub fn distance_from_default(&self) -> f64 {
        match self {
            EffectParams::Zoom(z) => (z.zoom - 1.0).abs(),
            EffectParams::Color(c) => c
                .numeric()
                .iter()
                .map(|v| (v - 1.0).abs())
                .fold(0.0, f64::max),
        }
    }

    /// Parameter change between two neighbors.
    ///
    /// Parameter sets of different effect kinds are infinitely apart.
    pub fn delta(&self, other: &EffectParams) -> f64 {
        match (self, other) {
            (EffectParams::Zoom(a), EffectParams::Zoom(b)) => (a.zoom - b.zoom).abs(),
            (EffectParams::Color(a), EffectParams::Color(b)) => a
                .numeric()
                .iter()
                .zip(b.numeric().iter())
                .map(|(x, y)| (x - y).abs())
                .fold(0.0, f64::max),
            _ => f64::INFINITY,
        }
    }

    /// Short style label for logs.
    pub fn label(&self) -> String {
        match self {
            EffectParams::Zoom(z) => format!("zoom {:.3}", z.zoom),
            EffectParams::Color(c) => c.style.to_string(),
        }
    }
}

/// A resolved effect interval.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct EffectSegment {
    /// Start in seconds
    pub start: f64,
    /// End in seconds
    pub end: f64,
    /// Effect parameters
    pub params: EffectParams,
}

impl EffectSegment {
    /// Create a new effect segment.
    pub fn new(start: f64, end: f64, params: EffectParams) -> Self {
        Self { start, end, params }
    }

    /// Segment length in seconds.
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_humor_override() {
        assert_eq!(
            ColorStyle::for_segment(EmotionCategory::Excitement, 0.2, 0.3),
            ColorStyle::Humor
        );
        assert_eq!(
            ColorStyle::for_segment(EmotionCategory::Excitement, 0.3, 0.3),
            ColorStyle::Excitement
        );
        assert_eq!(
            ColorStyle::for_segment(EmotionCategory::Anger, 0.1, 0.3),
            ColorStyle::Tension
        );
    }

    #[test]
    fn test_priority_table() {
        assert!(ColorStyle::Excitement.priority() > ColorStyle::Sadness.priority());
        assert_eq!(ColorStyle::Humor.priority(), ColorStyle::Excitement.priority());
        assert_eq!(ColorStyle::Tension.priority(), ColorStyle::Sadness.priority());
        assert!(ColorStyle::Sadness.priority() > ColorStyle::Neutral.priority());
    }

    #[test]
    fn test_presets() {
        let sad = ColorStyle::Sadness.preset();
        assert_eq!(sad.style, ColorStyle::Sadness);
        assert_eq!(sad.vignette, Some(0.5));
        assert!(sad.blue_tint);
        assert!(ColorStyle::Humor.preset().playful_overlay);
        assert_eq!(EffectParams::Color(ColorStyle::Neutral.preset()).distance_from_default(), 0.0);
    }

    #[test]
    fn test_color_delta() {
        let a = EffectParams::Color(ColorStyle::Excitement.preset());
        let b = EffectParams::Color(ColorStyle::Neutral.preset());
        assert!((a.delta(&b) - 0.3).abs() < 1e-9);
        assert!((a.distance_from_default() - 0.3).abs() < 1e-9);
    }

    #[test]
    fn test_crop_fits() {
        assert!(CropRect::full(1920, 1080).fits(1920, 1080));
        let crop = CropRect { x: 100, y: 0, width: 1900, height: 1080 };
        assert!(!crop.fits(1920, 1080));
    }

    #[test]
    fn test_effect_params_tagged() {
        let params = EffectParams::Zoom(ZoomParams::identity(1280, 720));
        let json = serde_json::to_value(params).unwrap();
        assert_eq!(json["effect"], "zoom");
        assert!(params.is_default());
    }
}
