//! Face track lookup and crop geometry for the zoom planner.

use moodcut_models::{CropRect, FaceSample};

/// Samples closer than this to the query time are used as-is (seconds).
const EXACT_MATCH_TOLERANCE: f64 = 0.01;

/// A face center resolved for one point in time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FaceLookup {
    /// Center in pixels, `None` when no detection is usable
    pub center: Option<(f64, f64)>,
    /// Detector confidence of the sample(s) used
    pub confidence: f64,
}

impl FaceLookup {
    fn none() -> Self {
        Self {
            center: None,
            confidence: 0.0,
        }
    }

    fn from_sample(sample: &FaceSample) -> Self {
        Self {
            center: sample.center(),
            confidence: sample.confidence,
        }
    }

    /// The face center, or `fallback` when no face was found.
    pub fn center_or(&self, fallback: (f64, f64)) -> (f64, f64) {
        self.center.unwrap_or(fallback)
    }
}

/// Time-ordered face detections.
#[derive(Debug, Clone, Default)]
pub struct FaceTrack {
    detections: Vec<FaceSample>,
    sampled: usize,
}

impl FaceTrack {
    /// Build a track from detector output. Samples without a usable face
    /// center are ignored; the rest are sorted by time.
    pub fn new(samples: &[FaceSample]) -> Self {
        let mut detections: Vec<FaceSample> = samples
            .iter()
            .filter(|s| s.center().is_some() && s.time.is_finite())
            .copied()
            .collect();
        detections.sort_by(|a, b| a.time.total_cmp(&b.time));
        Self {
            detections,
            sampled: samples.len(),
        }
    }

    /// Whether the track holds no usable detection.
    pub fn is_empty(&self) -> bool {
        self.detections.is_empty()
    }

    /// Number of usable detections.
    pub fn detections(&self) -> usize {
        self.detections.len()
    }

    /// Number of samples the track was built from, detections or not.
    pub fn sampled(&self) -> usize {
        self.sampled
    }

    /// Face center at `time`.
    ///
    /// Linear between the nearest earlier and later detections; with only one
    /// side available that side is used; with none the lookup is empty.
    pub fn center_at(&self, time: f64) -> FaceLookup {
        let split = self.detections.partition_point(|s| s.time <= time);
        let before = split.checked_sub(1).and_then(|i| self.detections.get(i));
        let after = self.detections.get(split);

        match (before, after) {
            (Some(b), _) if (b.time - time).abs() < EXACT_MATCH_TOLERANCE => FaceLookup::from_sample(b),
            (Some(b), Some(a)) => match (b.center(), a.center()) {
                (Some((bx, by)), Some((ax, ay))) if a.time > b.time => {
                    let alpha = (time - b.time) / (a.time - b.time);
                    FaceLookup {
                        center: Some((bx + (ax - bx) * alpha, by + (ay - by) * alpha)),
                        confidence: (b.confidence + a.confidence) / 2.0,
                    }
                }
                _ => FaceLookup::from_sample(b),
            },
            (Some(b), None) => FaceLookup::from_sample(b),
            (None, Some(a)) => FaceLookup::from_sample(a),
            (None, None) => FaceLookup::none(),
        }
    }
}

/// Crop rectangle for `zoom` around `center` in a `width` x `height` frame.
///
/// The box is `frame / zoom`, never larger than the frame, and shifted so it
/// stays inside the frame. Zoom factors at or below 1.0 crop the full frame.
pub fn crop_for_zoom(zoom: f64, center: (f64, f64), width: u32, height: u32) -> CropRect {
    if !(zoom > 1.0) || width == 0 || height == 0 {
        return CropRect::full(width, height);
    }

    let crop_w = ((width as f64 / zoom).floor() as u32).clamp(1, width);
    let crop_h = ((height as f64 / zoom).floor() as u32).clamp(1, height);

    let (cx, cy) = center;
    let x = clamp_offset(cx - crop_w as f64 / 2.0, width - crop_w);
    let y = clamp_offset(cy - crop_h as f64 / 2.0, height - crop_h);

    CropRect {
        x,
        y,
        width: crop_w,
        height: crop_h,
    }
}

fn clamp_offset(offset: f64, max: u32) -> u32 {
    if !offset.is_finite() {
        return max / 2;
    }
    offset.round().clamp(0.0, max as f64) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_track_has_no_center() {
        let track = FaceTrack::new(&[]);
        let lookup = track.center_at(3.0);
        assert!(lookup.center.is_none());
        assert_eq!(lookup.center_or((960.0, 540.0)), (960.0, 540.0));
    }

    #[test]
    fn test_interpolates_between_detections() {
        let track = FaceTrack::new(&[
            FaceSample::detected(0.0, 100.0, 100.0, 0.8),
            FaceSample::missing(1.0),
            FaceSample::detected(2.0, 300.0, 200.0, 0.6),
        ]);
        assert_eq!(track.detections(), 2);
        assert_eq!(track.sampled(), 3);

        let lookup = track.center_at(1.0);
        assert_eq!(lookup.center, Some((200.0, 150.0)));
        assert!((lookup.confidence - 0.7).abs() < 1e-9);
    }

    #[test]
    fn test_one_sided_lookup() {
        let track = FaceTrack::new(&[FaceSample::detected(5.0, 10.0, 20.0, 0.9)]);
        assert_eq!(track.center_at(1.0).center, Some((10.0, 20.0)));
        assert_eq!(track.center_at(9.0).center, Some((10.0, 20.0)));
        assert_eq!(track.center_at(5.005).center, Some((10.0, 20.0)));
    }

    #[test]
    fn test_crop_centered_and_clamped() {
        let crop = crop_for_zoom(1.12, (960.0, 540.0), 1920, 1080);
        assert_eq!(crop.width, 1714);
        assert_eq!(crop.height, 964);
        assert!(crop.fits(1920, 1080));

        let corner = crop_for_zoom(1.12, (0.0, 1080.0), 1920, 1080);
        assert_eq!(corner.x, 0);
        assert_eq!(corner.y, 1080 - 964);
        assert!(corner.fits(1920, 1080));
    }

    #[test]
    fn test_zoom_out_crops_full_frame() {
        assert_eq!(crop_for_zoom(0.95, (10.0, 10.0), 1280, 720), CropRect::full(1280, 720));
        assert_eq!(crop_for_zoom(1.0, (10.0, 10.0), 1280, 720), CropRect::full(1280, 720));
    }
}
