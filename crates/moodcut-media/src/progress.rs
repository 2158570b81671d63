//! FFmpeg render progress.

use serde::{Deserialize, Serialize};

/// Progress reported by FFmpeg's `-progress` output.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RenderProgress {
    /// Current frame number
    pub frame: u64,
    /// Current FPS
    pub fps: f64,
    /// Output time in milliseconds
    pub out_time_ms: i64,
    /// Encoding speed (1.5 = 1.5x realtime)
    pub speed: f64,
    /// Whether encoding is complete
    pub is_complete: bool,
}

impl RenderProgress {
    /// Fraction of `total_secs` rendered so far, in `[0, 1]`.
    pub fn fraction(&self, total_secs: f64) -> f64 {
        if !(total_secs > 0.0) {
            return 0.0;
        }
        (self.out_time_ms as f64 / 1000.0 / total_secs).clamp(0.0, 1.0)
    }

    /// Estimated seconds until `total_secs` of output is rendered.
    pub fn eta_seconds(&self, total_secs: f64) -> Option<f64> {
        if self.speed <= 0.0 || self.out_time_ms <= 0 {
            return None;
        }
        let remaining = total_secs - self.out_time_ms as f64 / 1000.0;
        Some((remaining / self.speed).max(0.0))
    }

    /// Fold one `key=value` line into this progress.
    ///
    /// Returns a snapshot when the line closes a progress block.
    pub fn apply_line(&mut self, line: &str) -> Option<RenderProgress> {
        let (key, value) = line.trim().split_once('=')?;
        match key {
            "out_time_us" => {
                if let Ok(us) = value.parse::<i64>() {
                    self.out_time_ms = us / 1000;
                }
            }
            // FFmpeg reports microseconds under this key as well.
            "out_time_ms" => {
                if let Ok(us) = value.parse::<i64>() {
                    self.out_time_ms = us / 1000;
                }
            }
            "frame" => {
                if let Ok(frame) = value.parse() {
                    self.frame = frame;
                }
            }
            "fps" => {
                if let Ok(fps) = value.parse() {
                    self.fps = fps;
                }
            }
            "speed" => {
                if let Some(speed) = value.strip_suffix('x').and_then(|s| s.trim().parse().ok()) {
                    self.speed = speed;
                }
            }
            "progress" => {
                self.is_complete = value == "end";
                return Some(self.clone());
            }
            _ => {}
        }
        None
    }
}

/// Callback type for progress updates.
pub type ProgressCallback = Box<dyn Fn(RenderProgress) + Send + 'static>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fraction() {
        let progress = RenderProgress {
            out_time_ms: 5000,
            ..Default::default()
        };
        assert!((progress.fraction(10.0) - 0.5).abs() < 1e-9);
        assert_eq!(progress.fraction(2.0), 1.0);
        assert_eq!(progress.fraction(0.0), 0.0);
    }

    #[test]
    fn test_eta() {
        let progress = RenderProgress {
            out_time_ms: 5000,
            speed: 2.0,
            ..Default::default()
        };
        let eta = progress.eta_seconds(10.0).unwrap();
        assert!((eta - 2.5).abs() < 1e-9);
        assert_eq!(RenderProgress::default().eta_seconds(10.0), None);
    }

    #[test]
    fn test_apply_lines() {
        let mut progress = RenderProgress::default();
        assert!(progress.apply_line("frame=120").is_none());
        assert!(progress.apply_line("out_time_us=4000000").is_none());
        assert!(progress.apply_line("speed=N/A").is_none());
        assert!(progress.apply_line("speed= 1.5x").is_none());

        let snapshot = progress.apply_line("progress=continue").unwrap();
        assert_eq!(snapshot.frame, 120);
        assert_eq!(snapshot.out_time_ms, 4000);
        assert!((snapshot.speed - 1.5).abs() < 1e-9);
        assert!(!snapshot.is_complete);

        assert!(progress.apply_line("progress=end").unwrap().is_complete);
        assert!(progress.apply_line("garbage").is_none());
    }
}
