//! Timeline compaction.
//!
//! Turns the dense fused record sequence into a short list of contiguous
//! segments: neighbours with the same category, similar energy and no real gap
//! are merged, and segments below the minimum duration are dropped (not carried
//! forward into the next segment).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use moodcut_models::{CategoryStats, FusedRecord, TimelineSegment, TimelineSummary};

/// Configuration for [`TimelineCompactor`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompactorConfig {
    /// Maximum energy difference between merged neighbours.
    pub energy_merge_threshold: f64,

    /// Maximum gap between merged neighbours (seconds).
    ///
    /// Negative gaps (overlapping windows) always satisfy this.
    pub time_merge_threshold: f64,

    /// Segments shorter than this are dropped (seconds).
    pub min_segment_duration: f64,

    /// Energy at or above which a segment counts as a peak.
    pub peak_energy: f64,

    /// Minimum distance between detected energy peaks (samples).
    pub peak_min_distance: usize,
}

impl Default for CompactorConfig {
    fn default() -> Self {
        Self {
            energy_merge_threshold: 0.2,
            time_merge_threshold: 0.1,
            min_segment_duration: 0.5,
            peak_energy: 0.75,
            peak_min_distance: 5,
        }
    }
}

impl CompactorConfig {
    /// Builder-style setter for the energy merge threshold.
    pub fn with_energy_threshold(mut self, threshold: f64) -> Self {
        self.energy_merge_threshold = threshold.clamp(0.0, 1.0);
        self
    }

    /// Builder-style setter for the gap merge threshold.
    pub fn with_time_threshold(mut self, seconds: f64) -> Self {
        self.time_merge_threshold = seconds.max(0.0);
        self
    }

    /// Builder-style setter for the minimum segment duration.
    pub fn with_min_segment_duration(mut self, seconds: f64) -> Self {
        self.min_segment_duration = seconds.max(0.0);
        self
    }

    /// Builder-style setter for the peak energy threshold.
    pub fn with_peak_energy(mut self, energy: f64) -> Self {
        self.peak_energy = energy.clamp(0.0, 1.0);
        self
    }
}

/// Merges fused records into the canonical emotion timeline.
#[derive(Debug, Clone, Default)]
pub struct TimelineCompactor {
    config: CompactorConfig,
}

impl TimelineCompactor {
    /// Create a compactor with the given configuration.
    pub fn new(config: CompactorConfig) -> Self {
        Self { config }
    }

    /// Access the configuration.
    pub fn config(&self) -> &CompactorConfig {
        &self.config
    }

    fn can_merge(&self, current: &FusedRecord, next: &FusedRecord) -> bool {
        current.category == next.category
            && (current.energy - next.energy).abs() < self.config.energy_merge_threshold
            && next.start - current.end < self.config.time_merge_threshold
    }

    fn keep(&self, record: &FusedRecord) -> bool {
        record.duration() >= self.config.min_segment_duration
    }

    /// One left-to-right merge pass.
    ///
    /// Returns the merged records and whether anything was merged or dropped.
    pub fn merge_pass(&self, records: &[FusedRecord]) -> (Vec<FusedRecord>, bool) {
        let Some((first, rest)) = records.split_first() else {
            return (Vec::new(), false);
        };

        let mut merged = Vec::with_capacity(records.len());
        let mut changed = false;
        let mut current = first.clone();

        for next in rest {
            if self.can_merge(&current, next) {
                current.end = current.end.max(next.end);
                current.energy = (current.energy + next.energy) / 2.0;
                current.confidence = (current.confidence + next.confidence) / 2.0;
                changed = true;
            } else {
                let finished = std::mem::replace(&mut current, next.clone());
                if self.keep(&finished) {
                    merged.push(finished);
                } else {
                    changed = true;
                }
            }
        }

        if self.keep(&current) {
            merged.push(current);
        } else {
            changed = true;
        }

        (merged, changed)
    }

    /// Merge similar neighbours until a pass changes nothing.
    ///
    /// Every pass that changes something shrinks the list, so this terminates,
    /// and the result is a fixed point: merging it again returns it unchanged.
    pub fn merge_similar(&self, records: &[FusedRecord]) -> Vec<FusedRecord> {
        let (mut merged, mut changed) = self.merge_pass(records);
        let mut passes = 1;
        while changed {
            let (next, next_changed) = self.merge_pass(&merged);
            merged = next;
            changed = next_changed;
            passes += 1;
        }

        debug!(
            input = records.len(),
            output = merged.len(),
            passes,
            "Merged similar segments"
        );
        merged
    }

    /// Build the canonical timeline: merge, round to two decimals, and trim
    /// overlaps so segments are strictly ordered and non-overlapping.
    pub fn generate_timeline(&self, records: &[FusedRecord]) -> Vec<TimelineSegment> {
        let merged = self.merge_similar(records);

        let mut timeline: Vec<TimelineSegment> = Vec::with_capacity(merged.len());
        for record in &merged {
            let mut segment =
                TimelineSegment::new(record.start, record.end, record.category, record.energy)
                    .rounded();
            if let Some(prev) = timeline.last() {
                segment.start = segment.start.max(prev.end);
            }
            if segment.end > segment.start {
                timeline.push(segment);
            } else {
                debug!(start = record.start, end = record.end, "Dropping segment covered by its predecessor");
            }
        }

        timeline
    }

    /// Segments with energy at or above `min_energy`.
    pub fn filter_peaks(&self, timeline: &[TimelineSegment], min_energy: f64) -> Vec<TimelineSegment> {
        timeline
            .iter()
            .filter(|s| s.energy >= min_energy)
            .copied()
            .collect()
    }

    /// Segments at or above the configured peak energy.
    pub fn peaks(&self, timeline: &[TimelineSegment]) -> Vec<TimelineSegment> {
        self.filter_peaks(timeline, self.config.peak_energy)
    }

    /// Strict local maxima of the energy series with the configured height and
    /// spacing. See [`detect_energy_peaks`].
    pub fn energy_peaks(&self, records: &[FusedRecord]) -> Vec<FusedRecord> {
        detect_energy_peaks(records, self.config.peak_energy, self.config.peak_min_distance)
            .into_iter()
            .map(|idx| records[idx].clone())
            .collect()
    }

    /// Per-category and overall statistics, energy averages weighted by duration.
    pub fn summarize(&self, timeline: &[TimelineSegment]) -> TimelineSummary {
        summarize(timeline)
    }
}

/// Duration-weighted timeline statistics.
pub fn summarize(timeline: &[TimelineSegment]) -> TimelineSummary {
    let mut categories: BTreeMap<_, CategoryStats> = BTreeMap::new();
    let mut weighted_energy: BTreeMap<_, f64> = BTreeMap::new();
    let mut total_duration = 0.0;
    let mut total_energy = 0.0;

    for segment in timeline {
        let duration = segment.duration();
        let stats = categories.entry(segment.category).or_default();
        stats.count += 1;
        stats.total_duration += duration;
        *weighted_energy.entry(segment.category).or_insert(0.0) += segment.energy * duration;

        total_duration += duration;
        total_energy += segment.energy * duration;
    }

    for (category, stats) in categories.iter_mut() {
        if stats.total_duration > 0.0 {
            stats.avg_energy = weighted_energy.get(category).copied().unwrap_or(0.0) / stats.total_duration;
        }
    }

    TimelineSummary {
        categories,
        total_duration,
        avg_energy: if total_duration > 0.0 {
            total_energy / total_duration
        } else {
            0.0
        },
        total_segments: timeline.len(),
    }
}

/// Indices of local maxima of the energy series.
///
/// A peak must rise above its left neighbour and fall to its right one, and be
/// at least `threshold` high. A flat top counts once, at its middle sample
/// (rounded down); the first and last samples never qualify. Among peaks
/// closer than `min_distance` samples the higher one survives; equal heights
/// keep the earlier.
pub fn detect_energy_peaks(records: &[FusedRecord], threshold: f64, min_distance: usize) -> Vec<usize> {
    if records.len() < 3 {
        return Vec::new();
    }

    let last = records.len() - 1;
    let mut candidates: Vec<usize> = Vec::new();
    let mut i = 1;
    while i < last {
        let e = records[i].energy;
        if records[i - 1].energy < e {
            let mut ahead = i + 1;
            while ahead < last && records[ahead].energy == e {
                ahead += 1;
            }
            if records[ahead].energy < e {
                if e >= threshold {
                    candidates.push((i + ahead - 1) / 2);
                }
                i = ahead;
                continue;
            }
        }
        i += 1;
    }

    if min_distance <= 1 {
        return candidates;
    }

    // Highest first; the sort is stable so equal heights stay in time order.
    let mut by_height = candidates.clone();
    by_height.sort_by(|&a, &b| records[b].energy.total_cmp(&records[a].energy));

    let mut kept: Vec<usize> = Vec::new();
    for idx in by_height {
        if kept.iter().all(|&k| k.abs_diff(idx) >= min_distance) {
            kept.push(idx);
        }
    }
    kept.sort_unstable();
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use moodcut_models::EmotionCategory;

    fn record(start: f64, end: f64, category: EmotionCategory, energy: f64) -> FusedRecord {
        FusedRecord {
            time: start,
            start,
            end,
            energy,
            category,
            confidence: 0.5,
            amplitude: 0.0,
            speaking_rate: 0.0,
            spectral_centroid: 0.0,
            text: String::new(),
        }
    }

    fn series(energies: &[f64]) -> Vec<FusedRecord> {
        energies
            .iter()
            .enumerate()
            .map(|(i, &e)| record(i as f64 * 0.5, i as f64 * 0.5 + 1.0, EmotionCategory::Neutral, e))
            .collect()
    }

    #[test]
    fn test_merge_same_category_similar_energy() {
        let compactor = TimelineCompactor::default();
        let records = vec![
            record(0.0, 2.0, EmotionCategory::Excitement, 0.9),
            record(2.0, 4.0, EmotionCategory::Excitement, 0.85),
        ];
        let merged = compactor.merge_similar(&records);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].start, 0.0);
        assert_eq!(merged[0].end, 4.0);
        assert!((merged[0].energy - 0.875).abs() < 1e-9);
    }

    #[test]
    fn test_no_merge_across_category_or_gap() {
        let compactor = TimelineCompactor::default();
        let records = vec![
            record(0.0, 1.0, EmotionCategory::Sadness, 0.3),
            record(1.0, 2.0, EmotionCategory::Anger, 0.3),
            record(2.5, 3.5, EmotionCategory::Anger, 0.3),
            record(3.5, 4.5, EmotionCategory::Anger, 0.9),
        ];
        let merged = compactor.merge_similar(&records);
        assert_eq!(merged.len(), 4);
    }

    #[test]
    fn test_short_segments_dropped_not_carried() {
        let compactor = TimelineCompactor::default();
        let records = vec![
            record(0.0, 0.3, EmotionCategory::Sadness, 0.3),
            record(0.3, 1.3, EmotionCategory::Anger, 0.3),
        ];
        let merged = compactor.merge_similar(&records);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].category, EmotionCategory::Anger);
        assert_eq!(merged[0].start, 0.3);
    }

    #[test]
    fn test_merge_similar_idempotent() {
        let compactor = TimelineCompactor::default();
        // Energy drifts so a single pass leaves mergeable neighbours behind.
        let records = vec![
            record(0.0, 1.0, EmotionCategory::Excitement, 0.9),
            record(1.0, 2.0, EmotionCategory::Excitement, 0.72),
            record(2.0, 2.05, EmotionCategory::Anger, 0.5),
            record(2.05, 3.05, EmotionCategory::Excitement, 0.75),
        ];
        let single = compactor.merge_pass(&records).0;
        assert_eq!(single.len(), 2);

        let once = compactor.merge_similar(&records);
        let twice = compactor.merge_similar(&once);
        assert_eq!(once, twice);
        assert_eq!(once.len(), 1);
        assert_eq!(once[0].end, 3.05);
    }

    #[test]
    fn test_generate_timeline_trims_overlaps() {
        let compactor = TimelineCompactor::default();
        let records = vec![
            record(0.0, 1.0, EmotionCategory::Sadness, 0.3),
            record(0.5, 1.5, EmotionCategory::Excitement, 0.9),
            record(1.0, 2.0, EmotionCategory::Excitement, 0.9),
        ];
        let timeline = compactor.generate_timeline(&records);
        assert_eq!(timeline.len(), 2);
        assert_eq!(timeline[0].end, 1.0);
        assert_eq!(timeline[1].start, 1.0);
        assert_eq!(timeline[1].end, 2.0);
        for pair in timeline.windows(2) {
            assert!(pair[0].end <= pair[1].start);
        }
    }

    #[test]
    fn test_summarize_weighted() {
        let timeline = vec![
            TimelineSegment::new(0.0, 3.0, EmotionCategory::Excitement, 0.9),
            TimelineSegment::new(3.0, 4.0, EmotionCategory::Excitement, 0.5),
            TimelineSegment::new(4.0, 6.0, EmotionCategory::Sadness, 0.2),
        ];
        let summary = summarize(&timeline);
        let excitement = summary.category(EmotionCategory::Excitement).unwrap();
        assert_eq!(excitement.count, 2);
        assert!((excitement.total_duration - 4.0).abs() < 1e-9);
        assert!((excitement.avg_energy - 0.8).abs() < 1e-9);
        assert!((summary.total_duration - 6.0).abs() < 1e-9);
        assert!((summary.avg_energy - (3.2 + 0.4) / 6.0).abs() < 1e-9);
        assert_eq!(summary.total_segments, 3);
        assert!(summary.category(EmotionCategory::Anger).is_none());
    }

    #[test]
    fn test_summarize_empty() {
        let summary = summarize(&[]);
        assert_eq!(summary.total_segments, 0);
        assert_eq!(summary.avg_energy, 0.0);
    }

    #[test]
    fn test_filter_peaks() {
        let compactor = TimelineCompactor::default();
        let timeline = vec![
            TimelineSegment::new(0.0, 1.0, EmotionCategory::Excitement, 0.75),
            TimelineSegment::new(1.0, 2.0, EmotionCategory::Neutral, 0.74),
        ];
        assert_eq!(compactor.peaks(&timeline).len(), 1);
        assert_eq!(compactor.filter_peaks(&timeline, 0.5).len(), 2);
    }

    #[test]
    fn test_detect_energy_peaks_distance() {
        let records = series(&[0.1, 0.8, 0.2, 0.9, 0.1, 0.1, 0.1, 0.1, 0.85, 0.1]);
        // 0.8 at 1 and 0.9 at 3 are closer than 5 samples; the higher wins.
        assert_eq!(detect_energy_peaks(&records, 0.75, 5), vec![3, 8]);
        assert_eq!(detect_energy_peaks(&records, 0.75, 1), vec![1, 3, 8]);
    }

    #[test]
    fn test_detect_energy_peaks_edges_never_qualify() {
        let records = series(&[0.95, 0.5, 0.4, 0.5, 0.99]);
        assert!(detect_energy_peaks(&records, 0.75, 1).is_empty());
    }

    #[test]
    fn test_detect_energy_peaks_plateau_reports_middle() {
        // Flat tops of even and odd width, then one running into the last sample.
        let records = series(&[0.5, 0.8, 0.8, 0.5, 0.9, 0.9, 0.9, 0.4, 0.85, 0.85]);
        assert_eq!(detect_energy_peaks(&records, 0.75, 1), vec![1, 5]);
        // Within distance the higher plateau wins.
        assert_eq!(detect_energy_peaks(&records, 0.75, 5), vec![5]);
    }
}
