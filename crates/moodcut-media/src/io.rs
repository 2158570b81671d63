//! JSON file contracts: timeline and face-track files.

use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use moodcut_models::{FaceSample, TimelineSegment};

use crate::error::{MediaError, MediaResult};

/// Read a JSON array of records.
pub async fn read_json_array<T: DeserializeOwned>(path: &Path) -> MediaResult<Vec<T>> {
    if !path.exists() {
        return Err(MediaError::FileNotFound(path.to_path_buf()));
    }
    let bytes = tokio::fs::read(path).await?;
    let records: Vec<T> = serde_json::from_slice(&bytes)?;
    debug!(path = %path.display(), records = records.len(), "Loaded JSON records");
    Ok(records)
}

/// Write records as a pretty-printed JSON array, creating parent directories.
pub async fn write_json_array<T: Serialize>(path: &Path, records: &[T]) -> MediaResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    let json = serde_json::to_vec_pretty(records)?;
    tokio::fs::write(path, json).await?;
    debug!(path = %path.display(), records = records.len(), "Saved JSON records");
    Ok(())
}

/// Load a timeline file.
///
/// Segments with `end <= start` are rejected.
pub async fn load_timeline(path: &Path) -> MediaResult<Vec<TimelineSegment>> {
    let timeline: Vec<TimelineSegment> = read_json_array(path).await?;
    if let Some(bad) = timeline.iter().find(|s| !(s.end > s.start)) {
        return Err(MediaError::Model(moodcut_models::ModelError::InvalidInterval {
            start: bad.start,
            end: bad.end,
        }));
    }
    Ok(timeline)
}

/// Save a timeline file with every value rounded to two decimals.
pub async fn save_timeline(path: &Path, timeline: &[TimelineSegment]) -> MediaResult<()> {
    let rounded: Vec<TimelineSegment> = timeline.iter().map(TimelineSegment::rounded).collect();
    write_json_array(path, &rounded).await
}

/// Load a face-track file.
pub async fn load_face_track(path: &Path) -> MediaResult<Vec<FaceSample>> {
    read_json_array(path).await
}

/// Save a face-track file.
pub async fn save_face_track(path: &Path, samples: &[FaceSample]) -> MediaResult<()> {
    write_json_array(path, samples).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use moodcut_models::{ColorStyle, EmotionCategory};
    use tokio_test::{assert_err, assert_ok};

    #[tokio::test]
    async fn test_timeline_file_is_rounded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("timeline.json");
        let timeline = vec![TimelineSegment::new(0.0, 4.0, EmotionCategory::Excitement, 0.8749)];

        save_timeline(&path, &timeline).await.unwrap();

        let raw: serde_json::Value = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(raw[0]["emotion"], "excitement");
        assert_eq!(raw[0]["energy"], 0.87);

        let loaded = load_timeline(&path).await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].end, 4.0);
    }

    #[tokio::test]
    async fn test_timeline_rejects_inverted_interval() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("timeline.json");
        std::fs::write(&path, r#"[{"start": 3.0, "end": 1.0, "emotion": "anger", "energy": 0.4}]"#).unwrap();
        let err = assert_err!(load_timeline(&path).await);
        assert!(matches!(err, MediaError::Model(_)));
    }

    #[tokio::test]
    async fn test_timeline_accepts_labels_outside_the_set() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("timeline.json");
        std::fs::write(
            &path,
            r#"[
                {"start": 0.0, "end": 2.0, "emotion": "humor", "energy": 0.2},
                {"start": 2.0, "end": 4.0, "emotion": "fear", "energy": 0.6},
                {"start": 4.0, "end": 6.0, "emotion": "sadness", "energy": 0.3}
            ]"#,
        )
        .unwrap();

        let loaded = assert_ok!(load_timeline(&path).await);
        let categories: Vec<_> = loaded.iter().map(|s| s.category).collect();
        assert_eq!(
            categories,
            vec![EmotionCategory::Excitement, EmotionCategory::Neutral, EmotionCategory::Sadness]
        );
        // Low-energy humor still grades as humor.
        assert_eq!(
            ColorStyle::for_segment(
                loaded[0].category,
                loaded[0].energy,
                ColorStyle::HUMOR_ENERGY_CUTOFF
            ),
            ColorStyle::Humor
        );
    }

    #[tokio::test]
    async fn test_face_track_nulls() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("faces.json");
        std::fs::write(
            &path,
            r#"[
                {"time": 0.0, "face_detected": true, "face_center_x": 640.0, "face_center_y": 360.0, "confidence": 0.9},
                {"time": 1.0, "face_detected": false, "face_center_x": null, "face_center_y": null, "confidence": 0.0}
            ]"#,
        )
        .unwrap();
        let samples = load_face_track(&path).await.unwrap();
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].center(), Some((640.0, 360.0)));
        assert_eq!(samples[1].center(), None);

        let copy = dir.path().join("copy.json");
        save_face_track(&copy, &samples).await.unwrap();
        assert_eq!(load_face_track(&copy).await.unwrap(), samples);
    }

    #[tokio::test]
    async fn test_missing_file() {
        let err = load_face_track(Path::new("/nonexistent/faces.json")).await.unwrap_err();
        assert!(matches!(err, MediaError::FileNotFound(_)));
    }
}
