use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub(crate) const RESULTS_FILE_NAME: &str = "narration_results.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct VideoMetadata {
    /// Seconds.
    pub(crate) duration: f64,
    pub(crate) fps: f64,
    /// `[width, height]` in pixels.
    pub(crate) size: [u32; 2],
    /// Stem of the input file; names the output directory and documents.
    pub(crate) filename: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct FrameRecord {
    pub(crate) timestamp: u32,
    pub(crate) frame_path: PathBuf,
    pub(crate) narration: String,
}

/// Hand-off document between the analysis and narration phases.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct AnalysisResult {
    pub(crate) metadata: VideoMetadata,
    pub(crate) video_name: String,
    pub(crate) frames: Vec<FrameRecord>,
    pub(crate) analysis_timestamp: NaiveDateTime,
}

impl AnalysisResult {
    pub(crate) fn new(metadata: VideoMetadata, frames: Vec<FrameRecord>) -> Self {
        Self {
            video_name: metadata.filename.clone(),
            metadata,
            frames,
            analysis_timestamp: chrono::Local::now().naive_local(),
        }
    }

    pub(crate) fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Parses a results document and checks the frame ordering invariant.
    /// `origin` is only used to label errors.
    pub(crate) fn from_json(json: &str, origin: &Path) -> Result<Self> {
        let result: AnalysisResult =
            serde_json::from_str(json).map_err(|e| Error::corrupt(origin, e))?;

        if let Some(pair) = result
            .frames
            .windows(2)
            .find(|pair| pair[0].timestamp >= pair[1].timestamp)
        {
            return Err(Error::corrupt(
                origin,
                format!(
                    "frame timestamps out of order ({} followed by {})",
                    pair[0].timestamp, pair[1].timestamp
                ),
            ));
        }
        Ok(result)
    }

    /// Writes the document to `dir`, replacing any earlier one.
    pub(crate) fn save(&self, dir: &Path) -> Result<PathBuf> {
        let path = dir.join(RESULTS_FILE_NAME);
        let json = self.to_json().map_err(|e| Error::corrupt(&path, e))?;
        fs::write(&path, json)?;
        tracing::info!(path = %path.display(), frames = self.frames.len(), "saved analysis results");
        Ok(path)
    }

    pub(crate) fn load(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        Self::from_json(&json, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_result() -> AnalysisResult {
        AnalysisResult {
            metadata: VideoMetadata {
                duration: 12.733333333333333,
                fps: 29.97002997002997,
                size: [1920, 1080],
                filename: "lake_house".to_string(),
            },
            video_name: "lake_house".to_string(),
            frames: vec![
                FrameRecord {
                    timestamp: 0,
                    frame_path: PathBuf::from("lake_house_analysis/frame_0000.jpg"),
                    narration: "Here's the entryway.".to_string(),
                },
                FrameRecord {
                    timestamp: 1,
                    frame_path: PathBuf::from("lake_house_analysis/frame_0001.jpg"),
                    narration: "Error analyzing frame: rate limited".to_string(),
                },
                FrameRecord {
                    timestamp: 2,
                    frame_path: PathBuf::from("lake_house_analysis/frame_0002.jpg"),
                    narration: "Moving to the kitchen, \"nice\" counters.\nBig window.".to_string(),
                },
            ],
            analysis_timestamp: NaiveDateTime::parse_from_str(
                "2024-05-01T14:03:27.123456",
                "%Y-%m-%dT%H:%M:%S%.f",
            )
            .unwrap(),
        }
    }

    #[test]
    fn test_save_then_load_preserves_every_field() {
        let dir = tempfile::tempdir().unwrap();
        let result = sample_result();

        let path = result.save(dir.path()).unwrap();
        assert_eq!(path.file_name().unwrap(), RESULTS_FILE_NAME);

        let loaded = AnalysisResult::load(&path).unwrap();
        assert_eq!(loaded, result);
        let timestamps: Vec<u32> = loaded.frames.iter().map(|f| f.timestamp).collect();
        assert_eq!(timestamps, vec![0, 1, 2]);
    }

    #[test]
    fn test_document_layout() {
        let value: serde_json::Value =
            serde_json::from_str(&sample_result().to_json().unwrap()).unwrap();

        assert_eq!(value["metadata"]["size"], serde_json::json!([1920, 1080]));
        assert_eq!(value["metadata"]["filename"], "lake_house");
        assert_eq!(value["video_name"], "lake_house");
        assert_eq!(value["frames"][2]["timestamp"], 2);
        assert_eq!(value["frames"][0]["frame_path"], "lake_house_analysis/frame_0000.jpg");
        assert_eq!(value["analysis_timestamp"], "2024-05-01T14:03:27.123456");
    }

    #[test]
    fn test_reads_document_without_fractional_seconds() {
        let json = r#"{
          "metadata": {"duration": 3.0, "fps": 30.0, "size": [640, 480], "filename": "den"},
          "video_name": "den",
          "frames": [{"timestamp": 0, "frame_path": "den_analysis/frame_0000.jpg", "narration": "A den."}],
          "analysis_timestamp": "2024-05-01T14:03:27"
        }"#;

        let result = AnalysisResult::from_json(json, Path::new("den.json")).unwrap();
        assert_eq!(result.frames.len(), 1);
        assert_eq!(result.metadata.size, [640, 480]);
    }

    #[test]
    fn test_missing_field_is_corrupt() {
        let json = r#"{"video_name": "den", "frames": [], "analysis_timestamp": "2024-05-01T14:03:27"}"#;

        let err = AnalysisResult::from_json(json, Path::new("den.json")).unwrap_err();
        assert!(matches!(err, Error::StoreCorrupt { .. }));
        assert!(err.to_string().contains("metadata"));
    }

    #[test]
    fn test_malformed_json_is_corrupt() {
        let err = AnalysisResult::from_json("{ not json", Path::new("x.json")).unwrap_err();
        assert!(matches!(err, Error::StoreCorrupt { .. }));
    }

    #[test]
    fn test_unordered_frames_are_corrupt() {
        let mut result = sample_result();
        result.frames.swap(0, 2);
        let json = result.to_json().unwrap();

        let err = AnalysisResult::from_json(&json, Path::new("x.json")).unwrap_err();
        assert!(err.to_string().contains("out of order"));
    }

    #[test]
    fn test_duplicate_timestamps_are_corrupt() {
        let mut result = sample_result();
        result.frames[1].timestamp = 0;
        let json = result.to_json().unwrap();

        assert!(AnalysisResult::from_json(&json, Path::new("x.json")).is_err());
    }
}
