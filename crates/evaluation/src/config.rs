use crate::error::{Error, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// How detections are produced for each frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum EvaluationMode {
    /// The annotated boxes of each frame are the detections, isolating the tracker.
    #[value(name = "tracking_only")]
    TrackingOnly,
    /// The detection model runs on every frame.
    #[value(name = "full")]
    Full,
}

/// Which tracker variant the model is assembled with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
#[value(rename_all = "snake_case")]
pub enum TrackerKind {
    /// Fused position and appearance matching over the annotated roster
    Default,
    /// Appearance only, identities are named as they appear
    SimpleSiamese,
    /// Appearance only, up to a fixed number of identities
    Capacity,
    /// Default matching that also corrects recent frames after a swap
    PathCorrection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    pub weights: PathBuf,
    pub input_width: u32,
    pub input_height: u32,
    pub max_output_boxes_per_class: i64,
    pub iou_threshold: f32,
    pub score_threshold: f32,
    /// Class index of pigs in the detector output.
    pub class_index: usize,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        DetectorConfig {
            weights: PathBuf::from("model/detection/weights/detector.onnx"),
            input_width: 640,
            input_height: 640,
            max_output_boxes_per_class: 50,
            iou_threshold: 0.5,
            score_threshold: 0.5,
            class_index: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiameseConfig {
    pub weights: PathBuf,
    pub input_width: u32,
    pub input_height: u32,
}

impl Default for SiameseConfig {
    fn default() -> Self {
        SiameseConfig {
            weights: PathBuf::from("model/siamese/weights/MobileNetV2/siam-18_0.0633.onnx"),
            input_width: 128,
            input_height: 128,
        }
    }
}

/// Everything a run needs to know, read from an optional JSON file and overridden from the command line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationConfig {
    /// Root under which every run gets its own timestamped directory.
    pub experiments_root: PathBuf,
    /// Root of the per-video annotation directories.
    pub annotations_root: PathBuf,
    pub annotation_file_name: String,
    pub detector: DetectorConfig,
    pub siamese: SiameseConfig,
    pub mode: EvaluationMode,
    pub compare_parts: bool,
    /// Length of a scored part in frames.
    pub interval: usize,
    /// Largest distance in pixels between prediction and annotation that still counts as a match.
    pub match_distance: f32,
    pub tracker: TrackerKind,
    /// Number of identities of the capacity tracker.
    pub capacity: usize,
    /// Roster of the name based trackers. Empty means the identities of the annotation file.
    pub names: Vec<String>,
    pub max_frames: Option<usize>,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        EvaluationConfig {
            experiments_root: PathBuf::from("experiments"),
            annotations_root: PathBuf::from("data/tracking"),
            annotation_file_name: "pigs_tracking.json".to_string(),
            detector: DetectorConfig::default(),
            siamese: SiameseConfig::default(),
            mode: EvaluationMode::TrackingOnly,
            compare_parts: true,
            interval: 10,
            match_distance: 50.0,
            tracker: TrackerKind::PathCorrection,
            capacity: 7,
            names: vec![],
            max_frames: None,
        }
    }
}

impl EvaluationConfig {
    /// Read a configuration file. Missing keys keep their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<EvaluationConfig> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(Error::data_access(path))?;
        let config: EvaluationConfig =
            serde_json::from_str(&contents).map_err(|err| Error::Config {
                path: path.to_path_buf(),
                reason: err.to_string(),
            })?;
        config.validate(path)?;
        Ok(config)
    }

    fn validate(&self, path: &Path) -> Result<()> {
        let invalid = |reason: &str| {
            Err(Error::Config {
                path: path.to_path_buf(),
                reason: reason.to_string(),
            })
        };
        if self.compare_parts && self.interval == 0 {
            return invalid("interval must be at least one frame");
        }
        if !(self.match_distance >= 0.0) {
            return invalid("match_distance must be a non-negative number");
        }
        if self.tracker == TrackerKind::Capacity && self.capacity == 0 {
            return invalid("capacity must be at least one");
        }
        Ok(())
    }

    /// The annotation file of a video: `<annotations_root>/<video id>/<annotation_file_name>`.
    pub fn annotation_path(&self, video: &Path) -> PathBuf {
        self.annotations_root
            .join(video_id(video))
            .join(&self.annotation_file_name)
    }

    /// The tag of a video's results directory, e.g. `video15`.
    pub fn video_tag(&self, video: &Path) -> String {
        let id = video_id(video);
        if !id.is_empty() && id.chars().all(|c| c.is_ascii_digit()) {
            format!("video{id}")
        } else {
            id
        }
    }
}

/// The leading digits of the video's file stem (`15_nursery_medium_activity_night` gives `15`),
/// or the whole stem when it does not start with a digit. Glob components are skipped.
pub fn video_id(video: &Path) -> String {
    let video = video
        .components()
        .take_while(|component| {
            !crate::video::is_pattern(&component.as_os_str().to_string_lossy())
        })
        .collect::<PathBuf>();
    let stem = video
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    let digits = stem
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect::<String>();

    if digits.is_empty() {
        stem
    } else {
        digits
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn derives_annotation_path_from_video() {
        let config = EvaluationConfig::default();
        let video = Path::new("PigTrackingDataset2020/videos/15_nursery_medium_activity_night");

        assert_eq!(
            config.annotation_path(video),
            PathBuf::from("data/tracking/15/pigs_tracking.json")
        );
        assert_eq!(config.video_tag(video), "video15");
        assert_eq!(config.video_tag(Path::new("frames/barn")), "barn");
        assert_eq!(config.video_tag(Path::new("videos/07_day/*.png")), "video07");
    }

    #[test]
    fn partial_file_keeps_defaults() -> Result<()> {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"mode": "full", "interval": 25, "tracker": "capacity", "detector": {{"score_threshold": 0.7}}}}"#
        )
        .unwrap();

        let config = EvaluationConfig::from_file(file.path())?;
        assert_eq!(config.mode, EvaluationMode::Full);
        assert_eq!(config.interval, 25);
        assert_eq!(config.tracker, TrackerKind::Capacity);
        assert_eq!(config.detector.score_threshold, 0.7);
        assert_eq!(config.detector.input_width, 640);
        assert_eq!(config.experiments_root, PathBuf::from("experiments"));

        Ok(())
    }

    #[test]
    fn rejects_invalid_values() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"interval": 0}}"#).unwrap();

        let result = EvaluationConfig::from_file(file.path());
        assert!(matches!(result, Err(Error::Config { .. })));

        let result = EvaluationConfig::from_file("does/not/exist.json");
        assert!(matches!(result, Err(Error::DataAccess { .. })));
    }
}
