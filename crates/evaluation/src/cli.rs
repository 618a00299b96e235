use crate::{
    config::{EvaluationConfig, EvaluationMode, TrackerKind},
    error::Result,
};
use clap::Parser;
use std::path::PathBuf;

/// Evaluate the pig tracker on a video against its ground-truth annotation
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// The video: a directory of frame images or a glob pattern matching them
    pub video: PathBuf,

    /// The annotation file, by default derived from the video name
    #[arg(short, long)]
    pub annotations: Option<PathBuf>,

    /// A JSON configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// How detections are produced
    #[arg(short, long, value_enum)]
    pub mode: Option<EvaluationMode>,

    /// The tracker variant
    ///
    /// `simple_siamese` and `capacity` name the identities they find themselves. A run with
    /// either of them aborts as soon as it reports an identity the annotation file lacks.
    #[arg(short, long, value_enum)]
    pub tracker: Option<TrackerKind>,

    /// Only score the whole path, not its parts
    #[arg(long, default_value_t = false)]
    pub no_compare_parts: bool,

    /// The length of a scored part in frames
    #[arg(short, long)]
    pub interval: Option<usize>,

    /// Stop after this many frames
    #[arg(long)]
    pub max_frames: Option<usize>,

    /// The directory the results are written to
    #[arg(short, long)]
    pub experiments: Option<PathBuf>,
}

impl Args {
    /// The configuration file (or the defaults) with the command line applied on top.
    pub fn config(&self) -> Result<EvaluationConfig> {
        let mut config = match &self.config {
            Some(path) => EvaluationConfig::from_file(path)?,
            None => EvaluationConfig::default(),
        };

        if let Some(mode) = self.mode {
            config.mode = mode;
        }
        if let Some(tracker) = self.tracker {
            config.tracker = tracker;
        }
        if self.no_compare_parts {
            config.compare_parts = false;
        }
        if let Some(interval) = self.interval {
            config.interval = interval;
        }
        if self.max_frames.is_some() {
            config.max_frames = self.max_frames;
        }
        if let Some(experiments) = &self.experiments {
            config.experiments_root = experiments.clone();
        }

        Ok(config)
    }

    /// The annotation file of the video.
    pub fn annotation_file(&self, config: &EvaluationConfig) -> PathBuf {
        self.annotations
            .clone()
            .unwrap_or_else(|| config.annotation_path(&self.video))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::{error::ErrorKind, CommandFactory};

    #[test]
    fn requires_exactly_one_video() {
        let err = Args::try_parse_from(["evaluation"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
        assert!(err.render().to_string().contains("evaluation"));

        let err = Args::try_parse_from(["evaluation", "videos/15", "videos/16"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownArgument);
        assert!(err.render().to_string().contains("Usage: evaluation"));
    }

    #[test]
    fn command_line_overrides_defaults() -> Result<()> {
        let args = Args::try_parse_from([
            "evaluation",
            "videos/15_nursery_medium_activity_night",
            "--mode",
            "full",
            "--tracker",
            "simple_siamese",
            "--no-compare-parts",
            "--interval",
            "5",
            "--max-frames",
            "100",
        ])
        .unwrap();

        let config = args.config()?;
        assert_eq!(config.mode, EvaluationMode::Full);
        assert_eq!(config.tracker, TrackerKind::SimpleSiamese);
        assert!(!config.compare_parts);
        assert_eq!(config.interval, 5);
        assert_eq!(config.max_frames, Some(100));
        assert_eq!(
            args.annotation_file(&config),
            PathBuf::from("data/tracking/15/pigs_tracking.json")
        );

        Ok(())
    }

    #[test]
    fn defaults_match_the_reference_run() -> Result<()> {
        let args = Args::try_parse_from(["evaluation", "videos/15"]).unwrap();
        let config = args.config()?;

        assert_eq!(config.mode, EvaluationMode::TrackingOnly);
        assert_eq!(config.tracker, TrackerKind::PathCorrection);
        assert!(config.compare_parts);
        assert_eq!(config.interval, 10);

        Ok(())
    }

    #[test]
    fn tracker_help_warns_about_invented_identities() {
        let help = Args::command().render_long_help().to_string();
        assert!(help.contains("simple_siamese"));
        assert!(help.contains("aborts"));
        assert!(help.contains("lacks"));
    }
}
