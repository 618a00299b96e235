use crate::{
    annotation::Annotations,
    config::{EvaluationConfig, TrackerKind},
    error::Result,
    evaluator::Evaluator,
    onnx::{OnnxDetector, OnnxSiamese},
    persistence::ResultsDir,
    report::write_reports,
    scores::extract_scores,
};
use chrono::NaiveDateTime;
use log::info;
use pigtrack::{
    CapacityTracker, DefaultTracker, DefaultTrackerWithPathCorrection, Model, ObjectId,
    SimpleSiameseTracker, Tracker,
};
use std::path::Path;

/// The tracker variant selected by `config`.
///
/// The name based trackers use the configured roster, or `annotated` when none is configured.
pub fn build_tracker(config: &EvaluationConfig, annotated: &[ObjectId]) -> Box<dyn Tracker> {
    let names = if config.names.is_empty() {
        annotated.to_vec()
    } else {
        config.names.clone()
    };

    match config.tracker {
        TrackerKind::Default => Box::new(DefaultTracker::new(names)),
        TrackerKind::SimpleSiamese => Box::new(SimpleSiameseTracker::new()),
        TrackerKind::Capacity => Box::new(CapacityTracker::new(config.capacity)),
        TrackerKind::PathCorrection => Box::new(DefaultTrackerWithPathCorrection::new(names)),
    }
}

/// Assemble the ONNX detector and siamese network with the configured tracker.
pub fn build_model(config: &EvaluationConfig, annotation_file: &Path) -> Result<Model> {
    let annotations = Annotations::from_file(annotation_file)?;
    let annotated = annotations.ids().cloned().collect::<Vec<_>>();

    let siamese = OnnxSiamese::new(config.siamese.clone())?;
    let detector = OnnxDetector::new(config.detector.clone());

    Ok(Model::new(
        Box::new(detector),
        Box::new(siamese),
        build_tracker(config, &annotated),
    ))
}

/// Evaluate `model` on one video and write every result to a new timestamped directory.
pub fn evaluate_and_persist(
    model: Model,
    config: &EvaluationConfig,
    video: &Path,
    annotation_file: &Path,
    now: NaiveDateTime,
) -> Result<ResultsDir> {
    let mut evaluator = Evaluator::new(
        model,
        vec![video.to_path_buf()],
        vec![annotation_file.to_path_buf()],
    )?;
    evaluator
        .with_match_distance(config.match_distance)
        .with_max_frames(config.max_frames);

    let (scores, annotations, paths) = evaluator.run_evaluation_for_video(
        video,
        annotation_file,
        config.mode,
        config.compare_parts,
        config.interval,
    )?;
    let scores = extract_scores(&scores, &paths)?;

    let results = ResultsDir::create(&config.experiments_root, &config.video_tag(video), now)?;
    let reports = write_reports(results.path(), &annotations, &paths, &scores)?;
    results.write(&annotations, &paths, &scores)?;
    info!(
        "{} object reports written to {}",
        reports.len(),
        results.path().display()
    );

    Ok(results)
}
