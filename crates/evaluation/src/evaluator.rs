use crate::{
    annotation::Annotations,
    config::EvaluationMode,
    error::{Error, Result},
    path::{set_point, Paths, Point},
    scores::{ObjectScore, Scores},
    video::Video,
};
use log::{debug, info, warn};
use pigtrack::{Detection, Model};
use std::path::{Path, PathBuf};

/// Scores, ground-truth paths and predicted paths of one video.
pub type EvaluationResult = (Scores, Paths, Paths);

/// Runs a [`Model`] over videos and scores the predicted paths against their annotations.
pub struct Evaluator {
    model: Model,
    videos: Vec<PathBuf>,
    annotation_files: Vec<PathBuf>,
    match_distance: f32,
    max_frames: Option<usize>,
}

impl Evaluator {
    /// Returns a new Evaluator
    ///
    /// # Parameters
    ///
    /// * `model`: The model under evaluation.
    /// * `videos`: The videos to evaluate.
    /// * `annotation_files`: The annotation file of each video, in the same order.
    pub fn new(
        model: Model,
        videos: Vec<PathBuf>,
        annotation_files: Vec<PathBuf>,
    ) -> Result<Evaluator> {
        if videos.len() != annotation_files.len() {
            return Err(Error::LengthMismatch {
                videos: videos.len(),
                annotations: annotation_files.len(),
            });
        }

        Ok(Evaluator {
            model,
            videos,
            annotation_files,
            match_distance: 50.0,
            max_frames: None,
        })
    }

    /// Set the largest distance in pixels that still counts as a match
    pub fn with_match_distance(&mut self, match_distance: f32) -> &mut Self {
        self.match_distance = match_distance;
        self
    }

    /// Only evaluate the first `max_frames` frames of each video
    pub fn with_max_frames(&mut self, max_frames: Option<usize>) -> &mut Self {
        self.max_frames = max_frames;
        self
    }

    /// Evaluate every video against its annotation file, in order.
    pub fn run_evaluation(
        &mut self,
        mode: EvaluationMode,
        compare_parts: bool,
        compare_part_interval: usize,
    ) -> Result<Vec<EvaluationResult>> {
        let pairs = self
            .videos
            .iter()
            .cloned()
            .zip(self.annotation_files.iter().cloned())
            .collect::<Vec<_>>();

        pairs
            .iter()
            .map(|(video, annotation_file)| {
                self.run_evaluation_for_video(
                    video,
                    annotation_file,
                    mode,
                    compare_parts,
                    compare_part_interval,
                )
            })
            .collect()
    }

    /// Run the model over one video and score every annotated object.
    ///
    /// The tracker is seeded with the objects annotated on the first frame so its identities line
    /// up with the annotation. In [`EvaluationMode::TrackingOnly`] the annotated boxes of each
    /// frame are used as detections.
    ///
    /// # Returns
    ///
    /// `(scores, annotations, paths)`, where the annotations cover the whole annotation file and
    /// the paths cover the processed frames.
    pub fn run_evaluation_for_video(
        &mut self,
        video: &Path,
        annotation_file: &Path,
        mode: EvaluationMode,
        compare_parts: bool,
        compare_part_interval: usize,
    ) -> Result<EvaluationResult> {
        if compare_parts && compare_part_interval == 0 {
            return Err(Error::InvalidInterval);
        }

        let annotations = Annotations::from_file(annotation_file)?;
        let video = Video::open(video)?;
        info!(
            "evaluating {} ({} frames) with the {} tracker",
            video.source().display(),
            video.frame_count(),
            self.model.tracker_name()
        );
        if video.frame_count() != annotations.frame_count() {
            warn!(
                "{} has {} frames but {} annotates {}",
                video.source().display(),
                video.frame_count(),
                annotation_file.display(),
                annotations.frame_count()
            );
        }

        self.model.reset();
        let mut paths = annotations
            .ids()
            .map(|id| (id.clone(), vec![]))
            .collect::<Paths>();

        let model = &mut self.model;
        let frame_count = video.for_each_frame(self.max_frames, |index, frame| {
            if index == 0 {
                model.seed(frame, annotations.frame(0))?;
            }

            let output = match mode {
                EvaluationMode::TrackingOnly => {
                    let detections = annotations
                        .frame(index)
                        .into_iter()
                        .map(|(_, bbox)| Detection::new(bbox, 1.0, None))
                        .collect();
                    model.track_detections(frame, detections)?
                }
                EvaluationMode::Full => model.track(frame)?,
            };

            for object in &output.objects {
                set_point(
                    paths.entry(object.id.clone()).or_default(),
                    index,
                    Point::from(&object.bbox),
                );
            }
            for correction in &output.corrections {
                debug!(
                    "frame {index}: correcting {} on frame {}",
                    correction.id, correction.frame
                );
                set_point(
                    paths.entry(correction.id.clone()).or_default(),
                    correction.frame,
                    Point::from(&correction.bbox),
                );
            }

            Ok(())
        })?;

        paths
            .values_mut()
            .for_each(|path| path.resize(frame_count, None));

        let annotation_paths = annotations.paths();
        if let Some(obj_id) = paths
            .keys()
            .find(|obj_id| !annotation_paths.contains_key(*obj_id))
        {
            return Err(Error::MissingObject {
                obj_id: obj_id.clone(),
                missing_from: "annotations",
            });
        }
        if let Some(obj_id) = annotation_paths
            .keys()
            .find(|obj_id| !paths.contains_key(*obj_id))
        {
            return Err(Error::MissingObject {
                obj_id: obj_id.clone(),
                missing_from: "paths",
            });
        }

        let scores = paths
            .iter()
            .map(|(obj_id, path)| {
                let score = ObjectScore::compare(
                    &annotation_paths[obj_id],
                    path,
                    self.match_distance,
                    compare_part_interval,
                    compare_parts,
                );
                (obj_id.clone(), score)
            })
            .collect::<Scores>();

        let mean = if scores.is_empty() {
            0.0
        } else {
            scores.values().map(|score| score.score).sum::<f64>() / scores.len() as f64
        };
        info!(
            "{} frames, {} objects, mean score {mean:.3}",
            frame_count,
            scores.len()
        );

        Ok((scores, annotation_paths, paths))
    }
}
