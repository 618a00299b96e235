use crate::{
    error::{Error, Result},
    path::{aligned_annotation, Paths, Point},
};
use indexmap::IndexMap;
use pigtrack::ObjectId;
use serde::{Deserialize, Serialize};

/// Verdict of one frame of a predicted path against its annotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameOutcome {
    /// Both present and within the match distance.
    Matched,
    /// Both present but too far apart.
    Drifted,
    /// Annotated but not predicted.
    Missed,
    /// Predicted but not annotated.
    Spurious,
    /// Neither annotated nor predicted.
    Absent,
}

impl FrameOutcome {
    pub fn is_annotated(&self) -> bool {
        matches!(
            self,
            FrameOutcome::Matched | FrameOutcome::Drifted | FrameOutcome::Missed
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartScore {
    /// First frame of the part.
    pub start: usize,
    /// One past the last frame of the part.
    pub end: usize,
    pub annotated: usize,
    pub matched: usize,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Intervals {
    /// Length of a part in frames.
    pub interval: usize,
    /// Empty unless parts were compared.
    pub parts: Vec<PartScore>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectScore {
    pub frames: Vec<FrameOutcome>,
    /// Distance between prediction and annotation on the frames that have both.
    pub distances: Vec<Option<f32>>,
    pub annotated: usize,
    pub matched: usize,
    pub drifted: usize,
    pub missed: usize,
    pub spurious: usize,
    /// Share of the annotated frames that were matched.
    pub score: f64,
    pub mean_distance: Option<f64>,
    pub intervals: Intervals,
}

pub type Scores = IndexMap<ObjectId, ObjectScore>;

fn ratio(matched: usize, annotated: usize) -> f64 {
    if annotated == 0 {
        0.0
    } else {
        matched as f64 / annotated as f64
    }
}

impl ObjectScore {
    /// Compare a predicted path to its annotation over the frames of the prediction.
    pub fn compare(
        annotation: &[Option<Point>],
        path: &[Option<Point>],
        match_distance: f32,
        interval: usize,
        compare_parts: bool,
    ) -> ObjectScore {
        let annotation = aligned_annotation(annotation, path.len());

        let (frames, distances) = annotation
            .iter()
            .zip(path)
            .map(|(expected, predicted)| match (expected, predicted) {
                (Some(expected), Some(predicted)) => {
                    let distance = expected.distance(predicted);
                    let outcome = if distance <= match_distance {
                        FrameOutcome::Matched
                    } else {
                        FrameOutcome::Drifted
                    };
                    (outcome, Some(distance))
                }
                (Some(_), None) => (FrameOutcome::Missed, None),
                (None, Some(_)) => (FrameOutcome::Spurious, None),
                (None, None) => (FrameOutcome::Absent, None),
            })
            .unzip();

        ObjectScore::from_frames(frames, distances, interval, compare_parts)
    }

    /// Aggregate per-frame verdicts. Parts of `interval` frames are only produced with `with_parts`.
    pub fn from_frames(
        frames: Vec<FrameOutcome>,
        distances: Vec<Option<f32>>,
        interval: usize,
        with_parts: bool,
    ) -> ObjectScore {
        let count = |outcome: FrameOutcome| frames.iter().filter(|frame| **frame == outcome).count();
        let matched = count(FrameOutcome::Matched);
        let drifted = count(FrameOutcome::Drifted);
        let missed = count(FrameOutcome::Missed);
        let spurious = count(FrameOutcome::Spurious);
        let annotated = matched + drifted + missed;

        let measured = distances.iter().flatten().collect::<Vec<_>>();
        let mean_distance = (!measured.is_empty()).then(|| {
            measured.iter().map(|distance| **distance as f64).sum::<f64>() / measured.len() as f64
        });

        let parts = if with_parts && interval > 0 {
            frames
                .chunks(interval)
                .enumerate()
                .map(|(index, part)| {
                    let annotated = part.iter().filter(|frame| frame.is_annotated()).count();
                    let matched = part
                        .iter()
                        .filter(|frame| **frame == FrameOutcome::Matched)
                        .count();
                    PartScore {
                        start: index * interval,
                        end: index * interval + part.len(),
                        annotated,
                        matched,
                        score: ratio(matched, annotated),
                    }
                })
                .collect()
        } else {
            vec![]
        };

        ObjectScore {
            annotated,
            matched,
            drifted,
            missed,
            spurious,
            score: ratio(matched, annotated),
            mean_distance,
            intervals: Intervals { interval, parts },
            frames,
            distances,
        }
    }
}

/// Normalise raw scores against the predicted paths.
///
/// Every record is cut to the length of its object's path and its aggregates are recomputed at the
/// record's own interval. Records without parts stay without parts. Applying this to its own
/// output changes nothing.
pub fn extract_scores(scores: &Scores, paths: &Paths) -> Result<Scores> {
    if let Some(obj_id) = paths.keys().find(|obj_id| !scores.contains_key(*obj_id)) {
        return Err(Error::MissingObject {
            obj_id: obj_id.clone(),
            missing_from: "scores",
        });
    }

    scores
        .iter()
        .map(|(obj_id, score)| {
            let path = paths.get(obj_id).ok_or_else(|| Error::MissingObject {
                obj_id: obj_id.clone(),
                missing_from: "paths",
            })?;
            let len = path.len().min(score.frames.len());

            let frames = score.frames[..len].to_vec();
            let mut distances = score.distances.iter().take(len).copied().collect::<Vec<_>>();
            distances.resize(len, None);

            let record = ObjectScore::from_frames(
                frames,
                distances,
                score.intervals.interval,
                !score.intervals.parts.is_empty(),
            );
            Ok((obj_id.clone(), record))
        })
        .collect()
}
