use crate::*;
use anyhow::{anyhow, Ok, Result};
use log::debug;
use ndarray::*;
use pathfinding::{kuhn_munkres::kuhn_munkres_min, matrix::Matrix};
use std::rc::Rc;

pub type DistanceMetricFn = Rc<dyn Fn(&[Track], &[Detection]) -> Result<Array2<f32>>>;

#[derive(Debug)]
pub struct Match {
    pub track: Track,
    pub detection: Detection,
    pub distance: f32,
}

impl Match {
    /// Return a new Match
    ///
    /// # Parameters
    ///
    /// * `track`: The matched track.
    /// * `detection`: The matched detection.
    /// * `distance`: Match strength.
    pub fn new(track: Track, detection: Detection, distance: f32) -> Match {
        Match {
            track,
            detection,
            distance,
        }
    }
}

/// Solve linear assignment problem.
///
/// # Parameters
///
/// * `distance_metric` : The distance metric is given a list of tracks and detections and returns the NxM dimensional cost matrix,
///   where element (i, j) is the association cost between the i-th track and the j-th detection.
/// * `max_distance`: Gating threshold. Associations with cost larger than this value are disregarded.
/// * `tracks`: A list of tracks at the current time step.
/// * `detections`: A list of detections at the current time step.
///
/// # Returns
///
/// A tuple with the following three entries:
///
/// - A list of matches ordered by track.
/// - A list of unmatched tracks, in their input order.
/// - A list of unmatched detections, in their input order.
#[allow(clippy::type_complexity)]
pub fn min_cost_matching(
    distance_metric: DistanceMetricFn,
    max_distance: f32,
    tracks: Vec<Track>,
    detections: Vec<Detection>,
) -> Result<(Vec<Match>, Vec<Track>, Vec<Detection>)> {
    if tracks.is_empty() || detections.is_empty() {
        return Ok((vec![], tracks, detections));
    }

    let cost_matrix: Array2<f32> =
        (distance_metric)(&tracks, &detections)?.mapv(|v| v.min(max_distance + 1e-5));

    // kuhn munkres requires rows <= columns
    let (cost_matrix, transposed) = if cost_matrix.nrows() > cost_matrix.ncols() {
        (cost_matrix.t(), true)
    } else {
        (cost_matrix.view(), false)
    };

    // scale to i64 as f32 does not implement `std::cmp::Ord`
    let weights = Matrix::from_vec(
        cost_matrix.nrows(),
        cost_matrix.ncols(),
        cost_matrix
            .iter()
            .map(|v| (v * 1_000_000.0).round() as i64)
            .collect(),
    )
    .map_err(|err| anyhow!("invalid cost matrix: {err:?}"))?;

    // `kuhn_munkres_min` returns the assigned column for every row
    let (_, col_indices) = kuhn_munkres_min(&weights);

    let mut tracks = tracks.into_iter().map(Some).collect::<Vec<_>>();
    let mut detections = detections.into_iter().map(Some).collect::<Vec<_>>();

    let mut pairs = col_indices
        .into_iter()
        .enumerate()
        .filter_map(|(row, col)| {
            let distance = cost_matrix[[row, col]];
            let (track_idx, detection_idx) = if transposed { (col, row) } else { (row, col) };
            if distance < max_distance {
                Some((track_idx, detection_idx, distance))
            } else {
                debug!(
                    "rejected track {track_idx} / detection {detection_idx}: {distance} >= {max_distance}"
                );
                None
            }
        })
        .collect::<Vec<_>>();
    pairs.sort_by_key(|(track_idx, _, _)| *track_idx);

    let mut matches: Vec<Match> = Vec::with_capacity(pairs.len());
    pairs
        .into_iter()
        .try_for_each(|(track_idx, detection_idx, distance)| {
            let track = tracks[track_idx]
                .take()
                .ok_or_else(|| anyhow!("track {track_idx} assigned twice"))?;
            let detection = detections[detection_idx]
                .take()
                .ok_or_else(|| anyhow!("detection {detection_idx} assigned twice"))?;
            debug!("matched {} with distance {distance}", track.id());
            matches.push(Match::new(track, detection, distance));
            Ok(())
        })?;

    Ok((
        matches,
        tracks.into_iter().flatten().collect(),
        detections.into_iter().flatten().collect(),
    ))
}
