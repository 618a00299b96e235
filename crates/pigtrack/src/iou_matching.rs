use crate::*;
use anyhow::Result;
use ndarray::*;
use std::rc::Rc;

/// Compute intersection over union.
///
/// # Parameters
///
/// * `bbox`: A bounding box in format `(top left x, top left y, width, height)`.
/// * `candidates`: A matrix of candidate bounding boxes (one per row) in the same format as `bbox`.
///
/// # Returns
///
/// The intersection over union in [0.0, 1.0] between the `bbox` and each candidate.
pub fn intersection_over_union(bbox: &Array1<f32>, candidates: &Array2<f32>) -> Array1<f32> {
    let bbox_tl = bbox.slice(s![..2]).to_owned();
    let bbox_br = &bbox_tl + &bbox.slice(s![2..4]);
    let candidates_tl = candidates.slice(s![.., 0..2]).to_owned();
    let candidates_br = &candidates_tl + &candidates.slice(s![.., 2..4]);

    let tl = stack![
        Axis(1),
        candidates_tl.slice(s![.., 0]).mapv(|v| v.max(bbox_tl[0])),
        candidates_tl.slice(s![.., 1]).mapv(|v| v.max(bbox_tl[1]))
    ];
    let br = stack![
        Axis(1),
        candidates_br.slice(s![.., 0]).mapv(|v| v.min(bbox_br[0])),
        candidates_br.slice(s![.., 1]).mapv(|v| v.min(bbox_br[1]))
    ];
    let wh = (br - tl).mapv(|v| v.max(0.0));

    let area_intersection = wh.map_axis(Axis(1), |v| v[0] * v[1]);
    let area_bbox = bbox[2] * bbox[3];
    let area_candidates = candidates.map_axis(Axis(1), |v| v[2] * v[3]);

    let area_union = area_candidates + area_bbox - &area_intersection;
    Zip::from(&area_intersection)
        .and(&area_union)
        .map_collect(|&intersection, &union| {
            if union > 0.0 {
                intersection / union
            } else {
                0.0
            }
        })
}

/// Intersection over union distance metric.
///
/// # Returns
///
/// A function producing a cost matrix of shape `tracks.len(), detections.len()` where entry (i, j) is
/// `1 - iou(tracks[i], detections[j])`.
pub fn intersection_over_union_cost() -> DistanceMetricFn {
    Rc::new(
        move |tracks: &[Track], detections: &[Detection]| -> Result<Array2<f32>> {
            let candidates = detections
                .iter()
                .map(|detection| detection.bbox().to_tlwh())
                .collect::<Vec<_>>();
            let candidates: Array2<f32> = stack(
                Axis(0),
                &candidates.iter().map(|tlwh| tlwh.view()).collect::<Vec<_>>(),
            )?;

            let costs = tracks
                .iter()
                .map(|track| 1.0 - intersection_over_union(&track.bbox().to_tlwh(), &candidates))
                .collect::<Vec<_>>();

            Ok(stack(
                Axis(0),
                &costs.iter().map(|array1| array1.view()).collect::<Vec<_>>(),
            )?)
        },
    )
}
