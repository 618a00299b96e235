use crate::*;
use anyhow::{bail, Result};
use log::debug;
use ndarray::*;
use std::rc::Rc;

/// A lost identity that was matched again.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Reacquisition {
    pub id: ObjectId,
    pub last_seen_frame: usize,
    pub last_bbox: BoundingBox,
    pub frame: usize,
    pub bbox: BoundingBox,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Strategy {
    /// Tracked identities by IoU fused with appearance, then lost identities by appearance.
    Fused,
    /// Every identity by appearance only.
    AppearanceOnly,
}

/// Track bookkeeping and association shared by the tracker variants.
///
/// The variants differ only in how unmatched detections turn into new identities.
#[derive(Debug, Clone)]
pub(crate) struct Association {
    /// Tracks ordered by creation.
    tracks: Vec<Track>,
    /// Appearance galleries keyed by identity, shared with the cost functions of the current frame.
    metric: Rc<NearestNeighborDistanceMetric>,
    /// IoU distance above which a pair can only match on appearance.
    max_iou_distance: f32,
    /// Gating threshold of the fused cost.
    max_fused_distance: f32,
    /// Share of the appearance distance in the fused cost.
    appearance_weight: f32,
    /// Index of the frame being processed.
    frame: usize,
    next_serial: usize,
    /// Embeddings observed this frame, folded into the galleries by `fit`.
    pending: Vec<(ObjectId, Array1<f32>)>,
    reacquired: Vec<Reacquisition>,
}

impl Default for Association {
    fn default() -> Self {
        let mut metric = NearestNeighborDistanceMetric::default();
        metric.with_budget(30);

        Association {
            tracks: vec![],
            metric: Rc::new(metric),
            max_iou_distance: 0.7,
            max_fused_distance: 0.6,
            appearance_weight: 0.5,
            frame: 0,
            next_serial: 0,
            pending: vec![],
            reacquired: vec![],
        }
    }
}

impl Association {
    pub fn frame(&self) -> usize {
        self.frame
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.tracks.iter().any(|track| track.id() == id)
    }

    pub fn ids(&self) -> Vec<ObjectId> {
        self.tracks.iter().map(|track| track.id().clone()).collect()
    }

    pub fn reset(&mut self) {
        self.tracks.clear();
        Rc::make_mut(&mut self.metric).clear();
        self.frame = 0;
        self.next_serial = 0;
        self.pending.clear();
        self.reacquired.clear();
    }

    /// Start a new identity from an unmatched detection on the current frame.
    pub fn spawn(&mut self, id: ObjectId, detection: Detection) -> Result<()> {
        if self.contains(&id) {
            bail!("identity {id} is already tracked");
        }
        debug!("frame {}: new identity {id}", self.frame);

        if let Some(feature) = detection.feature() {
            self.pending.push((id.clone(), feature.clone()));
        }
        self.tracks
            .push(Track::new(id, self.next_serial, &detection, self.frame));
        self.next_serial += 1;

        Ok(())
    }

    /// Match the current frame's detections against the known identities.
    ///
    /// # Returns
    ///
    /// The detections no identity was matched to, in their input order.
    pub fn associate(
        &mut self,
        detections: Vec<Detection>,
        strategy: Strategy,
    ) -> Result<Vec<Detection>> {
        let (tracked, lost): (Vec<Track>, Vec<Track>) = std::mem::take(&mut self.tracks)
            .into_iter()
            .partition(|track| track.is_tracked());

        let mut associated = Vec::with_capacity(tracked.len() + lost.len());
        let (unmatched_tracks, unmatched_detections) = match strategy {
            Strategy::Fused => {
                // Step 1
                // Associate tracked identities using IoU fused with appearance.
                let (matches, unmatched_tracked, detections) = linear_assignment::min_cost_matching(
                    self.fused_metric(),
                    self.max_fused_distance,
                    tracked,
                    detections,
                )?;
                self.apply(matches, |distance| MatchSource::Fused { distance }, &mut associated);

                // Step 2
                // Re-identify lost identities using appearance alone.
                let (matches, unmatched_lost, detections) = linear_assignment::min_cost_matching(
                    NearestNeighborDistanceMetric::distance_metric(&self.metric),
                    self.metric.matching_threshold(),
                    lost,
                    detections,
                )?;
                self.apply(
                    matches,
                    |distance| MatchSource::Appearance { distance },
                    &mut associated,
                );

                let mut unmatched_tracks = unmatched_tracked;
                unmatched_tracks.extend(unmatched_lost);
                (unmatched_tracks, detections)
            }
            Strategy::AppearanceOnly => {
                let mut pool = tracked;
                pool.extend(lost);
                pool.sort_by_key(|track| track.serial());

                let (matches, unmatched_tracks, detections) = linear_assignment::min_cost_matching(
                    NearestNeighborDistanceMetric::distance_metric(&self.metric),
                    self.metric.matching_threshold(),
                    pool,
                    detections,
                )?;
                self.apply(
                    matches,
                    |distance| MatchSource::Appearance { distance },
                    &mut associated,
                );

                (unmatched_tracks, detections)
            }
        };

        // mark unmatched tracks as lost
        unmatched_tracks.into_iter().for_each(|mut track| {
            if track.is_tracked() {
                debug!("frame {}: lost {}", self.frame, track.id());
                track.mark_lost();
            }
            associated.push(track);
        });

        associated.sort_by_key(|track| track.serial());
        self.tracks = associated;

        Ok(unmatched_detections)
    }

    /// Fold this frame's embeddings into the appearance galleries.
    pub fn fit(&mut self) -> Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }

        let pending = std::mem::take(&mut self.pending);
        let targets = pending.iter().map(|(id, _)| id.clone()).collect::<Vec<_>>();
        let features = stack(
            Axis(0),
            &pending
                .iter()
                .map(|(_, feature)| feature.view())
                .collect::<Vec<_>>(),
        )?;

        let active = self.ids();
        Rc::make_mut(&mut self.metric).partial_fit(&features, &targets, &active)
    }

    /// Close the current frame.
    ///
    /// # Returns
    ///
    /// The identities observed on the frame, in creation order.
    pub fn finish(&mut self) -> Result<Vec<TrackedObject>> {
        self.fit()?;

        let objects = self
            .tracks
            .iter()
            .filter(|track| track.is_tracked() && track.last_seen_frame() == self.frame)
            .map(|track| TrackedObject {
                id: track.id().clone(),
                bbox: *track.bbox(),
            })
            .collect();
        self.frame += 1;

        Ok(objects)
    }

    pub fn take_reacquired(&mut self) -> Vec<Reacquisition> {
        std::mem::take(&mut self.reacquired)
    }

    fn apply(
        &mut self,
        matches: Vec<Match>,
        source: fn(f32) -> MatchSource,
        into: &mut Vec<Track>,
    ) {
        for Match {
            mut track,
            detection,
            distance,
        } in matches
        {
            if track.is_lost() {
                debug!(
                    "frame {}: re-identified {} last seen on frame {}",
                    self.frame,
                    track.id(),
                    track.last_seen_frame()
                );
                self.reacquired.push(Reacquisition {
                    id: track.id().clone(),
                    last_seen_frame: track.last_seen_frame(),
                    last_bbox: *track.bbox(),
                    frame: self.frame,
                    bbox: *detection.bbox(),
                });
            }
            if let Some(feature) = detection.feature() {
                self.pending.push((track.id().clone(), feature.clone()));
            }
            track.update(&detection, self.frame, source(distance));
            debug!(
                "frame {}: {} matched by {:?}",
                self.frame,
                track.id(),
                track.match_source()
            );
            into.push(track);
        }
    }

    /// IoU distance fused with the appearance distance.
    ///
    /// Pairs that barely overlap only survive when their appearance is within the matching threshold.
    fn fused_metric(&self) -> DistanceMetricFn {
        let iou_cost = iou_matching::intersection_over_union_cost();
        let nn_metric = Rc::clone(&self.metric);
        let appearance_weight = self.appearance_weight;
        let max_iou_distance = self.max_iou_distance;

        Rc::new(
            move |tracks: &[Track], detections: &[Detection]| -> Result<Array2<f32>> {
                let iou = iou_cost(tracks, detections)?;

                Ok(Array2::from_shape_fn(iou.raw_dim(), |(row, col)| {
                    let iou_distance = iou[[row, col]];
                    let appearance = detections[col]
                        .feature()
                        .as_ref()
                        .and_then(|feature| nn_metric.min_distance(tracks[row].id(), feature.view()));

                    match appearance {
                        Some(distance)
                            if iou_distance > max_iou_distance
                                && distance > nn_metric.matching_threshold() =>
                        {
                            1.0
                        }
                        Some(distance) => {
                            appearance_weight * distance + (1.0 - appearance_weight) * iou_distance
                        }
                        None if iou_distance > max_iou_distance => 1.0,
                        None => iou_distance,
                    }
                }))
            },
        )
    }
}
