use crate::{Detection, DistanceMetricFn, ObjectId, Track};
use anyhow::{Ok, Result};
use ndarray::*;
use std::{collections::HashMap, fmt, rc::Rc};

fn normalize_rows(x: &Array2<f32>) -> Array2<f32> {
    let norms = x
        .map_axis(Axis(1), |row| row.dot(&row).sqrt().max(f32::EPSILON))
        .insert_axis(Axis(1));
    x / &norms
}

/// Compute pair-wise cosine distance between points in `x` and `y`.
///
/// # Parameters
///
/// * `x`: A matrix of N non-normalized row-vectors (sample points).
/// * `y`: A matrix of M non-normalized row-vectors (query points).
///
/// # Returns
///
/// A vector of length M that contains for each entry in `y` the smallest cosine distance to a sample in `x`.
fn cosine_distance(x: &Array2<f32>, y: &Array2<f32>) -> Array1<f32> {
    let x_norm = normalize_rows(x);
    let y_norm = normalize_rows(y);

    let distances = 1.0 - x_norm.dot(&y_norm.t());

    distances.fold_axis(Axis(0), f32::MAX, |&accumulator, &value| {
        accumulator.min(value)
    })
}

/// A nearest neighbor distance metric that, for each identity, returns the closest cosine distance to any embedding observed so far.
#[derive(Clone)]
pub struct NearestNeighborDistanceMetric {
    /// The matching threshold. Samples with larger distance are considered an invalid match.
    matching_threshold: f32,
    /// If not None, fix samples per identity to at most this number. Removes the oldest samples when the budget is reached.
    budget: Option<usize>,
    /// Maps identities to the embeddings that have been observed so far.
    samples: HashMap<ObjectId, Array2<f32>>,
}

impl Default for NearestNeighborDistanceMetric {
    fn default() -> Self {
        Self::new(None, None)
    }
}

impl fmt::Debug for NearestNeighborDistanceMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NearestNeighborDistanceMetric")
            .field("matching_threshold", &self.matching_threshold)
            .field("budget", &self.budget)
            .field("identities", &self.samples.len())
            .finish()
    }
}

impl NearestNeighborDistanceMetric {
    /// Returns a new NearestNeighborDistanceMetric
    ///
    /// # Parameters
    ///
    /// * `matching_threshold`: The matching threshold. Samples with larger distance are considered an invalid match. Default `0.2`.
    /// * `budget`: If not None, fix samples per identity to at most this number. Removes the oldest samples when the budget is reached.
    pub fn new(matching_threshold: Option<f32>, budget: Option<usize>) -> NearestNeighborDistanceMetric {
        NearestNeighborDistanceMetric {
            matching_threshold: matching_threshold.unwrap_or(0.2),
            budget,
            samples: HashMap::new(),
        }
    }

    /// Set budget
    pub fn with_budget(&mut self, budget: usize) -> &mut Self {
        self.budget = Some(budget);
        self
    }

    /// Return the matching threshold
    pub fn matching_threshold(&self) -> f32 {
        self.matching_threshold
    }

    /// Forget every stored embedding.
    pub fn clear(&mut self) {
        self.samples.clear();
    }

    /// Update the distance metric with new data.
    ///
    /// # Parameters
    ///
    /// * `features`: An NxM matrix of N features of dimensionality M.
    /// * `targets`: The identities associated with each row of `features`.
    /// * `active_targets`: The identities that are still known to the tracker.
    pub fn partial_fit(
        &mut self,
        features: &Array2<f32>,
        targets: &[ObjectId],
        active_targets: &[ObjectId],
    ) -> Result<()> {
        targets
            .iter()
            .zip(features.rows())
            .try_for_each(|(target, feature)| {
                match self.samples.get_mut(target) {
                    Some(target_features) => {
                        target_features.push_row(feature)?;

                        // if budget is set keep only the newest rows
                        if let Some(budget) = self.budget {
                            if target_features.nrows() > budget {
                                target_features.slice_collapse(s![-(budget as isize).., ..]);
                            }
                        }
                    }
                    None => {
                        let mut target_features = Array2::<f32>::zeros((0, feature.len()));
                        target_features.push_row(feature)?;
                        self.samples.insert(target.to_owned(), target_features);
                    }
                };

                Ok(())
            })?;

        self.samples.retain(|k, _| active_targets.contains(k));

        Ok(())
    }

    /// Compute the distance between an identity's gallery and a single embedding.
    ///
    /// Returns `None` when nothing has been observed for `target`.
    pub fn min_distance(&self, target: &str, feature: ArrayView1<f32>) -> Option<f32> {
        let samples = self.samples.get(target)?;
        if samples.nrows() == 0 || samples.ncols() != feature.len() {
            return None;
        }
        let query = feature.to_owned().insert_axis(Axis(0));
        cosine_distance(samples, &query).get(0).copied()
    }

    /// Create the appearance distance function used for association.
    ///
    /// The function shares `metric` rather than copying the galleries.
    ///
    /// # Returns
    ///
    /// A function that calculates the distance between the incoming detection embeddings and each track's gallery.
    /// Pairs without an embedding on either side cost `1.0`.
    pub fn distance_metric(metric: &Rc<NearestNeighborDistanceMetric>) -> DistanceMetricFn {
        let nn_metric = Rc::clone(metric);

        Rc::new(move |tracks: &[Track], detections: &[Detection]| -> Result<Array2<f32>> {
            Ok(Array2::from_shape_fn(
                (tracks.len(), detections.len()),
                |(row, col)| {
                    detections[col]
                        .feature()
                        .as_ref()
                        .and_then(|feature| {
                            nn_metric.min_distance(tracks[row].id(), feature.view())
                        })
                        .unwrap_or(1.0)
                },
            ))
        })
    }
}
