//! Multi-object tracking of pigs: geometry, appearance matching, the [`Tracker`] variants and the
//! [`Model`] facade that ties a detector and a re-identification network to a tracker.

mod bounding_box;
mod detection;
pub mod iou_matching;
pub mod linear_assignment;
mod model;
pub mod nn_matching;
mod track;
mod tracker;
mod trackers;

pub use bounding_box::BoundingBox;
pub use detection::Detection;
pub use linear_assignment::{DistanceMetricFn, Match};
pub use model::{DetectionModel, Model, SiameseModel};
pub use nn_matching::NearestNeighborDistanceMetric;
pub use track::{MatchSource, ObjectId, Track, TrackState};
pub use tracker::{PathCorrection, TrackedObject, Tracker, TrackerOutput};
pub use trackers::{
    CapacityTracker, DefaultTracker, DefaultTrackerWithPathCorrection, SimpleSiameseTracker,
};
