mod association;
mod capacity_tracker;
mod default_tracker;
mod path_correction;
mod simple_siamese_tracker;

pub use capacity_tracker::CapacityTracker;
pub use default_tracker::DefaultTracker;
pub use path_correction::DefaultTrackerWithPathCorrection;
pub use simple_siamese_tracker::SimpleSiameseTracker;
