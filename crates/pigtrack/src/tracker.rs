use crate::*;
use anyhow::Result;

/// An identity reported by a tracker on the current frame.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackedObject {
    pub id: ObjectId,
    pub bbox: BoundingBox,
}

/// A retroactive position for an identity on an earlier frame.
#[derive(Debug, Clone, PartialEq)]
pub struct PathCorrection {
    pub id: ObjectId,
    pub frame: usize,
    pub bbox: BoundingBox,
}

/// The result of feeding one frame of detections to a tracker.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackerOutput {
    /// Identities matched or created on this frame.
    pub objects: Vec<TrackedObject>,
    /// Positions filled in for frames the tracker has already reported.
    pub corrections: Vec<PathCorrection>,
}

/// The multi-object tracking capability shared by every tracker variant.
///
/// A tracker consumes one frame of detections at a time (with embeddings attached by the
/// siamese model) and maintains persistent identities across frames.
///
/// # Examples
///
/// ```
/// use pigtrack::{BoundingBox, Detection, DefaultTracker, Tracker};
///
/// let mut tracker = DefaultTracker::new(["pig1", "pig2"]);
///
/// let detection = Detection::new(BoundingBox::new(0.0, 0.0, 50.0, 30.0), 1.0, Some(vec![1.0; 8]));
/// tracker.seed(vec![("pig1".to_string(), detection.clone())]).unwrap();
///
/// let output = tracker.update(vec![detection]).unwrap();
/// assert_eq!(output.objects[0].id, "pig1");
/// ```
pub trait Tracker {
    /// Short name of the tracking strategy, used in logs.
    fn name(&self) -> &'static str;

    /// Pre-assign identities before the first update.
    fn seed(&mut self, objects: Vec<(ObjectId, Detection)>) -> Result<()>;

    /// Perform association and track management for one frame.
    fn update(&mut self, detections: Vec<Detection>) -> Result<TrackerOutput>;

    /// Forget every identity so the tracker can process another video.
    fn reset(&mut self);
}
