use super::association::Reacquisition;
use crate::*;
use anyhow::Result;
use log::debug;

/// A [`DefaultTracker`] that repairs the path of re-identified pigs.
///
/// When a lost identity is matched again, the frames it went missing for are filled by linear
/// interpolation between its last and its new position and reported as [`PathCorrection`]s.
#[derive(Debug, Clone)]
pub struct DefaultTrackerWithPathCorrection {
    tracker: DefaultTracker,
}

impl DefaultTrackerWithPathCorrection {
    /// Returns a new DefaultTrackerWithPathCorrection
    ///
    /// # Parameters
    ///
    /// * `names`: The roster of identities the tracker may hand out.
    pub fn new<I, S>(names: I) -> DefaultTrackerWithPathCorrection
    where
        I: IntoIterator<Item = S>,
        S: Into<ObjectId>,
    {
        DefaultTrackerWithPathCorrection {
            tracker: DefaultTracker::new(names),
        }
    }
}

/// Interpolate the centers of the frames strictly between the last sighting and the re-acquisition.
fn interpolate(reacquisition: &Reacquisition) -> Vec<PathCorrection> {
    let Reacquisition {
        id,
        last_seen_frame,
        last_bbox,
        frame,
        bbox,
    } = reacquisition;

    let gap = frame.saturating_sub(*last_seen_frame) as f32;
    let (x0, y0) = last_bbox.center();
    let (x1, y1) = bbox.center();

    (last_seen_frame + 1..*frame)
        .map(|missing| {
            let t = (missing - last_seen_frame) as f32 / gap;
            PathCorrection {
                id: id.clone(),
                frame: missing,
                bbox: last_bbox.centered_at(x0 + (x1 - x0) * t, y0 + (y1 - y0) * t),
            }
        })
        .collect()
}

impl Tracker for DefaultTrackerWithPathCorrection {
    fn name(&self) -> &'static str {
        "default_with_path_correction"
    }

    fn seed(&mut self, objects: Vec<(ObjectId, Detection)>) -> Result<()> {
        self.tracker.seed(objects)
    }

    fn update(&mut self, detections: Vec<Detection>) -> Result<TrackerOutput> {
        let (objects, reacquired) = self.tracker.step(detections)?;

        let corrections = reacquired
            .iter()
            .flat_map(|reacquisition| {
                let corrections = interpolate(reacquisition);
                if !corrections.is_empty() {
                    debug!(
                        "correcting {} frames of {}",
                        corrections.len(),
                        reacquisition.id
                    );
                }
                corrections
            })
            .collect();

        Ok(TrackerOutput {
            objects,
            corrections,
        })
    }

    fn reset(&mut self) {
        self.tracker.reset();
    }
}
