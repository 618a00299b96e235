use super::association::{Association, Strategy};
use crate::*;
use anyhow::{bail, Result};
use log::debug;

/// Tracks at most `capacity` identities, numbered `"0"`, `"1"`, ... in order of appearance.
///
/// Once every slot is taken, unmatched detections are dropped.
#[derive(Debug, Clone)]
pub struct CapacityTracker {
    capacity: usize,
    association: Association,
}

impl CapacityTracker {
    /// Returns a new CapacityTracker
    ///
    /// # Parameters
    ///
    /// * `capacity`: The maximum number of identities, i.e. the number of pigs in the pen.
    pub fn new(capacity: usize) -> CapacityTracker {
        CapacityTracker {
            capacity,
            association: Association::default(),
        }
    }

    fn next_id(&self) -> Option<ObjectId> {
        if self.association.len() >= self.capacity {
            return None;
        }
        (0..)
            .map(|n: usize| n.to_string())
            .find(|id| !self.association.contains(id))
    }
}

impl Tracker for CapacityTracker {
    fn name(&self) -> &'static str {
        "capacity"
    }

    fn seed(&mut self, objects: Vec<(ObjectId, Detection)>) -> Result<()> {
        if self.association.len() + objects.len() > self.capacity {
            bail!(
                "cannot seed {} identities into a tracker with capacity {}",
                objects.len(),
                self.capacity
            );
        }
        for (id, detection) in objects {
            self.association.spawn(id, detection)?;
        }
        self.association.fit()
    }

    fn update(&mut self, detections: Vec<Detection>) -> Result<TrackerOutput> {
        let mut unmatched = self.association.associate(detections, Strategy::Fused)?;

        unmatched.sort_by(|a, b| b.confidence().total_cmp(&a.confidence()));
        for detection in unmatched {
            match self.next_id() {
                Some(id) => self.association.spawn(id, detection)?,
                None => debug!(
                    "frame {}: all {} identities in use, dropping detection",
                    self.association.frame(),
                    self.capacity
                ),
            }
        }

        Ok(TrackerOutput {
            objects: self.association.finish()?,
            corrections: vec![],
        })
    }

    fn reset(&mut self) {
        self.association.reset();
    }
}
