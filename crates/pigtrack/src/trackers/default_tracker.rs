use super::association::{Association, Reacquisition, Strategy};
use crate::*;
use anyhow::{bail, Result};
use log::debug;

/// Tracks a fixed roster of named pigs.
///
/// Tracked identities are associated by IoU fused with appearance, lost identities are
/// re-identified by appearance. An unmatched detection takes the first roster name that is not
/// in use yet; names are never released, so a pen of N pigs never yields more than N identities.
#[derive(Debug, Clone)]
pub struct DefaultTracker {
    /// The roster, in assignment order.
    names: Vec<ObjectId>,
    association: Association,
}

impl DefaultTracker {
    /// Returns a new DefaultTracker
    ///
    /// # Parameters
    ///
    /// * `names`: The roster of identities the tracker may hand out.
    pub fn new<I, S>(names: I) -> DefaultTracker
    where
        I: IntoIterator<Item = S>,
        S: Into<ObjectId>,
    {
        DefaultTracker {
            names: names.into_iter().map(Into::into).collect(),
            association: Association::default(),
        }
    }

    fn next_free_name(&self) -> Option<ObjectId> {
        self.names
            .iter()
            .find(|name| !self.association.contains(name))
            .cloned()
    }

    /// Process one frame and report the identities that were re-identified on it.
    pub(crate) fn step(
        &mut self,
        detections: Vec<Detection>,
    ) -> Result<(Vec<TrackedObject>, Vec<Reacquisition>)> {
        let mut unmatched = self.association.associate(detections, Strategy::Fused)?;

        // the most confident detections claim names first
        unmatched.sort_by(|a, b| b.confidence().total_cmp(&a.confidence()));
        for detection in unmatched {
            match self.next_free_name() {
                Some(name) => self.association.spawn(name, detection)?,
                None => debug!(
                    "frame {}: roster exhausted, dropping detection at {:?}",
                    self.association.frame(),
                    detection.bbox()
                ),
            }
        }

        let objects = self.association.finish()?;
        Ok((objects, self.association.take_reacquired()))
    }
}

impl Tracker for DefaultTracker {
    fn name(&self) -> &'static str {
        "default"
    }

    fn seed(&mut self, objects: Vec<(ObjectId, Detection)>) -> Result<()> {
        for (id, detection) in objects {
            if !self.names.contains(&id) {
                bail!("{id} is not in the tracker roster");
            }
            self.association.spawn(id, detection)?;
        }
        self.association.fit()
    }

    fn update(&mut self, detections: Vec<Detection>) -> Result<TrackerOutput> {
        let (objects, _) = self.step(detections)?;
        Ok(TrackerOutput {
            objects,
            corrections: vec![],
        })
    }

    fn reset(&mut self) {
        self.association.reset();
    }
}
