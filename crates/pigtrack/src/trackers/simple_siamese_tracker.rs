use super::association::{Association, Strategy};
use crate::*;
use anyhow::Result;
use log::debug;

/// Associates detections to identities by siamese embedding alone.
///
/// Location plays no part in matching, so an identity can jump anywhere in the frame. Identities
/// are numbered `"0"`, `"1"`, ... as new embeddings show up; detections without an embedding
/// cannot be matched and are dropped.
#[derive(Debug, Clone)]
pub struct SimpleSiameseTracker {
    association: Association,
    next_id: usize,
}

impl Default for SimpleSiameseTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl SimpleSiameseTracker {
    /// Returns a new SimpleSiameseTracker
    pub fn new() -> SimpleSiameseTracker {
        SimpleSiameseTracker {
            association: Association::default(),
            next_id: 0,
        }
    }

    fn next_id(&mut self) -> ObjectId {
        loop {
            let id = self.next_id.to_string();
            self.next_id += 1;
            if !self.association.contains(&id) {
                return id;
            }
        }
    }
}

impl Tracker for SimpleSiameseTracker {
    fn name(&self) -> &'static str {
        "simple_siamese"
    }

    fn seed(&mut self, objects: Vec<(ObjectId, Detection)>) -> Result<()> {
        for (id, detection) in objects {
            self.association.spawn(id, detection)?;
        }
        self.association.fit()
    }

    fn update(&mut self, detections: Vec<Detection>) -> Result<TrackerOutput> {
        let unmatched = self
            .association
            .associate(detections, Strategy::AppearanceOnly)?;

        for detection in unmatched {
            if detection.feature().is_none() {
                debug!(
                    "frame {}: dropping detection without embedding",
                    self.association.frame()
                );
                continue;
            }
            let id = self.next_id();
            self.association.spawn(id, detection)?;
        }

        Ok(TrackerOutput {
            objects: self.association.finish()?,
            corrections: vec![],
        })
    }

    fn reset(&mut self) {
        self.association.reset();
        self.next_id = 0;
    }
}

#[cfg(test)]
mod tests {
    use crate::*;
    use anyhow::Result;

    fn detection(x: f32, feature: Option<[f32; 2]>) -> Detection {
        Detection::new(
            BoundingBox::new(x, 0.0, 30.0, 30.0),
            1.0,
            feature.map(|feature| feature.to_vec()),
        )
    }

    #[test]
    fn follows_appearance_across_the_frame() -> Result<()> {
        let mut tracker = SimpleSiameseTracker::new();

        let output = tracker.update(vec![
            detection(0.0, Some([1.0, 0.0])),
            detection(500.0, Some([0.0, 1.0])),
        ])?;
        assert_eq!(output.objects.len(), 2);
        assert_eq!(output.objects[0].id, "0");
        assert_eq!(output.objects[1].id, "1");

        // the two pigs swapped places, appearance wins over location
        let output = tracker.update(vec![
            detection(0.0, Some([0.0, 1.0])),
            detection(500.0, Some([1.0, 0.0])),
        ])?;
        assert_eq!(output.objects[0].id, "0");
        assert_eq!(output.objects[0].bbox.x(), 500.0);
        assert_eq!(output.objects[1].id, "1");
        assert_eq!(output.objects[1].bbox.x(), 0.0);

        Ok(())
    }

    #[test]
    fn drops_detections_without_embedding() -> Result<()> {
        let mut tracker = SimpleSiameseTracker::default();
        let output = tracker.update(vec![detection(0.0, None)])?;
        assert!(output.objects.is_empty());
        assert_eq!(tracker.name(), "simple_siamese");
        Ok(())
    }
}
