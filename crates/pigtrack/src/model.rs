use crate::*;
use anyhow::Result;
use image::RgbImage;
use log::debug;

/// Finds pigs in a frame.
pub trait DetectionModel {
    fn detect(&self, frame: &RgbImage) -> Result<Vec<Detection>>;
}

/// Computes the re-identification embedding of the pig inside a bounding box.
pub trait SiameseModel {
    fn embed(&self, frame: &RgbImage, bbox: &BoundingBox) -> Result<Vec<f32>>;

    /// Attach an embedding to every detection.
    fn embed_all(&self, frame: &RgbImage, detections: Vec<Detection>) -> Result<Vec<Detection>> {
        detections
            .into_iter()
            .map(|detection| {
                let feature = self.embed(frame, detection.bbox())?;
                Ok(detection.with_feature(feature))
            })
            .collect()
    }
}

/// Detector, re-identifier and tracker composed into a single per-frame entry point.
pub struct Model {
    detector: Box<dyn DetectionModel>,
    siamese: Box<dyn SiameseModel>,
    tracker: Box<dyn Tracker>,
}

impl Model {
    /// Returns a new Model
    ///
    /// # Parameters
    ///
    /// * `detector`: Produces the detections of a frame.
    /// * `siamese`: Produces the embedding of each detection.
    /// * `tracker`: Assigns persistent identities to the embedded detections.
    pub fn new(
        detector: Box<dyn DetectionModel>,
        siamese: Box<dyn SiameseModel>,
        tracker: Box<dyn Tracker>,
    ) -> Model {
        Model {
            detector,
            siamese,
            tracker,
        }
    }

    /// Return the name of the tracking strategy
    pub fn tracker_name(&self) -> &'static str {
        self.tracker.name()
    }

    /// Pre-assign identities to known boxes on `frame`.
    pub fn seed(&mut self, frame: &RgbImage, objects: Vec<(ObjectId, BoundingBox)>) -> Result<()> {
        let objects = objects
            .into_iter()
            .map(|(id, bbox)| {
                let feature = self.siamese.embed(frame, &bbox)?;
                Ok((id, Detection::new(bbox, 1.0, Some(feature))))
            })
            .collect::<Result<Vec<_>>>()?;
        debug!("{}: seeding {} identities", self.tracker.name(), objects.len());
        self.tracker.seed(objects)
    }

    /// Detect, embed and track the pigs on the next frame.
    pub fn track(&mut self, frame: &RgbImage) -> Result<TrackerOutput> {
        let detections = self.detector.detect(frame)?;
        self.track_detections(frame, detections)
    }

    /// Embed and track externally supplied detections for the next frame.
    pub fn track_detections(
        &mut self,
        frame: &RgbImage,
        detections: Vec<Detection>,
    ) -> Result<TrackerOutput> {
        let detections = self.siamese.embed_all(frame, detections)?;
        self.tracker.update(detections)
    }

    /// Forget every identity before the next video.
    pub fn reset(&mut self) {
        self.tracker.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::bail;
    use image::Rgb;

    /// Detects every pure red pixel block as a 10x10 pig.
    struct RedDetector;

    impl DetectionModel for RedDetector {
        fn detect(&self, frame: &RgbImage) -> Result<Vec<Detection>> {
            Ok(frame
                .enumerate_pixels()
                .filter(|(x, y, pixel)| **pixel == Rgb([255, 0, 0]) && x % 10 == 0 && y % 10 == 0)
                .map(|(x, y, _)| {
                    Detection::new(BoundingBox::new(x as f32, y as f32, 10.0, 10.0), 0.8, None)
                })
                .collect())
        }
    }

    /// Uses the mean colour of the box as the embedding.
    struct ColourSiamese;

    impl SiameseModel for ColourSiamese {
        fn embed(&self, frame: &RgbImage, bbox: &BoundingBox) -> Result<Vec<f32>> {
            if bbox.x() < 0.0 || bbox.y() < 0.0 {
                bail!("box outside of frame");
            }
            let pixel = frame.get_pixel(bbox.x() as u32 + 1, bbox.y() as u32 + 1);
            Ok(pixel.0.iter().map(|channel| *channel as f32 + 1.0).collect())
        }
    }

    fn frame_with_pig_at(x: u32, y: u32) -> RgbImage {
        let mut frame = RgbImage::new(60, 60);
        for dx in 0..10 {
            for dy in 0..10 {
                frame.put_pixel(x + dx, y + dy, Rgb([255, 0, 0]));
            }
        }
        frame
    }

    #[test]
    fn tracks_detected_pigs() -> Result<()> {
        let mut model = Model::new(
            Box::new(RedDetector),
            Box::new(ColourSiamese),
            Box::new(DefaultTracker::new(["pig1"])),
        );
        assert_eq!(model.tracker_name(), "default");

        let output = model.track(&frame_with_pig_at(20, 20))?;
        assert_eq!(output.objects.len(), 1);
        assert_eq!(output.objects[0].id, "pig1");
        assert_eq!(output.objects[0].bbox, BoundingBox::new(20.0, 20.0, 10.0, 10.0));

        Ok(())
    }

    #[test]
    fn seeded_identity_is_kept() -> Result<()> {
        let mut model = Model::new(
            Box::new(RedDetector),
            Box::new(ColourSiamese),
            Box::new(DefaultTracker::new(["pig1", "pig2"])),
        );
        let frame = frame_with_pig_at(20, 20);
        model.seed(&frame, vec![("pig2".to_string(), BoundingBox::new(20.0, 20.0, 10.0, 10.0))])?;

        let output = model.track_detections(
            &frame,
            vec![Detection::new(BoundingBox::new(20.0, 20.0, 10.0, 10.0), 1.0, None)],
        )?;
        assert_eq!(output.objects[0].id, "pig2");

        model.reset();
        let output = model.track(&frame)?;
        assert_eq!(output.objects[0].id, "pig1");

        Ok(())
    }

    #[test]
    fn embedding_errors_propagate() {
        let mut model = Model::new(
            Box::new(RedDetector),
            Box::new(ColourSiamese),
            Box::new(SimpleSiameseTracker::new()),
        );
        let result = model.track_detections(
            &RgbImage::new(10, 10),
            vec![Detection::new(BoundingBox::new(-5.0, 0.0, 10.0, 10.0), 1.0, None)],
        );
        assert!(result.is_err());
    }
}
