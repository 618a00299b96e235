use crate::BoundingBox;
use ndarray::*;

/// Detection represents a bounding box detection in a single frame.
#[derive(Debug, Clone)]
pub struct Detection {
    /// Bounding box in left, top, width, height format.
    bbox: BoundingBox,
    /// Detection confidence score.
    confidence: f32,
    /// An appearance embedding that describes the object contained in the bounding box.
    feature: Option<Array1<f32>>,
}

impl Detection {
    /// Returns a new Detection
    ///
    /// # Parameters
    ///
    /// * `bbox`: A bounding box object.
    /// * `confidence`: Detection confidence score.
    /// * `feature`: An appearance embedding, usually produced by the siamese model.
    pub fn new(bbox: BoundingBox, confidence: f32, feature: Option<Vec<f32>>) -> Detection {
        Detection {
            bbox,
            confidence,
            feature: feature.map(Array1::from_vec),
        }
    }

    /// Returns the detection with its appearance embedding replaced
    pub fn with_feature(mut self, feature: Vec<f32>) -> Detection {
        self.feature = Some(Array1::from_vec(feature));
        self
    }

    /// Returns a BoundingBox of the detection co-ordinates
    pub fn bbox(&self) -> &BoundingBox {
        &self.bbox
    }

    /// Returns the confidence of the detection
    pub fn confidence(&self) -> f32 {
        self.confidence
    }

    /// Returns the feature array of the detection
    pub fn feature(&self) -> &Option<Array1<f32>> {
        &self.feature
    }
}
