use crate::{
    config::{DetectorConfig, SiameseConfig},
    utils::frame_processing,
};
use anyhow::{anyhow, bail, Context, Result};
use image::RgbImage;
use log::{debug, info};
use once_cell::unsync::OnceCell;
use pigtrack::{BoundingBox, Detection, DetectionModel, SiameseModel};
use std::path::Path;
use tract_onnx::prelude::*;

type OnnxPlan = TypedRunnableModel<TypedModel>;

fn load(weights: &Path) -> Result<OnnxPlan> {
    info!("loading {}", weights.display());
    tract_onnx::onnx()
        .model_for_path(weights)
        .with_context(|| format!("cannot load {}", weights.display()))?
        .with_output_fact(0, Default::default())?
        .into_optimized()?
        .into_runnable()
}

fn scalar<T: Datum + Copy>(value: T) -> Tensor {
    tract_ndarray::Array1::from_elem(1, value).into()
}

/// A detector exported with its non-maximum suppression, taking the letterboxed frame, the
/// maximum number of boxes per class, the IoU threshold and the score threshold as inputs.
///
/// Each output row is `[batch, x0, y0, x1, y1, class, confidence]` in letterboxed coordinates.
/// The weights are loaded on the first frame.
pub struct OnnxDetector {
    config: DetectorConfig,
    plan: OnceCell<OnnxPlan>,
}

impl OnnxDetector {
    pub fn new(config: DetectorConfig) -> OnnxDetector {
        OnnxDetector {
            config,
            plan: OnceCell::new(),
        }
    }

    fn plan(&self) -> Result<&OnnxPlan> {
        self.plan.get_or_try_init(|| load(&self.config.weights))
    }
}

impl DetectionModel for OnnxDetector {
    fn detect(&self, frame: &RgbImage) -> Result<Vec<Detection>> {
        let config = &self.config;
        let (boxed, letterbox) =
            frame_processing::letterbox(frame, config.input_width, config.input_height);

        let frame_tensor: Tensor = tract_ndarray::Array4::from_shape_fn(
            (1, 3, config.input_height as usize, config.input_width as usize),
            |(_, c, y, x)| boxed[(x as _, y as _)][c] as f32,
        )
        .into();

        let outputs = self.plan()?.run(tvec!(
            frame_tensor.into(),
            scalar(config.max_output_boxes_per_class).into(),
            scalar(config.iou_threshold).into(),
            scalar(config.score_threshold).into()
        ))?;
        let outputs = outputs
            .first()
            .ok_or_else(|| anyhow!("detector returned no output"))?
            .to_array_view::<f32>()?;

        let width = frame.width() as f32;
        let height = frame.height() as f32;
        let detections = outputs
            .outer_iter()
            .filter(|row| row.len() >= 7 && row[5] as usize == config.class_index)
            .filter_map(|row| {
                let (x0, y0) = letterbox.to_source(row[1], row[2]);
                let (x1, y1) = letterbox.to_source(row[3], row[4]);
                let bbox = BoundingBox::from_tlbr(
                    x0.clamp(0.0, width),
                    y0.clamp(0.0, height),
                    x1.clamp(0.0, width),
                    y1.clamp(0.0, height),
                );
                (bbox.area() > 0.0).then(|| Detection::new(bbox, row[6], None))
            })
            .collect::<Vec<_>>();
        debug!("detected {} pigs", detections.len());

        Ok(detections)
    }
}

/// The siamese embedding network, fed the crop of one pig resized to the network input.
pub struct OnnxSiamese {
    config: SiameseConfig,
    plan: OnnxPlan,
}

impl OnnxSiamese {
    pub fn new(config: SiameseConfig) -> Result<OnnxSiamese> {
        let plan = load(&config.weights)?;
        Ok(OnnxSiamese { config, plan })
    }
}

impl SiameseModel for OnnxSiamese {
    fn embed(&self, frame: &RgbImage, bbox: &BoundingBox) -> Result<Vec<f32>> {
        let (width, height) = (self.config.input_width, self.config.input_height);
        let Some(crop) = frame_processing::crop_resized(
            frame,
            (bbox.x(), bbox.y(), bbox.width(), bbox.height()),
            width,
            height,
        ) else {
            bail!("box {bbox:?} lies outside of the frame");
        };

        // channels last, scaled to [0, 1]
        let crop_tensor: Tensor = tract_ndarray::Array4::from_shape_fn(
            (1, height as usize, width as usize, 3),
            |(_, y, x, c)| crop[(x as _, y as _)][c] as f32 / 255.0,
        )
        .into();

        let outputs = self.plan.run(tvec!(crop_tensor.into()))?;
        let embedding = outputs
            .first()
            .ok_or_else(|| anyhow!("siamese model returned no output"))?
            .to_array_view::<f32>()?
            .iter()
            .copied()
            .collect();

        Ok(embedding)
    }
}
