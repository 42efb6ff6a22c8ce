#![cfg(feature = "backend-tract")]

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use image::{imageops, Rgb, RgbImage};
use tract_onnx::pb::ModelProto;
use tract_onnx::prelude::*;

use crate::config::ModelSettings;
use crate::detect::backend::DetectionModel;
use crate::detect::labels::ClassNames;
use crate::detect::result::BoxPrediction;
use crate::detect::yolo::{
    decode_output, non_maximum_suppression, Letterbox, LETTERBOX_FILL, NMS_IOU_THRESHOLD,
    PREFILTER_CONFIDENCE,
};
use crate::frame::Frame;

/// Tract-based YOLO detector for ONNX exports.
///
/// Loads a local model file and runs it on letterboxed RGB frames. No network
/// I/O, nothing written to disk.
pub struct TractModel {
    name: String,
    model: SimplePlan<TypedFact, Box<dyn TypedOp>>,
    input_size: u32,
    class_names: ClassNames,
    prefilter: f32,
    iou_threshold: f32,
}

impl TractModel {
    /// Load an ONNX model from disk and prepare it for square input.
    ///
    /// The file is parsed once; its `names` metadata and the graph come from
    /// the same bytes.
    pub fn load(key: &str, settings: &ModelSettings) -> Result<Self> {
        let model_path = Path::new(&settings.path);
        let onnx = tract_onnx::onnx();
        let proto = onnx
            .proto_model_for_path(model_path)
            .with_context(|| format!("failed to read ONNX model {}", model_path.display()))?;
        let class_names =
            settings.resolve_class_names(key, |_: &Path| embedded_class_names(&proto))?;

        let input_size = settings.input_size;
        let size = input_size as usize;
        let model = onnx
            .model_for_proto_model(&proto)
            .with_context(|| format!("failed to load ONNX model from {}", model_path.display()))?
            .with_input_fact(
                0,
                InferenceFact::dt_shape(f32::datum_type(), tvec!(1, 3, size, size)),
            )
            .context("failed to set input fact")?
            .into_optimized()
            .context("failed to optimize ONNX model")?
            .into_runnable()
            .context("failed to build runnable ONNX model")?;

        Ok(Self {
            name: key.to_string(),
            model,
            input_size,
            class_names,
            prefilter: PREFILTER_CONFIDENCE,
            iou_threshold: NMS_IOU_THRESHOLD,
        })
    }

    fn build_input(&self, frame: &Frame, letterbox: &Letterbox) -> Result<Tensor> {
        let source = RgbImage::from_raw(frame.width, frame.height, frame.pixels().to_vec())
            .ok_or_else(|| anyhow!("frame buffer does not match its dimensions"))?;
        let resized = imageops::resize(
            &source,
            letterbox.resized_width,
            letterbox.resized_height,
            imageops::FilterType::Triangle,
        );
        let mut canvas = RgbImage::from_pixel(
            self.input_size,
            self.input_size,
            Rgb([LETTERBOX_FILL; 3]),
        );
        imageops::overlay(
            &mut canvas,
            &resized,
            letterbox.pad_x as i64,
            letterbox.pad_y as i64,
        );

        let size = self.input_size as usize;
        let input = tract_ndarray::Array4::from_shape_fn((1, 3, size, size), |(_, c, y, x)| {
            canvas.get_pixel(x as u32, y as u32)[c] as f32 / 255.0
        });
        Ok(input.into_tensor())
    }

    fn decode(&self, outputs: TVec<TValue>, letterbox: &Letterbox) -> Result<Vec<BoxPrediction>> {
        let output = outputs
            .first()
            .ok_or_else(|| anyhow!("model produced no outputs"))?;
        let view = output
            .to_array_view::<f32>()
            .context("model output tensor was not f32")?;
        let (channels, anchors) = match view.shape() {
            [1, channels, anchors] => (*channels, *anchors),
            other => return Err(anyhow!("unexpected detection output shape {:?}", other)),
        };
        let data: Vec<f32> = view.iter().copied().collect();
        let predictions = decode_output(&data, channels, anchors, self.prefilter)?;
        Ok(non_maximum_suppression(predictions, self.iou_threshold)
            .into_iter()
            .map(|p| BoxPrediction {
                bbox: letterbox.to_frame(p.bbox),
                ..p
            })
            .collect())
    }
}

/// Label table Ultralytics stores in the export's `names` metadata entry.
fn embedded_class_names(proto: &ModelProto) -> Result<Option<ClassNames>> {
    proto
        .metadata_props
        .iter()
        .find(|entry| entry.key == "names")
        .map(|entry| ClassNames::from_model_metadata(&entry.value))
        .transpose()
        .context("invalid names metadata in ONNX model")
}

impl DetectionModel for TractModel {
    fn name(&self) -> &str {
        &self.name
    }

    fn class_names(&self) -> &ClassNames {
        &self.class_names
    }

    fn infer(&mut self, frame: &Frame) -> Result<Vec<BoxPrediction>> {
        let letterbox = Letterbox::fit(frame.width, frame.height, self.input_size)?;
        let input = self.build_input(frame, &letterbox)?;
        let outputs = self
            .model
            .run(tvec!(input.into_tvalue()))
            .context("ONNX inference failed")?;
        self.decode(outputs, &letterbox)
    }
}
