//! YOLOv8-style pre- and post-processing shared by ONNX backends.
//!
//! Input: a square, letterboxed RGB image normalized to [0, 1].
//! Output: one `[4 + C, N]` tensor: per anchor `cx, cy, w, h` followed by C
//! class scores, in letterboxed pixel coordinates.

use anyhow::{anyhow, Result};

use crate::detect::result::{BoundingBox, BoxPrediction};

pub const DEFAULT_INPUT_SIZE: u32 = 640;
/// Boxes below this score are dropped before NMS, before any screening
/// threshold applies.
pub const PREFILTER_CONFIDENCE: f32 = 0.25;
pub const NMS_IOU_THRESHOLD: f32 = 0.7;
pub const LETTERBOX_FILL: u8 = 114;

/// Geometry of an aspect-preserving resize into a square model input.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Letterbox {
    pub scale: f32,
    pub resized_width: u32,
    pub resized_height: u32,
    pub pad_x: u32,
    pub pad_y: u32,
    frame_width: u32,
    frame_height: u32,
}

impl Letterbox {
    pub fn fit(frame_width: u32, frame_height: u32, input_size: u32) -> Result<Self> {
        if frame_width == 0 || frame_height == 0 || input_size == 0 {
            return Err(anyhow!(
                "cannot letterbox {}x{} into {}",
                frame_width,
                frame_height,
                input_size
            ));
        }
        let scale = (input_size as f32 / frame_width as f32)
            .min(input_size as f32 / frame_height as f32);
        let resized_width = ((frame_width as f32 * scale).round() as u32).clamp(1, input_size);
        let resized_height = ((frame_height as f32 * scale).round() as u32).clamp(1, input_size);
        Ok(Self {
            scale,
            resized_width,
            resized_height,
            pad_x: (input_size - resized_width) / 2,
            pad_y: (input_size - resized_height) / 2,
            frame_width,
            frame_height,
        })
    }

    /// Map a box from model input space back to frame pixels, clamped.
    pub fn to_frame(&self, bbox: BoundingBox) -> BoundingBox {
        let max_x = self.frame_width as f32;
        let max_y = self.frame_height as f32;
        let unmap_x = |x: f32| ((x - self.pad_x as f32) / self.scale).clamp(0.0, max_x);
        let unmap_y = |y: f32| ((y - self.pad_y as f32) / self.scale).clamp(0.0, max_y);
        BoundingBox::new(
            unmap_x(bbox.x1),
            unmap_y(bbox.y1),
            unmap_x(bbox.x2),
            unmap_y(bbox.y2),
        )
    }
}

/// Decode a row-major `[channels, anchors]` output into boxes scoring at
/// least `floor`. Each anchor keeps only its best class.
pub fn decode_output(
    data: &[f32],
    channels: usize,
    anchors: usize,
    floor: f32,
) -> Result<Vec<BoxPrediction>> {
    if channels <= 4 {
        return Err(anyhow!(
            "detection output has {} channels, expected 4 box values plus classes",
            channels
        ));
    }
    let expected = channels
        .checked_mul(anchors)
        .ok_or_else(|| anyhow!("detection output dimensions overflow"))?;
    if data.len() != expected {
        return Err(anyhow!(
            "detection output length mismatch: expected {}, got {}",
            expected,
            data.len()
        ));
    }

    let at = |channel: usize, anchor: usize| data[channel * anchors + anchor];
    let mut predictions = Vec::new();
    for anchor in 0..anchors {
        let (class_id, confidence) = (4..channels)
            .map(|c| (c - 4, at(c, anchor)))
            .fold((0, f32::NEG_INFINITY), |best, cur| {
                if cur.1 > best.1 {
                    cur
                } else {
                    best
                }
            });
        if confidence.is_nan() || confidence < floor {
            continue;
        }
        predictions.push(BoxPrediction {
            class_id,
            confidence,
            bbox: BoundingBox::from_center(
                at(0, anchor),
                at(1, anchor),
                at(2, anchor),
                at(3, anchor),
            ),
        });
    }
    Ok(predictions)
}

/// Class-aware non-maximum suppression. Output is sorted by descending
/// confidence.
pub fn non_maximum_suppression(
    mut predictions: Vec<BoxPrediction>,
    iou_threshold: f32,
) -> Vec<BoxPrediction> {
    predictions.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    let mut kept: Vec<BoxPrediction> = Vec::with_capacity(predictions.len());
    for candidate in predictions {
        let suppressed = kept.iter().any(|k| {
            k.class_id == candidate.class_id && k.bbox.iou(&candidate.bbox) > iou_threshold
        });
        if !suppressed {
            kept.push(candidate);
        }
    }
    kept
}
