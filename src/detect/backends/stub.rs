use anyhow::{anyhow, bail, Result};

use crate::detect::backend::DetectionModel;
use crate::detect::labels::ClassNames;
use crate::detect::result::{BoundingBox, BoxPrediction};
use crate::frame::Frame;

/// Scripted model for tests and dry runs. Returns the same predictions for
/// every frame.
pub struct StubModel {
    name: String,
    class_names: ClassNames,
    predictions: Vec<BoxPrediction>,
}

impl StubModel {
    pub fn new(
        name: impl Into<String>,
        class_names: ClassNames,
        predictions: Vec<BoxPrediction>,
    ) -> Self {
        Self {
            name: name.into(),
            class_names,
            predictions,
        }
    }

    /// Parse a `stub://` model spec.
    ///
    /// `stub://` detects nothing; `stub://knife=0.9,gun=0.2` reports one
    /// full-frame box per entry, with class names taken from the entries in
    /// order.
    pub fn from_spec(name: impl Into<String>, spec: &str) -> Result<Self> {
        let mut labels = Vec::new();
        let mut scripted = Vec::new();
        for entry in spec.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let (label, confidence) = entry
                .split_once('=')
                .ok_or_else(|| anyhow!("expected label=confidence, got '{}'", entry))?;
            let label = label.trim();
            if label.is_empty() {
                bail!("stub model entry '{}' has an empty label", entry);
            }
            let confidence: f32 = confidence
                .trim()
                .parse()
                .map_err(|_| anyhow!("confidence for '{}' is not a number", label))?;
            if !(0.0..=1.0).contains(&confidence) {
                bail!("confidence for '{}' must be within [0, 1]", label);
            }
            let class_id = match labels.iter().position(|l: &String| l == label) {
                Some(idx) => idx,
                None => {
                    labels.push(label.to_string());
                    labels.len() - 1
                }
            };
            scripted.push((class_id, confidence));
        }

        let predictions = scripted
            .into_iter()
            .map(|(class_id, confidence)| BoxPrediction {
                class_id,
                confidence,
                bbox: BoundingBox::new(0.0, 0.0, 1.0, 1.0),
            })
            .collect();
        Ok(Self::new(name, ClassNames::from_labels(labels), predictions))
    }
}

impl DetectionModel for StubModel {
    fn name(&self) -> &str {
        &self.name
    }

    fn class_names(&self) -> &ClassNames {
        &self.class_names
    }

    fn infer(&mut self, frame: &Frame) -> Result<Vec<BoxPrediction>> {
        let full = BoundingBox::new(0.0, 0.0, frame.width as f32, frame.height as f32);
        Ok(self
            .predictions
            .iter()
            .cloned()
            .map(|p| BoxPrediction { bbox: full, ..p })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_spec_detects_nothing() -> Result<()> {
        let mut model = StubModel::from_spec("general", "")?;
        let frame = Frame::from_rgb(vec![0u8; 12], 2, 2, 0)?;
        assert!(model.infer(&frame)?.is_empty());
        assert!(model.class_names().is_empty());
        Ok(())
    }

    #[test]
    fn spec_entries_become_full_frame_boxes() -> Result<()> {
        let mut model = StubModel::from_spec("weapons", "knife=0.9, gun=0.2, knife=0.4")?;
        let frame = Frame::from_rgb(vec![0u8; 24], 4, 2, 1)?;
        let predictions = model.infer(&frame)?;

        assert_eq!(predictions.len(), 3);
        assert_eq!(model.class_names().name_for(0), "knife");
        assert_eq!(model.class_names().name_for(1), "gun");
        assert_eq!(predictions[2].class_id, 0);
        assert_eq!(predictions[0].bbox, BoundingBox::new(0.0, 0.0, 4.0, 2.0));
        Ok(())
    }

    #[test]
    fn malformed_specs_are_rejected() {
        assert!(StubModel::from_spec("m", "knife").is_err());
        assert!(StubModel::from_spec("m", "knife=high").is_err());
        assert!(StubModel::from_spec("m", "knife=1.5").is_err());
        assert!(StubModel::from_spec("m", "=0.5").is_err());
    }
}
