use anyhow::Result;

use crate::detect::labels::ClassNames;
use crate::detect::result::BoxPrediction;
use crate::frame::Frame;

/// Loaded object-detection model.
///
/// # Contract
///
/// Implementations:
/// - Treat the frame as read-only and do not retain it past `infer`
/// - Report every box the model keeps after its own post-processing; the
///   caller applies the screening threshold
/// - Report class indices, not labels; labels come from `class_names`
pub trait DetectionModel: Send {
    /// Model identifier for logs.
    fn name(&self) -> &str;

    /// The model's class index -> label table.
    fn class_names(&self) -> &ClassNames;

    /// Run one inference pass over a frame.
    fn infer(&mut self, frame: &Frame) -> Result<Vec<BoxPrediction>>;
}
