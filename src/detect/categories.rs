//! Category detector: one inference pass filtered to a label set.

use anyhow::{Context, Result};
use std::collections::BTreeSet;

use crate::detect::backend::DetectionModel;
use crate::detect::result::Detection;
use crate::frame::Frame;

/// Minimum confidence, exclusive, for a detection to count.
pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.35;

/// Run `model` once over `frame` and return the accepted labels it saw.
///
/// A box counts only when its confidence is strictly greater than
/// `threshold` and its resolved label is in `accepted`. Duplicates collapse.
pub fn detect_categories(
    frame: &Frame,
    model: &mut dyn DetectionModel,
    accepted: &BTreeSet<String>,
    threshold: f32,
) -> Result<BTreeSet<String>> {
    let predictions = model
        .infer(frame)
        .with_context(|| format!("inference failed for model '{}'", model.name()))?;

    let names = model.class_names();
    let found = predictions
        .iter()
        .map(|p| Detection {
            label: names.name_for(p.class_id).to_string(),
            confidence: p.confidence,
        })
        .filter(|d| d.confidence > threshold && accepted.contains(&d.label))
        .map(|d| d.label)
        .collect::<BTreeSet<_>>();

    log::debug!(
        "model '{}': {} boxes, {} accepted labels",
        model.name(),
        predictions.len(),
        found.len()
    );
    Ok(found)
}
