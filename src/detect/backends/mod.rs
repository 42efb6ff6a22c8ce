pub mod stub;

#[cfg(feature = "backend-tract")]
pub mod tract;

pub use stub::StubModel;

#[cfg(feature = "backend-tract")]
pub use tract::TractModel;

use anyhow::Result;

use crate::config::ModelSettings;
use crate::detect::backend::DetectionModel;

const STUB_SCHEME: &str = "stub://";

/// Load the backend a model path selects.
///
/// `stub://...` specs build a [`StubModel`]; anything else is an ONNX file
/// and needs the `backend-tract` feature.
pub fn load_model(key: &str, settings: &ModelSettings) -> Result<Box<dyn DetectionModel>> {
    if let Some(spec) = settings.path.strip_prefix(STUB_SCHEME) {
        log::debug!("model '{}': scripted stub '{}'", key, spec);
        return Ok(Box::new(StubModel::from_spec(key, spec)?));
    }

    #[cfg(feature = "backend-tract")]
    {
        let model = TractModel::load(key, settings)?;
        log::info!(
            "model '{}': loaded {} ({} classes, input {})",
            key,
            settings.path,
            model.class_names().len(),
            settings.input_size
        );
        Ok(Box::new(model))
    }
    #[cfg(not(feature = "backend-tract"))]
    {
        anyhow::bail!(
            "model '{}' ({}) requires the backend-tract feature",
            key,
            settings.path
        )
    }
}
