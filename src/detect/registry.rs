use std::collections::BTreeMap;

use anyhow::{anyhow, Result};

use crate::config::ModelSettings;

use super::backend::DetectionModel;
use super::backends::load_model;

/// Keyed set of loaded models for one screening run.
///
/// Detection passes refer to models by key (e.g. `weapons`, `general`), so a
/// model shared by several passes is loaded once.
pub struct ModelRegistry {
    models: BTreeMap<String, Box<dyn DetectionModel>>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self {
            models: BTreeMap::new(),
        }
    }

    /// Load every configured model. Any load failure aborts.
    pub fn load(settings: &BTreeMap<String, ModelSettings>) -> Result<Self> {
        let mut registry = Self::new();
        for (key, model) in settings {
            registry.register(key, load_model(key, model)?);
        }
        Ok(registry)
    }

    /// Register a model under `key`, replacing any previous entry.
    pub fn register(&mut self, key: impl Into<String>, model: Box<dyn DetectionModel>) {
        let key = key.into();
        if self.models.insert(key.clone(), model).is_some() {
            log::warn!("model '{}' replaced in registry", key);
        }
    }

    pub fn get_mut(&mut self, key: &str) -> Result<&mut dyn DetectionModel> {
        match self.models.get_mut(key) {
            Some(model) => Ok(model.as_mut()),
            None => Err(anyhow!("model '{}' not registered", key)),
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.models.contains_key(key)
    }

    /// List registered model keys.
    pub fn keys(&self) -> Vec<String> {
        self.models.keys().cloned().collect()
    }
}

impl Default for ModelRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::backends::StubModel;
    use crate::detect::labels::ClassNames;

    #[test]
    fn loads_stub_models_by_key() -> Result<()> {
        let mut settings = BTreeMap::new();
        settings.insert("weapons".to_string(), ModelSettings::new("stub://knife=0.9"));
        settings.insert("general".to_string(), ModelSettings::new("stub://"));

        let mut registry = ModelRegistry::load(&settings)?;
        assert_eq!(registry.keys(), vec!["general", "weapons"]);
        assert_eq!(registry.get_mut("weapons")?.class_names().name_for(0), "knife");
        assert!(registry.get_mut("explosives").is_err());
        Ok(())
    }

    #[test]
    fn load_failures_propagate() {
        let mut settings = BTreeMap::new();
        settings.insert("weapons".to_string(), ModelSettings::new("stub://knife"));
        assert!(ModelRegistry::load(&settings).is_err());
    }

    #[test]
    fn register_replaces_existing_key() {
        let mut registry = ModelRegistry::new();
        registry.register(
            "general",
            Box::new(StubModel::new("a", ClassNames::default(), vec![])),
        );
        registry.register(
            "general",
            Box::new(StubModel::new("b", ClassNames::default(), vec![])),
        );
        assert!(registry.contains("general"));
        assert_eq!(registry.get_mut("general").unwrap().name(), "b");
    }
}
