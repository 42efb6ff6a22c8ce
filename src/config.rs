use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::catalog::{Category, ProhibitedCatalog};
use crate::detect::yolo::DEFAULT_INPUT_SIZE;
use crate::detect::{ClassNames, DEFAULT_CONFIDENCE_THRESHOLD};
use crate::screen::{default_passes, DetectionPass};

/// Registry key of the weapons-specialized model.
pub const WEAPONS_MODEL: &str = "weapons";
/// Registry key of the general-purpose model.
pub const GENERAL_MODEL: &str = "general";

const DEFAULT_VIDEO_PATH: &str = "3.mp4";
const DEFAULT_WEAPONS_MODEL_PATH: &str = "runs/detect/Normal_Compressed/weights/best.onnx";
const DEFAULT_GENERAL_MODEL_PATH: &str = "yolov8n.onnx";

#[derive(Debug, Deserialize, Default)]
struct ScreenConfigFile {
    video_path: Option<String>,
    confidence_threshold: Option<f32>,
    models: Option<BTreeMap<String, ModelConfigFile>>,
    catalog: Option<BTreeMap<Category, Vec<String>>>,
    passes: Option<Vec<DetectionPass>>,
}

#[derive(Debug, Deserialize, Default)]
struct ModelConfigFile {
    path: Option<String>,
    names_path: Option<PathBuf>,
    input_size: Option<u32>,
    coco_labels: Option<bool>,
}

#[derive(Debug, Clone)]
pub struct ScreenConfig {
    pub video_path: String,
    pub confidence_threshold: f32,
    pub models: BTreeMap<String, ModelSettings>,
    pub catalog: ProhibitedCatalog,
    pub passes: Vec<DetectionPass>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSettings {
    /// ONNX file path, or a `stub://` spec.
    pub path: String,
    /// Class names file. Overrides the labels embedded in the model.
    pub names_path: Option<PathBuf>,
    pub input_size: u32,
    /// Fall back to the COCO table when the model carries no labels.
    pub coco_labels: bool,
}

impl ModelSettings {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            names_path: None,
            input_size: DEFAULT_INPUT_SIZE,
            coco_labels: false,
        }
    }

    /// Class table for this model.
    ///
    /// Order: the configured names file, the table `embedded` reads from the
    /// model file, a `.names` file next to the model, then COCO if
    /// `coco_labels` allows it. A model with none of these is an error.
    pub fn resolve_class_names<F>(&self, key: &str, embedded: F) -> Result<ClassNames>
    where
        F: FnOnce(&Path) -> Result<Option<ClassNames>>,
    {
        if let Some(path) = &self.names_path {
            return ClassNames::load(path);
        }
        let model_path = Path::new(&self.path);
        if let Some(names) = embedded(model_path)? {
            log::debug!("model '{}': {} classes from model metadata", key, names.len());
            return Ok(names);
        }
        let sibling = model_path.with_extension("names");
        if sibling.is_file() {
            return ClassNames::load(&sibling);
        }
        if self.coco_labels {
            log::warn!("model '{}': no class labels found, using the COCO table", key);
            return Ok(ClassNames::coco());
        }
        Err(anyhow!(
            "model '{}' ({}) has no class labels: no names metadata, no {} and no names_path",
            key,
            self.path,
            sibling.display()
        ))
    }
}

impl ScreenConfig {
    /// Load from `KEYFRAME_SCREEN_CONFIG` (if set) plus environment overrides.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("KEYFRAME_SCREEN_CONFIG").ok();
        Self::load_from(config_path.as_deref().map(Path::new))
    }

    /// Load from an explicit config file (if any) plus environment overrides.
    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let file_cfg = match path {
            Some(path) => Some(read_config_file(path)?),
            None => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default())?;
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: ScreenConfigFile) -> Result<Self> {
        let video_path = file
            .video_path
            .unwrap_or_else(|| DEFAULT_VIDEO_PATH.to_string());
        let confidence_threshold = file
            .confidence_threshold
            .unwrap_or(DEFAULT_CONFIDENCE_THRESHOLD);

        let mut models = default_models();
        for (key, entry) in file.models.unwrap_or_default() {
            let settings = match models.remove(&key) {
                Some(mut existing) => {
                    if let Some(path) = entry.path {
                        existing.path = path;
                    }
                    existing
                }
                None => ModelSettings::new(entry.path.ok_or_else(|| {
                    anyhow!("model '{}' in config file needs a path", key)
                })?),
            };
            let settings = ModelSettings {
                names_path: entry.names_path.or(settings.names_path),
                input_size: entry.input_size.unwrap_or(settings.input_size),
                coco_labels: entry.coco_labels.unwrap_or(settings.coco_labels),
                ..settings
            };
            models.insert(key, settings);
        }

        let catalog = match file.catalog {
            Some(map) => ProhibitedCatalog::from_map(map)?,
            None => ProhibitedCatalog::default(),
        };
        let passes = file.passes.unwrap_or_else(default_passes);

        Ok(Self {
            video_path,
            confidence_threshold,
            models,
            catalog,
            passes,
        })
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(path) = std::env::var("KEYFRAME_SCREEN_VIDEO") {
            if !path.trim().is_empty() {
                self.video_path = path;
            }
        }
        if let Ok(threshold) = std::env::var("KEYFRAME_SCREEN_THRESHOLD") {
            self.confidence_threshold = threshold.trim().parse().map_err(|_| {
                anyhow!("KEYFRAME_SCREEN_THRESHOLD must be a number between 0 and 1")
            })?;
        }
        if let Ok(path) = std::env::var("KEYFRAME_SCREEN_WEAPONS_MODEL") {
            if !path.trim().is_empty() {
                self.set_model_path(WEAPONS_MODEL, path);
            }
        }
        if let Ok(path) = std::env::var("KEYFRAME_SCREEN_GENERAL_MODEL") {
            if !path.trim().is_empty() {
                self.set_model_path(GENERAL_MODEL, path);
            }
        }
        Ok(())
    }

    /// Point `key` at a new model file, keeping its other settings.
    pub fn set_model_path(&mut self, key: &str, path: impl Into<String>) {
        let path = path.into();
        self.models
            .entry(key.to_string())
            .and_modify(|m| m.path = path.clone())
            .or_insert_with(|| ModelSettings::new(path));
    }

    pub fn validate(&self) -> Result<()> {
        if self.video_path.trim().is_empty() {
            return Err(anyhow!("video path must not be empty"));
        }
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err(anyhow!(
                "confidence threshold must be within [0, 1], got {}",
                self.confidence_threshold
            ));
        }
        for (key, model) in &self.models {
            if model.path.trim().is_empty() {
                return Err(anyhow!("model '{}' path must not be empty", key));
            }
            if model.input_size == 0 || model.input_size % 32 != 0 {
                return Err(anyhow!(
                    "model '{}' input size must be a positive multiple of 32",
                    key
                ));
            }
        }
        if self.passes.is_empty() {
            return Err(anyhow!("at least one detection pass is required"));
        }
        for pass in &self.passes {
            if !self.models.contains_key(&pass.model) {
                return Err(anyhow!(
                    "detection pass references unknown model '{}'",
                    pass.model
                ));
            }
            if self.catalog.labels(pass.category).is_none() {
                return Err(anyhow!(
                    "detection pass references category '{}' missing from the catalog",
                    pass.category
                ));
            }
        }
        Ok(())
    }
}

impl Default for ScreenConfig {
    fn default() -> Self {
        Self {
            video_path: DEFAULT_VIDEO_PATH.to_string(),
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            models: default_models(),
            catalog: ProhibitedCatalog::default(),
            passes: default_passes(),
        }
    }
}

fn default_models() -> BTreeMap<String, ModelSettings> {
    BTreeMap::from([
        (
            WEAPONS_MODEL.to_string(),
            ModelSettings::new(DEFAULT_WEAPONS_MODEL_PATH),
        ),
        (
            GENERAL_MODEL.to_string(),
            ModelSettings {
                coco_labels: true,
                ..ModelSettings::new(DEFAULT_GENERAL_MODEL_PATH)
            },
        ),
    ])
}

fn read_config_file(path: &Path) -> Result<ScreenConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let is_toml = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
    let cfg = if is_toml {
        toml::from_str(&raw).map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    } else {
        serde_json::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    };
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() -> Result<()> {
        let cfg = ScreenConfig::default();
        cfg.validate()?;
        assert_eq!(cfg.video_path, "3.mp4");
        assert_eq!(cfg.confidence_threshold, 0.35);
        assert_eq!(cfg.passes.len(), 4);
        assert_eq!(cfg.models[WEAPONS_MODEL].input_size, 640);
        Ok(())
    }

    #[test]
    fn file_models_merge_onto_defaults() -> Result<()> {
        let file: ScreenConfigFile = serde_json::from_str(
            r#"{
                "models": {
                    "general": { "input_size": 320 },
                    "nsfw": { "path": "nsfw.onnx", "names_path": "nsfw.names" }
                }
            }"#,
        )?;
        let cfg = ScreenConfig::from_file(file)?;
        assert_eq!(cfg.models[GENERAL_MODEL].path, DEFAULT_GENERAL_MODEL_PATH);
        assert_eq!(cfg.models[GENERAL_MODEL].input_size, 320);
        assert_eq!(
            cfg.models["nsfw"].names_path.as_deref(),
            Some(Path::new("nsfw.names"))
        );
        Ok(())
    }

    #[test]
    fn new_models_require_a_path() {
        let file: ScreenConfigFile =
            serde_json::from_str(r#"{ "models": { "nsfw": { "input_size": 320 } } }"#).unwrap();
        assert!(ScreenConfig::from_file(file).is_err());
    }

    #[test]
    fn validation_rejects_bad_values() {
        let mut cfg = ScreenConfig::default();
        cfg.confidence_threshold = 1.5;
        assert!(cfg.validate().is_err());

        let mut cfg = ScreenConfig::default();
        cfg.passes.push(DetectionPass {
            model: "nsfw".to_string(),
            category: Category::Explicit,
        });
        assert!(cfg.validate().is_err());

        let mut cfg = ScreenConfig::default();
        cfg.set_model_path(GENERAL_MODEL, "");
        assert!(cfg.validate().is_err());

        let mut cfg = ScreenConfig::default();
        cfg.models.get_mut(WEAPONS_MODEL).unwrap().input_size = 100;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn passes_must_reference_catalog_categories() -> Result<()> {
        let file: ScreenConfigFile = serde_json::from_str(
            r#"{ "catalog": { "weapons": ["axe"] } }"#,
        )?;
        let cfg = ScreenConfig::from_file(file)?;
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("violence"));
        Ok(())
    }

    fn no_embedded_names(_: &Path) -> Result<Option<ClassNames>> {
        Ok(None)
    }

    #[test]
    fn explicit_names_path_wins() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let names = dir.path().join("custom.names");
        std::fs::write(&names, "gun\n")?;
        let settings = ModelSettings {
            names_path: Some(names),
            ..ModelSettings::new(dir.path().join("best.onnx").display().to_string())
        };
        let embedded = |_: &Path| -> Result<Option<ClassNames>> {
            Ok(Some(ClassNames::from_labels(["knife"])))
        };
        assert_eq!(settings.resolve_class_names("weapons", embedded)?.name_for(0), "gun");
        Ok(())
    }

    #[test]
    fn embedded_names_beat_sibling_file() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let model = dir.path().join("best.onnx");
        std::fs::write(dir.path().join("best.names"), "gun\n")?;
        let settings = ModelSettings::new(model.display().to_string());

        let names = settings.resolve_class_names("weapons", |path: &Path| {
            assert_eq!(path, model.as_path());
            Ok(Some(ClassNames::from_labels(["knife", "pistol"])))
        })?;
        assert_eq!(names.name_for(1), "pistol");

        let names = settings.resolve_class_names("weapons", no_embedded_names)?;
        assert_eq!(names.name_for(0), "gun");
        Ok(())
    }

    #[test]
    fn default_weapons_model_never_borrows_coco_labels() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let cfg = ScreenConfig::default();
        let weapons = ModelSettings {
            path: dir.path().join("best.onnx").display().to_string(),
            ..cfg.models[WEAPONS_MODEL].clone()
        };
        let err = weapons
            .resolve_class_names(WEAPONS_MODEL, no_embedded_names)
            .unwrap_err();
        assert!(err.to_string().contains("has no class labels"));

        let mut file_models = ScreenConfig::from_file(serde_json::from_str(
            r#"{ "models": { "nsfw": { "path": "nsfw.onnx" } } }"#,
        )?)?
        .models;
        let nsfw = file_models.remove("nsfw").unwrap();
        assert!(!nsfw.coco_labels);
        assert!(nsfw.resolve_class_names("nsfw", no_embedded_names).is_err());
        Ok(())
    }

    #[test]
    fn general_model_falls_back_to_coco() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let cfg = ScreenConfig::default();
        let general = ModelSettings {
            path: dir.path().join("yolov8n.onnx").display().to_string(),
            ..cfg.models[GENERAL_MODEL].clone()
        };
        assert!(general.coco_labels);
        let names = general.resolve_class_names(GENERAL_MODEL, no_embedded_names)?;
        assert_eq!(names.len(), 80);
        assert_eq!(names.name_for(43), "knife");
        Ok(())
    }

    #[test]
    fn embedded_reader_errors_propagate() {
        let settings = ModelSettings::new("best.onnx");
        let result = settings.resolve_class_names(WEAPONS_MODEL, |_: &Path| {
            Err(anyhow!("names metadata is not a mapping"))
        });
        assert!(result.is_err());
    }
}
