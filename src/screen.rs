//! Keyframe screening: extract, run every detection pass, classify.

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::catalog::{Category, ProhibitedCatalog};
use crate::config::{ScreenConfig, GENERAL_MODEL, WEAPONS_MODEL};
use crate::detect::{detect_categories, ModelRegistry};
use crate::frame::Frame;
use crate::ingest::extract_keyframe;

/// Message reported when no keyframe could be produced.
pub const KEYFRAME_FAILURE_MESSAGE: &str = "Failed to get keyframe";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScreenStatus {
    Safe,
    Flagged,
    Error,
}

/// Outcome of screening one video.
///
/// `items` is sorted and duplicate-free. `message` is set only for errors.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenReport {
    pub status: ScreenStatus,
    pub items: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ScreenReport {
    /// `flagged` when anything matched, `safe` otherwise.
    pub fn from_matches(items: BTreeSet<String>) -> Self {
        let status = if items.is_empty() {
            ScreenStatus::Safe
        } else {
            ScreenStatus::Flagged
        };
        Self {
            status,
            items: items.into_iter().collect(),
            message: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: ScreenStatus::Error,
            items: Vec::new(),
            message: Some(message.into()),
        }
    }

    pub fn is_flagged(&self) -> bool {
        self.status == ScreenStatus::Flagged
    }
}

/// One Category Detector invocation: which model, which label set.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectionPass {
    pub model: String,
    pub category: Category,
}

impl DetectionPass {
    pub fn new(model: impl Into<String>, category: Category) -> Self {
        Self {
            model: model.into(),
            category,
        }
    }
}

/// Weapons model for weapons; general model for everything else.
pub fn default_passes() -> Vec<DetectionPass> {
    vec![
        DetectionPass::new(WEAPONS_MODEL, Category::Weapons),
        DetectionPass::new(GENERAL_MODEL, Category::Violence),
        DetectionPass::new(GENERAL_MODEL, Category::Explicit),
        DetectionPass::new(GENERAL_MODEL, Category::Explosives),
    ]
}

pub struct Screener {
    models: ModelRegistry,
    catalog: ProhibitedCatalog,
    passes: Vec<DetectionPass>,
    threshold: f32,
}

impl Screener {
    pub fn new(
        models: ModelRegistry,
        catalog: ProhibitedCatalog,
        passes: Vec<DetectionPass>,
        threshold: f32,
    ) -> Self {
        log::debug!(
            "screener: {} passes over {} catalog labels, threshold {}",
            passes.len(),
            catalog.all_labels().len(),
            threshold
        );
        Self {
            models,
            catalog,
            passes,
            threshold,
        }
    }

    /// Screener over already loaded models, with the config's catalog,
    /// passes and threshold.
    pub fn from_config(config: &ScreenConfig, models: ModelRegistry) -> Self {
        Self::new(
            models,
            config.catalog.clone(),
            config.passes.clone(),
            config.confidence_threshold,
        )
    }

    /// Screen one video.
    ///
    /// Keyframe failures become an `error` report and skip detection.
    /// Unknown pass models/categories and inference failures are returned as
    /// errors.
    pub fn screen(&mut self, video_path: &str) -> Result<ScreenReport> {
        log::info!("checking video: {}", video_path);
        let frame = match extract_keyframe(video_path) {
            Ok(frame) => frame,
            Err(e) => {
                log::warn!("skipping detection for {}: {}", video_path, e);
                return Ok(ScreenReport::error(KEYFRAME_FAILURE_MESSAGE));
            }
        };

        let found = self.screen_frame(&frame)?;
        drop(frame);

        if found.is_empty() {
            log::info!("no prohibited items detected");
        } else {
            log::info!("prohibited items found:");
            for item in &found {
                log::info!("- {}", item);
            }
        }
        Ok(ScreenReport::from_matches(found))
    }

    /// Run every pass over an already extracted frame and union the matches.
    pub fn screen_frame(&mut self, frame: &Frame) -> Result<BTreeSet<String>> {
        let mut found = BTreeSet::new();
        for pass in &self.passes {
            let labels = self.catalog.labels(pass.category).ok_or_else(|| {
                anyhow!("category '{}' missing from the catalog", pass.category)
            })?;
            let model = self.models.get_mut(&pass.model)?;
            let matches = detect_categories(frame, model, labels, self.threshold)?;
            log::debug!(
                "pass {}/{}: {} matches",
                pass.model,
                pass.category,
                matches.len()
            );
            found.extend(matches);
        }
        Ok(found)
    }
}

/// Load the configured models and screen `config.video_path`.
///
/// Models are loaded once per call; load failures are returned as errors.
pub fn check_video(config: &ScreenConfig) -> Result<ScreenReport> {
    let models = ModelRegistry::load(&config.models)?;
    Screener::from_config(config, models).screen(&config.video_path)
}
