//! Keyframe screening.
//!
//! Samples a single keyframe (the temporal midpoint) from a video and runs
//! object-detection models over it to flag prohibited content: weapons,
//! violence, explicit material, explosives.
//!
//! # Pipeline
//!
//! 1. **Keyframe extraction** (`ingest`): open, seek to `floor(frames / 2)`,
//!    decode one frame, release the handle.
//! 2. **Category detection** (`detect`): one inference pass per
//!    (model, category) pair, keeping labels from the category's catalog
//!    entry whose confidence is strictly above the threshold.
//! 3. **Aggregation** (`screen`): union every pass; non-empty means
//!    `flagged`, empty means `safe`. A failed extraction short-circuits to
//!    `error`.
//!
//! # Module Structure
//!
//! - `frame`: decoded RGB frame container
//! - `ingest`: video sources (FFmpeg files, synthetic `stub://` videos)
//! - `detect`: model trait, backends (tract ONNX, stub), class tables
//! - `catalog`: prohibited category -> label table
//! - `config`: file/env configuration
//! - `screen`: the screening entry points and report type

pub mod catalog;
pub mod config;
pub mod detect;
pub mod frame;
pub mod ingest;
pub mod screen;

pub use catalog::{Category, ProhibitedCatalog};
pub use config::{ModelSettings, ScreenConfig, GENERAL_MODEL, WEAPONS_MODEL};
pub use detect::{
    detect_categories, BoundingBox, BoxPrediction, ClassNames, DetectionModel, ModelRegistry,
    StubModel, DEFAULT_CONFIDENCE_THRESHOLD, UNKNOWN_LABEL,
};
pub use frame::Frame;
pub use ingest::{extract_keyframe, FileSource, KeyframeError, VideoSource};
pub use screen::{
    check_video, default_passes, DetectionPass, ScreenReport, ScreenStatus, Screener,
    KEYFRAME_FAILURE_MESSAGE,
};
