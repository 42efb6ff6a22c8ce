//! keyframe_screen - screen a video's midpoint frame for prohibited content
//!
//! Prints a JSON report on stdout:
//! `{"status": "safe" | "flagged" | "error", "items": [...], "message"?: "..."}`.
//! Exits non-zero only when configuration, model loading or inference fails.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use keyframe_screen::{ModelRegistry, ScreenConfig, Screener, GENERAL_MODEL, WEAPONS_MODEL};

#[path = "../ui.rs"]
mod ui;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Video to screen. Defaults to the configured video path.
    video: Option<String>,
    /// Config file (JSON, or TOML with a .toml extension).
    #[arg(long, env = "KEYFRAME_SCREEN_CONFIG")]
    config: Option<PathBuf>,
    /// Confidence threshold; detections must score strictly above it.
    #[arg(long)]
    threshold: Option<f32>,
    /// Weapons model (ONNX file or stub:// spec).
    #[arg(long)]
    weapons_model: Option<String>,
    /// General-purpose model (ONNX file or stub:// spec).
    #[arg(long)]
    general_model: Option<String>,
    /// UI mode for stderr progress.
    #[arg(long, value_enum, default_value_t = ui::UiMode::Auto, value_name = "MODE")]
    ui: ui::UiMode,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let ui = ui::Ui::for_terminal(args.ui);

    let mut cfg = ScreenConfig::load_from(args.config.as_deref())?;
    if let Some(video) = args.video {
        cfg.video_path = video;
    }
    if let Some(threshold) = args.threshold {
        cfg.confidence_threshold = threshold;
    }
    if let Some(path) = args.weapons_model {
        cfg.set_model_path(WEAPONS_MODEL, path);
    }
    if let Some(path) = args.general_model {
        cfg.set_model_path(GENERAL_MODEL, path);
    }
    cfg.validate()?;

    let stage = ui.stage("Load models");
    let models = ModelRegistry::load(&cfg.models)?;
    stage.done(models.keys().join(", "));

    let stage = ui.stage("Screen keyframe");
    let report = Screener::from_config(&cfg, models).screen(&cfg.video_path)?;
    match &report.message {
        Some(message) => stage.done(message),
        None => stage.done(format!("{} prohibited item(s)", report.items.len())),
    }

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
