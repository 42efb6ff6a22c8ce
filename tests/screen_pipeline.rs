//! End-to-end screening over synthetic videos and scripted models.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::Result;
use keyframe_screen::{
    default_passes, BoundingBox, BoxPrediction, ClassNames, DetectionModel, Frame,
    ModelRegistry, ProhibitedCatalog, ScreenReport, ScreenStatus, Screener, GENERAL_MODEL,
    KEYFRAME_FAILURE_MESSAGE, WEAPONS_MODEL,
};

/// Scripted model that records every frame index it was asked to infer on.
struct RecordingModel {
    name: &'static str,
    class_names: ClassNames,
    predictions: Vec<(usize, f32)>,
    calls: Arc<AtomicUsize>,
    frame_indices: Arc<Mutex<Vec<u64>>>,
}

impl DetectionModel for RecordingModel {
    fn name(&self) -> &str {
        self.name
    }

    fn class_names(&self) -> &ClassNames {
        &self.class_names
    }

    fn infer(&mut self, frame: &Frame) -> Result<Vec<BoxPrediction>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.frame_indices.lock().unwrap().push(frame.index);
        Ok(self
            .predictions
            .iter()
            .map(|&(class_id, confidence)| BoxPrediction {
                class_id,
                confidence,
                bbox: BoundingBox::new(0.0, 0.0, 8.0, 8.0),
            })
            .collect())
    }
}

struct Probe {
    calls: Arc<AtomicUsize>,
    frame_indices: Arc<Mutex<Vec<u64>>>,
}

impl Probe {
    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

fn recording_model(
    name: &'static str,
    class_names: ClassNames,
    predictions: Vec<(usize, f32)>,
) -> (Box<dyn DetectionModel>, Probe) {
    let calls = Arc::new(AtomicUsize::new(0));
    let frame_indices = Arc::new(Mutex::new(Vec::new()));
    let model = RecordingModel {
        name,
        class_names,
        predictions,
        calls: calls.clone(),
        frame_indices: frame_indices.clone(),
    };
    (
        Box::new(model),
        Probe {
            calls,
            frame_indices,
        },
    )
}

fn screener(
    weapons: Vec<(usize, f32)>,
    general: Vec<(usize, f32)>,
) -> (Screener, Probe, Probe) {
    let (weapons_model, weapons_probe) = recording_model(
        WEAPONS_MODEL,
        ClassNames::from_labels(["knife", "pistol", "rifle"]),
        weapons,
    );
    let (general_model, general_probe) =
        recording_model(GENERAL_MODEL, ClassNames::coco(), general);

    let mut models = ModelRegistry::new();
    models.register(WEAPONS_MODEL, weapons_model);
    models.register(GENERAL_MODEL, general_model);
    let screener = Screener::new(
        models,
        ProhibitedCatalog::default(),
        default_passes(),
        keyframe_screen::DEFAULT_CONFIDENCE_THRESHOLD,
    );
    (screener, weapons_probe, general_probe)
}

#[test]
fn ten_frame_video_is_screened_at_frame_five() -> Result<()> {
    let (mut screener, weapons, general) = screener(vec![], vec![]);
    screener.screen("stub://frames=10")?;

    assert_eq!(*weapons.frame_indices.lock().unwrap(), vec![5]);
    assert_eq!(*general.frame_indices.lock().unwrap(), vec![5, 5, 5]);
    Ok(())
}

#[test]
fn knife_from_weapons_model_flags_the_video() -> Result<()> {
    let (mut screener, _, _) = screener(vec![(0, 0.9)], vec![]);
    let report = screener.screen("stub://frames=10")?;

    assert_eq!(
        report,
        ScreenReport {
            status: ScreenStatus::Flagged,
            items: vec!["knife".to_string()],
            message: None,
        }
    );
    Ok(())
}

#[test]
fn detections_at_or_below_threshold_are_safe() -> Result<()> {
    // COCO 43 is "knife": not in any non-weapon category, and at threshold anyway.
    let (mut screener, weapons, general) =
        screener(vec![(0, 0.35), (1, 0.2), (2, 0.35)], vec![(43, 0.35), (0, 0.1)]);
    let report = screener.screen("stub://frames=10")?;

    assert_eq!(report.status, ScreenStatus::Safe);
    assert!(report.items.is_empty());
    assert!(report.message.is_none());
    assert_eq!(weapons.calls(), 1);
    assert_eq!(general.calls(), 3);
    Ok(())
}

#[test]
fn invalid_video_path_skips_detection() -> Result<()> {
    for path in ["rtsp://camera/stream", "stub://frames=0", "stub://frames=4,decode=fail"] {
        let (mut screener, weapons, general) = screener(vec![(0, 0.9)], vec![]);
        let report = screener.screen(path)?;

        assert_eq!(report.status, ScreenStatus::Error, "path {path}");
        assert!(report.items.is_empty());
        assert_eq!(report.message.as_deref(), Some(KEYFRAME_FAILURE_MESSAGE));
        assert_eq!(weapons.calls(), 0);
        assert_eq!(general.calls(), 0);
    }
    Ok(())
}

#[test]
fn unmapped_class_indices_never_flag() -> Result<()> {
    let (mut screener, _, _) = screener(vec![(17, 0.99)], vec![(512, 0.99)]);
    let report = screener.screen("stub://frames=2")?;
    assert_eq!(report.status, ScreenStatus::Safe);
    Ok(())
}

#[test]
fn items_are_always_catalog_labels() -> Result<()> {
    let (mut screener, _, _) = screener(
        vec![(0, 0.9), (1, 0.8), (2, 0.7)],
        (0..80).map(|class_id| (class_id, 0.99)).collect(),
    );
    let report = screener.screen("stub://frames=30")?;

    let catalog = ProhibitedCatalog::default();
    let all = catalog.all_labels();
    assert!(report.is_flagged());
    assert!(report.items.iter().all(|item| all.contains(item.as_str())));
    let items: BTreeSet<_> = report.items.iter().map(String::as_str).collect();
    assert_eq!(items, BTreeSet::from(["knife", "pistol", "rifle"]));
    Ok(())
}
