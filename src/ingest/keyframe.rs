//! Midpoint keyframe extraction.

use thiserror::Error;

use super::{FileSource, VideoSource};
use crate::frame::Frame;

/// Why a keyframe could not be produced. Non-fatal: callers report it.
#[derive(Debug, Error)]
pub enum KeyframeError {
    #[error("cannot open video {path}: {reason}")]
    Open { path: String, reason: String },
    #[error("video {path} has no frames")]
    NoFrames { path: String },
    #[error("cannot read frame {index} of {path}: {reason}")]
    Decode {
        path: String,
        index: u64,
        reason: String,
    },
}

/// Index of the temporal midpoint frame, `None` for an empty video.
pub fn middle_frame_index(total_frames: u64) -> Option<u64> {
    (total_frames > 0).then_some(total_frames / 2)
}

/// Open `path` and decode its midpoint frame.
///
/// The video handle is released before this returns, whatever the outcome.
pub fn extract_keyframe(path: &str) -> Result<Frame, KeyframeError> {
    let source = FileSource::open(path).map_err(|e| {
        let err = KeyframeError::Open {
            path: path.to_string(),
            reason: format!("{:#}", e),
        };
        log::error!("{}", err);
        err
    })?;
    read_middle_frame(source)
}

/// Decode the midpoint frame of an already opened source, consuming it.
pub fn read_middle_frame<S: VideoSource>(mut source: S) -> Result<Frame, KeyframeError> {
    let path = source.path().to_string();
    let total_frames = source.frame_count();
    let Some(index) = middle_frame_index(total_frames) else {
        drop(source);
        let err = KeyframeError::NoFrames { path };
        log::error!("{}", err);
        return Err(err);
    };

    log::debug!(
        "reading keyframe {} of {} from {}",
        index,
        total_frames,
        path
    );
    let result = source.read_frame(index);
    drop(source);

    result.map_err(|e| {
        let err = KeyframeError::Decode {
            path,
            index,
            reason: format!("{:#}", e),
        };
        log::error!("{}", err);
        err
    })
}
