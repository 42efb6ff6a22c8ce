//! Video ingestion.
//!
//! This module opens a local video, seeks to a single frame and decodes it:
//! - Local video files (feature: ingest-file-ffmpeg)
//! - Synthetic `stub://` videos (tests, dry runs)
//!
//! Only one frame is ever decoded per video. The ingestion layer MUST:
//! - Release the video handle before returning, on every path
//! - Report open/empty/decode failures as values, never panic
//!
//! The ingestion layer MUST NOT:
//! - Fetch remote URLs
//! - Store decoded frames to disk

pub mod file;
#[cfg(feature = "ingest-file-ffmpeg")]
pub(crate) mod file_ffmpeg;
pub mod keyframe;

pub use file::FileSource;
pub use keyframe::{extract_keyframe, middle_frame_index, read_middle_frame, KeyframeError};

use anyhow::Result;

use crate::frame::Frame;

/// Random-access view of an opened video.
///
/// Implementations own the underlying handle; dropping the source releases it.
pub trait VideoSource {
    /// Path or locator this source was opened from.
    fn path(&self) -> &str;

    /// Total frame count as reported (or estimated) by the container.
    fn frame_count(&self) -> u64;

    /// Seek to `index` and decode exactly one frame.
    fn read_frame(&mut self, index: u64) -> Result<Frame>;
}
