//! Decoded keyframe container.
//!
//! A `Frame` is produced once per screened video by the ingest layer, handed
//! to each detection pass by reference, and dropped when screening ends.
//! Pixels are packed RGB24, row-major, no padding between rows.

use anyhow::{anyhow, Result};

/// Bytes per RGB24 pixel.
pub const RGB_CHANNELS: usize = 3;

/// Single decoded video frame.
pub struct Frame {
    /// Packed RGB24 pixels. Length is always `width * height * 3`.
    data: Vec<u8>,

    pub width: u32,
    pub height: u32,

    /// Zero-based index of this frame in the source video.
    pub index: u64,
}

// No Clone: a keyframe is decoded once and borrowed by every pass.

impl Frame {
    /// Wrap an RGB24 pixel buffer, validating its length against the dimensions.
    pub fn from_rgb(data: Vec<u8>, width: u32, height: u32, index: u64) -> Result<Self> {
        let expected = expected_rgb_len(width, height)?;
        if data.len() != expected {
            return Err(anyhow!(
                "RGB frame length mismatch: expected {}, got {}",
                expected,
                data.len()
            ));
        }
        Ok(Self {
            data,
            width,
            height,
            index,
        })
    }

    /// Read-only pixel access for inference backends.
    pub fn pixels(&self) -> &[u8] {
        &self.data
    }

    pub fn byte_len(&self) -> usize {
        self.data.len()
    }
}

impl std::fmt::Debug for Frame {
    // Pixel bytes are never formatted into logs.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("index", &self.index)
            .field("bytes", &self.data.len())
            .finish()
    }
}

pub(crate) fn expected_rgb_len(width: u32, height: u32) -> Result<usize> {
    (width as usize)
        .checked_mul(height as usize)
        .and_then(|v| v.checked_mul(RGB_CHANNELS))
        .ok_or_else(|| anyhow!("frame dimensions overflow"))
}
