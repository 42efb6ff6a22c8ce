//! Local file video source.
//!
//! This module provides `FileSource` for reading single frames from local
//! video files. The file source is responsible for:
//! - Opening a local video file (no network access)
//! - Reporting the container frame count
//! - Seeking and decoding one frame in-memory
//!
//! `stub://` paths select a synthetic in-memory video:
//! `stub://frames=10,width=64,height=48,decode=fail`. Every key is optional
//! except `frames`.

use anyhow::{anyhow, bail, Context, Result};

#[cfg(feature = "ingest-file-ffmpeg")]
use super::file_ffmpeg::FfmpegFileSource;
use super::VideoSource;
use crate::frame::{expected_rgb_len, Frame};

const STUB_SCHEME: &str = "stub://";
const STUB_DEFAULT_WIDTH: u32 = 64;
const STUB_DEFAULT_HEIGHT: u32 = 48;

/// Local video file source.
pub struct FileSource {
    backend: FileBackend,
}

enum FileBackend {
    Synthetic(SyntheticVideo),
    #[cfg(feature = "ingest-file-ffmpeg")]
    Ffmpeg(FfmpegFileSource),
}

impl FileSource {
    /// Open a video. Fails when the path is not local or cannot be opened.
    pub fn open(path: &str) -> Result<Self> {
        if !is_local_file_path(path) {
            return Err(anyhow!(
                "file ingestion only supports local paths (no URL schemes)"
            ));
        }
        if let Some(spec) = path.strip_prefix(STUB_SCHEME) {
            let config = SyntheticConfig::parse(spec)
                .with_context(|| format!("invalid synthetic video '{}'", path))?;
            log::debug!("FileSource: opened {} (synthetic)", path);
            Ok(Self {
                backend: FileBackend::Synthetic(SyntheticVideo::new(path.to_string(), config)),
            })
        } else {
            #[cfg(feature = "ingest-file-ffmpeg")]
            {
                Ok(Self {
                    backend: FileBackend::Ffmpeg(FfmpegFileSource::open(path)?),
                })
            }
            #[cfg(not(feature = "ingest-file-ffmpeg"))]
            {
                Err(anyhow!(
                    "file ingestion requires the ingest-file-ffmpeg feature"
                ))
            }
        }
    }
}

impl VideoSource for FileSource {
    fn path(&self) -> &str {
        match &self.backend {
            FileBackend::Synthetic(source) => &source.path,
            #[cfg(feature = "ingest-file-ffmpeg")]
            FileBackend::Ffmpeg(source) => source.path(),
        }
    }

    fn frame_count(&self) -> u64 {
        match &self.backend {
            FileBackend::Synthetic(source) => source.config.frames,
            #[cfg(feature = "ingest-file-ffmpeg")]
            FileBackend::Ffmpeg(source) => source.frame_count(),
        }
    }

    fn read_frame(&mut self, index: u64) -> Result<Frame> {
        match &mut self.backend {
            FileBackend::Synthetic(source) => source.read_frame(index),
            #[cfg(feature = "ingest-file-ffmpeg")]
            FileBackend::Ffmpeg(source) => source.read_frame(index),
        }
    }
}

// ----------------------------------------------------------------------------
// Synthetic source (stub://) for tests
// ----------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Eq)]
struct SyntheticConfig {
    frames: u64,
    width: u32,
    height: u32,
    fail_decode: bool,
}

impl SyntheticConfig {
    fn parse(spec: &str) -> Result<Self> {
        let mut frames = None;
        let mut width = STUB_DEFAULT_WIDTH;
        let mut height = STUB_DEFAULT_HEIGHT;
        let mut fail_decode = false;

        for entry in spec.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let (key, value) = entry
                .split_once('=')
                .ok_or_else(|| anyhow!("expected key=value, got '{}'", entry))?;
            match key.trim() {
                "frames" => frames = Some(parse_number(key, value)?),
                "width" => width = parse_number(key, value)?,
                "height" => height = parse_number(key, value)?,
                "decode" => match value.trim() {
                    "ok" => fail_decode = false,
                    "fail" => fail_decode = true,
                    other => bail!("decode must be 'ok' or 'fail', got '{}'", other),
                },
                other => bail!("unknown synthetic video key '{}'", other),
            }
        }

        let frames = frames.ok_or_else(|| anyhow!("synthetic video requires frames=N"))?;
        if width == 0 || height == 0 {
            bail!("synthetic video dimensions must be non-zero");
        }
        Ok(Self {
            frames,
            width,
            height,
            fail_decode,
        })
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| anyhow!("{} must be an unsigned integer, got '{}'", key, value))
}

struct SyntheticVideo {
    path: String,
    config: SyntheticConfig,
}

impl SyntheticVideo {
    fn new(path: String, config: SyntheticConfig) -> Self {
        Self { path, config }
    }

    fn read_frame(&mut self, index: u64) -> Result<Frame> {
        if self.config.fail_decode {
            bail!("synthetic decode failure");
        }
        if index >= self.config.frames {
            bail!(
                "frame index {} out of range ({} frames)",
                index,
                self.config.frames
            );
        }
        let len = expected_rgb_len(self.config.width, self.config.height)?;
        let pixels = (0..len)
            .map(|i| ((i as u64 + index) % 256) as u8)
            .collect();
        Frame::from_rgb(pixels, self.config.width, self.config.height, index)
    }
}

fn is_local_file_path(path: &str) -> bool {
    if path.trim().is_empty() {
        return false;
    }
    if path.starts_with(STUB_SCHEME) {
        return true;
    }
    !path.contains("://")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synthetic_source_reads_requested_index() -> Result<()> {
        let mut source = FileSource::open("stub://frames=10,width=4,height=2")?;
        assert_eq!(source.frame_count(), 10);

        let frame = source.read_frame(5)?;
        assert_eq!(frame.index, 5);
        assert_eq!(frame.width, 4);
        assert_eq!(frame.height, 2);
        assert_eq!(frame.byte_len(), 4 * 2 * 3);
        Ok(())
    }

    #[test]
    fn synthetic_source_rejects_out_of_range_index() -> Result<()> {
        let mut source = FileSource::open("stub://frames=3")?;
        assert!(source.read_frame(3).is_err());
        Ok(())
    }

    #[test]
    fn synthetic_source_can_fail_decode() -> Result<()> {
        let mut source = FileSource::open("stub://frames=3,decode=fail")?;
        let err = source.read_frame(1).unwrap_err();
        assert!(err.to_string().contains("synthetic decode failure"));
        Ok(())
    }

    #[test]
    fn malformed_stub_paths_fail_to_open() {
        assert!(FileSource::open("stub://").is_err());
        assert!(FileSource::open("stub://frames=ten").is_err());
        assert!(FileSource::open("stub://frames=2,depth=3").is_err());
        assert!(FileSource::open("stub://frames=2,width=0").is_err());
    }

    #[test]
    fn remote_and_empty_paths_are_rejected() {
        assert!(FileSource::open("https://example.com/clip.mp4").is_err());
        assert!(FileSource::open("   ").is_err());
    }

    #[test]
    fn local_path_detection() {
        assert!(is_local_file_path("3.mp4"));
        assert!(is_local_file_path("/var/media/clip.mkv"));
        assert!(is_local_file_path("stub://frames=1"));
        assert!(!is_local_file_path("rtsp://camera/stream"));
    }
}
