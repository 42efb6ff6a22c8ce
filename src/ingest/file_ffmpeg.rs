//! Local file video source using FFmpeg.
//!
//! Opens the best video stream, estimates its frame count, and decodes a
//! single frame by seeking to the closest preceding keyframe and decoding
//! forward until the target presentation time is reached.

use anyhow::{anyhow, Context, Result};
use ffmpeg_next as ffmpeg;

use crate::frame::Frame;

const AV_TIME_BASE: f64 = 1_000_000.0;

pub(crate) struct FfmpegFileSource {
    path: String,
    input: ffmpeg::format::context::Input,
    stream_index: usize,
    clock: FrameClock,
    frame_count: u64,
    decoder: ffmpeg::codec::decoder::Video,
    scaler: ffmpeg::software::scaling::Context,
}

impl FfmpegFileSource {
    pub(crate) fn open(path: &str) -> Result<Self> {
        ffmpeg::init().context("initialize ffmpeg")?;
        let input = ffmpeg::format::input(&path)
            .with_context(|| format!("failed to open file input '{}' with ffmpeg", path))?;
        let input_stream = input
            .streams()
            .best(ffmpeg::media::Type::Video)
            .ok_or_else(|| anyhow!("file has no video track"))?;
        let stream_index = input_stream.index();
        let time_base = f64::from(input_stream.time_base());
        let frame_rate = {
            let avg = f64::from(input_stream.avg_frame_rate());
            if avg.is_finite() && avg > 0.0 {
                avg
            } else {
                f64::from(input_stream.rate())
            }
        };
        let start_pts = match input_stream.start_time() {
            ts if ts == ffmpeg::ffi::AV_NOPTS_VALUE => 0,
            ts => ts,
        };
        let frame_count = estimate_frame_count(
            input_stream.frames(),
            input_stream.duration(),
            time_base,
            input.duration(),
            frame_rate,
        );

        let context = ffmpeg::codec::context::Context::from_parameters(input_stream.parameters())
            .context("load video decoder parameters")?;
        let decoder = context
            .decoder()
            .video()
            .context("open ffmpeg video decoder")?;

        let scaler = ffmpeg::software::scaling::context::Context::get(
            decoder.format(),
            decoder.width(),
            decoder.height(),
            ffmpeg::util::format::pixel::Pixel::RGB24,
            decoder.width(),
            decoder.height(),
            ffmpeg::software::scaling::flag::Flags::BILINEAR,
        )
        .context("create ffmpeg scaler")?;

        log::debug!(
            "FileSource: opened {} (ffmpeg, {} frames @ {:.3} fps)",
            path,
            frame_count,
            frame_rate
        );

        Ok(Self {
            path: path.to_string(),
            input,
            stream_index,
            clock: FrameClock {
                start_pts,
                time_base,
                frame_rate,
            },
            frame_count,
            decoder,
            scaler,
        })
    }

    pub(crate) fn path(&self) -> &str {
        &self.path
    }

    pub(crate) fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub(crate) fn read_frame(&mut self, index: u64) -> Result<Frame> {
        if self.clock.frame_rate <= 0.0 || !self.clock.frame_rate.is_finite() {
            return Err(anyhow!("video stream reports no usable frame rate"));
        }
        let target_secs = index as f64 / self.clock.frame_rate;
        let seek_ts = (target_secs * AV_TIME_BASE) as i64;
        if index > 0 {
            self.input
                .seek(seek_ts, ..seek_ts)
                .with_context(|| format!("seek to frame {}", index))?;
        }
        self.decoder.flush();

        let clock = self.clock;
        let mut decoded = ffmpeg::frame::Video::empty();
        let mut packets_seen = false;
        let mut found = false;

        for (stream, packet) in self.input.packets() {
            if stream.index() != self.stream_index {
                continue;
            }
            packets_seen = true;
            self.decoder
                .send_packet(&packet)
                .context("send packet to ffmpeg decoder")?;

            while self.decoder.receive_frame(&mut decoded).is_ok() {
                if clock.position_of(&decoded) >= index {
                    found = true;
                    break;
                }
            }
            if found {
                break;
            }
        }

        if !found && packets_seen {
            self.decoder.send_eof().context("flush ffmpeg decoder")?;
            while self.decoder.receive_frame(&mut decoded).is_ok() {
                if clock.position_of(&decoded) >= index {
                    found = true;
                    break;
                }
            }
        }

        if !found {
            return Err(anyhow!("file ended before frame {}", index));
        }
        self.convert(&decoded, index)
    }

    fn convert(&mut self, decoded: &ffmpeg::frame::Video, index: u64) -> Result<Frame> {
        let mut rgb_frame = ffmpeg::frame::Video::empty();
        self.scaler
            .run(decoded, &mut rgb_frame)
            .context("scale frame to RGB")?;
        let (pixels, width, height) = frame_to_pixels(&rgb_frame)?;
        Frame::from_rgb(pixels, width, height, index)
    }
}

/// Maps decoded presentation timestamps to frame indices.
#[derive(Clone, Copy, Debug)]
struct FrameClock {
    start_pts: i64,
    time_base: f64,
    frame_rate: f64,
}

impl FrameClock {
    fn position_of(&self, frame: &ffmpeg::frame::Video) -> u64 {
        let Some(pts) = frame.timestamp().or_else(|| frame.pts()) else {
            return 0;
        };
        let secs = (pts - self.start_pts) as f64 * self.time_base;
        (secs * self.frame_rate).round().max(0.0) as u64
    }
}

/// Container frame count, or `duration * fps` when the container omits it.
fn estimate_frame_count(
    stream_frames: i64,
    stream_duration: i64,
    time_base: f64,
    container_duration: i64,
    frame_rate: f64,
) -> u64 {
    if stream_frames > 0 {
        return stream_frames as u64;
    }
    if !(frame_rate.is_finite() && frame_rate > 0.0) {
        return 0;
    }
    let secs = if stream_duration > 0 {
        stream_duration as f64 * time_base
    } else if container_duration > 0 {
        container_duration as f64 / AV_TIME_BASE
    } else {
        return 0;
    };
    (secs * frame_rate).floor().max(0.0) as u64
}

fn frame_to_pixels(frame: &ffmpeg::frame::Video) -> Result<(Vec<u8>, u32, u32)> {
    let width = frame.width();
    let height = frame.height();
    let row_bytes = (width as usize) * 3;
    let stride = frame.stride(0);
    let data = frame.data(0);

    if stride == row_bytes {
        let len = row_bytes * height as usize;
        let pixels = data
            .get(..len)
            .context("ffmpeg frame is shorter than its dimensions")?;
        return Ok((pixels.to_vec(), width, height));
    }

    let mut pixels = Vec::with_capacity(row_bytes * height as usize);
    for row in 0..height as usize {
        let start = row * stride;
        let end = start + row_bytes;
        pixels.extend_from_slice(
            data.get(start..end)
                .context("ffmpeg frame row is out of bounds")?,
        );
    }

    Ok((pixels, width, height))
}
