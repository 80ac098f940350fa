use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use ffmpeg::util::frame::video::Video;
use ffmpeg_next::{self as ffmpeg, codec, decoder, format, media, software};
use image::codecs::jpeg;
use image::RgbImage;

use crate::error::{Error, Result};
use crate::store::VideoMetadata;

const JPEG_QUALITY: u8 = 95;

/// Frames up to this far past a second still count as shown at that second.
const PTS_TOLERANCE: f64 = 1e-4;

static INIT: OnceLock<std::result::Result<(), ffmpeg::Error>> = OnceLock::new();

pub(crate) fn init() -> std::result::Result<(), ffmpeg::Error> {
    *INIT.get_or_init(|| {
        ffmpeg::init()?;
        ffmpeg::util::log::set_level(ffmpeg::util::log::Level::Error);
        Ok(())
    })
}

pub(crate) fn frame_file_name(second: u32) -> String {
    format!("frame_{second:04}.jpg")
}

/// Number of whole seconds covered by `duration`.
pub(crate) fn sample_count(duration: f64) -> u32 {
    if duration.is_finite() && duration > 0.0 {
        duration.floor().min(f64::from(u32::MAX)) as u32
    } else {
        0
    }
}

/// Seconds since the start of the stream for a timestamp in stream ticks.
pub(crate) fn presentation_time(pts: i64, start_pts: Option<i64>, time_base: f64) -> f64 {
    (pts - start_pts.unwrap_or(0)) as f64 * time_base
}

pub(crate) fn video_name(video: &Path) -> String {
    video
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "video".to_string())
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SampledFrame {
    pub(crate) timestamp: u32,
    pub(crate) path: PathBuf,
}

pub(crate) enum Step<'a, F> {
    Emit(u32, &'a F),
    NeedFrame,
    Done,
    /// The stream ended without producing a single frame.
    Empty,
}

/// Picks, for every whole second, the last frame presented at or before it.
/// Once the stream is exhausted the remaining seconds repeat the last frame.
pub(crate) struct Sampling<F> {
    next_second: u32,
    sample_count: u32,
    current: Option<F>,
    lookahead: Option<(f64, F)>,
    exhausted: bool,
}

impl<F> Sampling<F> {
    pub(crate) fn new(sample_count: u32) -> Self {
        Self {
            next_second: 0,
            sample_count,
            current: None,
            lookahead: None,
            exhausted: false,
        }
    }

    pub(crate) fn push(&mut self, pts: f64, frame: F) {
        self.lookahead = Some((pts, frame));
    }

    pub(crate) fn exhaust(&mut self) {
        self.exhausted = true;
    }

    pub(crate) fn step(&mut self) -> Step<'_, F> {
        loop {
            if self.next_second >= self.sample_count {
                return Step::Done;
            }
            let target = f64::from(self.next_second);
            match self.lookahead.take() {
                Some((pts, frame)) if pts <= target + PTS_TOLERANCE => self.current = Some(frame),
                lookahead => {
                    self.lookahead = lookahead;
                    if self.lookahead.is_none() && !self.exhausted {
                        return Step::NeedFrame;
                    }
                    let second = self.next_second;
                    self.next_second += 1;
                    let shown = self
                        .current
                        .as_ref()
                        .or(self.lookahead.as_ref().map(|(_, frame)| frame));
                    return match shown {
                        Some(frame) => Step::Emit(second, frame),
                        None => {
                            self.next_second = self.sample_count;
                            Step::Empty
                        }
                    };
                }
            }
        }
    }
}

/// Decodes a video once, front to back, writing one JPEG per whole second
/// into the output directory. Yields the frames in timestamp order.
pub(crate) struct FrameSampler {
    source: PathBuf,
    output_dir: PathBuf,
    input: format::context::Input,
    stream_index: usize,
    time_base: f64,
    start_pts: Option<i64>,
    decoder: decoder::Video,
    scaler: software::scaling::Context,
    eof_sent: bool,
    sampling: Sampling<Video>,
    metadata: VideoMetadata,
}

impl FrameSampler {
    pub(crate) fn open(video: &Path, output_dir: &Path) -> Result<Self> {
        let unreadable = |e: ffmpeg::Error| Error::unreadable(video, e);
        init().map_err(unreadable)?;

        let input = format::input(&video).map_err(unreadable)?;
        let (stream_index, time_base, start_pts, fps, stream_duration, parameters) = {
            let stream = input
                .streams()
                .best(media::Type::Video)
                .ok_or_else(|| Error::unreadable(video, ffmpeg::Error::StreamNotFound))?;
            let time_base: f64 = stream.time_base().into();
            let avg_rate = stream.avg_frame_rate();
            let fps: f64 = if avg_rate.numerator() > 0 && avg_rate.denominator() > 0 {
                avg_rate.into()
            } else {
                stream.rate().into()
            };
            let start_pts =
                Some(stream.start_time()).filter(|&pts| pts != ffmpeg::ffi::AV_NOPTS_VALUE);
            (
                stream.index(),
                time_base,
                start_pts,
                fps,
                stream.duration() as f64 * time_base,
                stream.parameters(),
            )
        };

        let duration = if input.duration() > 0 {
            input.duration() as f64 / ffmpeg::ffi::AV_TIME_BASE as f64
        } else {
            stream_duration
        };
        if !duration.is_finite() || duration <= 0.0 {
            return Err(Error::unreadable(video, "no usable duration"));
        }
        if duration < 1.0 {
            return Err(Error::VideoTooShort { duration });
        }
        if !fps.is_finite() || fps <= 0.0 {
            return Err(Error::unreadable(video, "unknown frame rate"));
        }

        let decoder = codec::context::Context::from_parameters(parameters)
            .map_err(unreadable)?
            .decoder()
            .video()
            .map_err(unreadable)?;

        let scaler = software::scaling::context::Context::get(
            decoder.format(),
            decoder.width(),
            decoder.height(),
            format::Pixel::RGB24,
            decoder.width(),
            decoder.height(),
            software::scaling::Flags::BILINEAR,
        )
        .map_err(unreadable)?;

        let metadata = VideoMetadata {
            duration,
            fps,
            size: [decoder.width(), decoder.height()],
            filename: video_name(video),
        };
        fs::create_dir_all(output_dir)?;
        tracing::info!(
            video = %video.display(),
            duration,
            fps,
            width = decoder.width(),
            height = decoder.height(),
            "opened video"
        );

        Ok(Self {
            source: video.to_path_buf(),
            output_dir: output_dir.to_path_buf(),
            input,
            stream_index,
            time_base,
            start_pts,
            decoder,
            scaler,
            eof_sent: false,
            sampling: Sampling::new(sample_count(duration)),
            metadata,
        })
    }

    pub(crate) fn metadata(&self) -> &VideoMetadata {
        &self.metadata
    }

    pub(crate) fn frame_count(&self) -> u32 {
        self.sampling.sample_count
    }

    fn unreadable(&self, reason: impl ToString) -> Error {
        Error::unreadable(&self.source, reason)
    }

    /// Next decoded frame with its presentation time in seconds, or `None`
    /// once the decoder is drained.
    fn decode_next(&mut self) -> Result<Option<(f64, Video)>> {
        loop {
            let mut decoded = Video::empty();
            if self.decoder.receive_frame(&mut decoded).is_ok() {
                let pts = decoded
                    .timestamp()
                    .or(decoded.pts())
                    .ok_or_else(|| self.unreadable("decoded frame has no timestamp"))?;
                let seconds = presentation_time(pts, self.start_pts, self.time_base);
                return Ok(Some((seconds, decoded)));
            }
            if self.eof_sent {
                return Ok(None);
            }

            let packet = self
                .input
                .packets()
                .next()
                .map(|(stream, packet)| (stream.index(), packet));
            match packet {
                Some((index, packet)) if index == self.stream_index => {
                    if let Err(e) = self.decoder.send_packet(&packet) {
                        tracing::warn!("skipping undecodable packet: {e}");
                    }
                }
                Some(_) => {}
                None => {
                    self.decoder.send_eof().map_err(|e| self.unreadable(e))?;
                    self.eof_sent = true;
                }
            }
        }
    }

    fn advance(&mut self) -> Option<Result<SampledFrame>> {
        loop {
            match self.sampling.step() {
                Step::Emit(second, frame) => {
                    let path = self.output_dir.join(frame_file_name(second));
                    let written = write_jpeg(&mut self.scaler, frame, &path).map(|()| SampledFrame {
                        timestamp: second,
                        path,
                    });
                    return Some(written);
                }
                Step::NeedFrame => match self.decode_next() {
                    Ok(Some((pts, frame))) => self.sampling.push(pts, frame),
                    Ok(None) => self.sampling.exhaust(),
                    Err(e) => return Some(Err(e)),
                },
                Step::Done => return None,
                Step::Empty => return Some(Err(self.unreadable("no decodable video frames"))),
            }
        }
    }
}

impl Iterator for FrameSampler {
    type Item = Result<SampledFrame>;

    fn next(&mut self) -> Option<Self::Item> {
        let item = self.advance();
        if matches!(item, Some(Err(_))) {
            self.sampling.next_second = self.sampling.sample_count;
        }
        item
    }
}

/// Copies the first plane of a packed RGB24 frame, dropping row padding.
pub(crate) fn rgb_image(frame: &Video) -> Option<RgbImage> {
    let (width, height) = (frame.width(), frame.height());
    let row = width as usize * 3;
    let stride = frame.stride(0);
    let data = frame.data(0);

    let mut pixels = Vec::with_capacity(row * height as usize);
    for y in 0..height as usize {
        pixels.extend_from_slice(data.get(y * stride..y * stride + row)?);
    }
    RgbImage::from_raw(width, height, pixels)
}

fn write_jpeg(
    scaler: &mut software::scaling::Context,
    decoded: &Video,
    path: &Path,
) -> Result<()> {
    let to_io = |e: ffmpeg::Error| std::io::Error::other(e);

    let mut rgb_frame = Video::empty();
    scaler.run(decoded, &mut rgb_frame).map_err(to_io)?;
    let image = rgb_image(&rgb_frame)
        .ok_or_else(|| std::io::Error::other("Failed to create image buffer"))?;

    let mut jpeg_data = Vec::new();
    let mut encoder = jpeg::JpegEncoder::new_with_quality(&mut jpeg_data, JPEG_QUALITY);
    encoder
        .encode(
            &image,
            image.width(),
            image.height(),
            image::ExtendedColorType::Rgb8,
        )
        .map_err(std::io::Error::other)?;
    fs::write(path, jpeg_data)?;
    Ok(())
}
