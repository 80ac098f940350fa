//! Deterministic stand-ins for the external models.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use ffmpeg::util::frame::video::Video;
use ffmpeg_next::{self as ffmpeg, codec, encoder, format, Packet, Rational};
use tokio::time::Instant;

use crate::ai::{TextModel, TextRequest, VisionModel};
use crate::store::FrameRecord;

pub(crate) fn frames(items: &[(u32, &str)]) -> Vec<FrameRecord> {
    items
        .iter()
        .map(|&(timestamp, narration)| FrameRecord {
            timestamp,
            frame_path: PathBuf::from(format!("frame_{timestamp:04}.jpg")),
            narration: narration.to_string(),
        })
        .collect()
}

/// Answers `description of <file name>`, failing on the listed call indices.
#[derive(Default)]
pub(crate) struct ScriptedVision {
    fail_calls: Vec<usize>,
    calls: Mutex<Vec<Instant>>,
}

impl ScriptedVision {
    pub(crate) fn failing_at(calls: &[usize]) -> Self {
        Self {
            fail_calls: calls.to_vec(),
            ..Self::default()
        }
    }

    pub(crate) fn call_times(&self) -> Vec<Instant> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl VisionModel for ScriptedVision {
    async fn describe(&self, image: &Path) -> anyhow::Result<String> {
        let call = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(Instant::now());
            calls.len() - 1
        };
        if self.fail_calls.contains(&call) {
            anyhow::bail!("rate limit exceeded");
        }
        let name = image.file_name().unwrap_or_default().to_string_lossy();
        Ok(format!("description of {name}"))
    }
}

pub(crate) struct RecordingText {
    reply: String,
    requests: Mutex<Vec<TextRequest>>,
}

impl RecordingText {
    pub(crate) fn replying(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn requests(&self) -> Vec<TextRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextModel for RecordingText {
    async fn synthesize(&self, request: &TextRequest) -> anyhow::Result<String> {
        self.requests.lock().unwrap().push(request.clone());
        Ok(self.reply.clone())
    }
}

pub(crate) struct FailingText(pub(crate) &'static str);

#[async_trait]
impl TextModel for FailingText {
    async fn synthesize(&self, _request: &TextRequest) -> anyhow::Result<String> {
        Err(anyhow::anyhow!(self.0))
    }
}

pub(crate) const CLIP_WIDTH: u32 = 64;
pub(crate) const CLIP_HEIGHT: u32 = 48;

/// Writes a flat-gray MPEG-4 clip of `frame_count` frames at `fps`. Frame `i`
/// has luma `i * 7`, so later frames decode brighter.
pub(crate) fn encode_clip(path: &Path, fps: i32, frame_count: i64) {
    crate::capture::init().unwrap();
    let time_base = Rational::new(1, fps);

    let mut output = format::output(&path).unwrap();
    let global_header = output
        .format()
        .flags()
        .contains(format::Flags::GLOBAL_HEADER);
    let codec = encoder::find(codec::Id::MPEG4).unwrap();
    let mut output_stream = output.add_stream(codec).unwrap();
    let stream_index = output_stream.index();

    let mut encoder = codec::context::Context::new_with_codec(codec)
        .encoder()
        .video()
        .unwrap();
    encoder.set_width(CLIP_WIDTH);
    encoder.set_height(CLIP_HEIGHT);
    encoder.set_format(format::Pixel::YUV420P);
    encoder.set_frame_rate(Some(Rational::new(fps, 1)));
    encoder.set_time_base(time_base);
    if global_header {
        encoder.set_flags(codec::Flags::GLOBAL_HEADER);
    }
    let mut encoder = encoder.open_as(codec).unwrap();
    output_stream.set_parameters(&encoder);
    output_stream.set_time_base(time_base);

    output.write_header().unwrap();
    let output_time_base = output.stream(stream_index).unwrap().time_base();

    let write_packets = |encoder: &mut encoder::video::Encoder,
                         output: &mut format::context::Output| {
        let mut packet = Packet::empty();
        while encoder.receive_packet(&mut packet).is_ok() {
            packet.set_stream(stream_index);
            packet.rescale_ts(time_base, output_time_base);
            packet.write_interleaved(output).unwrap();
        }
    };

    for i in 0..frame_count {
        let mut frame = Video::new(format::Pixel::YUV420P, CLIP_WIDTH, CLIP_HEIGHT);
        frame.data_mut(0).fill((i * 7).min(255) as u8);
        frame.data_mut(1).fill(128);
        frame.data_mut(2).fill(128);
        frame.set_pts(Some(i));
        encoder.send_frame(&frame).unwrap();
        write_packets(&mut encoder, &mut output);
    }
    encoder.send_eof().unwrap();
    write_packets(&mut encoder, &mut output);
    output.write_trailer().unwrap();
}
