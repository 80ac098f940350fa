use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::ai::{TextModel, VisionModel};
use crate::capture::{video_name, FrameSampler, SampledFrame};
use crate::config::Config;
use crate::describe::FrameDescriber;
use crate::error::{Error, Result};
use crate::narrative::{NarrationStyle, NarrativeSource, NarrativeSynthesizer};
use crate::scene::{SceneSegmenter, TransitionVocabulary};
use crate::script::{write_script, ScriptHeader};
use crate::store::{AnalysisResult, FrameRecord};

/// Receives a human-readable message at every stage transition.
pub(crate) trait StatusSink {
    fn status(&self, message: &str);
}

impl<F: Fn(&str)> StatusSink for F {
    fn status(&self, message: &str) {
        self(message)
    }
}

fn report(status: &dyn StatusSink, message: &str) {
    tracing::info!("{message}");
    status.status(message);
}

pub(crate) fn output_dir_for(video: &Path, output_root: &Path) -> PathBuf {
    output_root.join(format!("{}_analysis", video_name(video)))
}

/// Describes sampled frames one at a time, in timestamp order. A frame that
/// cannot be extracted aborts the run; one that cannot be described does not.
pub(crate) async fn describe_frames<I>(
    frames: I,
    total: u32,
    describer: &mut FrameDescriber<'_>,
    status: &dyn StatusSink,
) -> Result<Vec<FrameRecord>>
where
    I: Iterator<Item = Result<SampledFrame>>,
{
    let mut records = Vec::with_capacity(total as usize);
    for (i, frame) in frames.enumerate() {
        let frame = frame?;
        report(status, &format!("Analyzing frame {} of {}", i + 1, total));
        let narration = describer.describe(frame.timestamp, &frame.path).await;
        records.push(FrameRecord {
            timestamp: frame.timestamp,
            frame_path: frame.path,
            narration,
        });
    }
    Ok(records)
}

/// Opens the video and reads its metadata. Nothing is written if it cannot be sampled.
pub(crate) fn load_video(
    video: &Path,
    output_dir: &Path,
    status: &dyn StatusSink,
) -> Result<FrameSampler> {
    report(status, "Loading video...");
    FrameSampler::open(video, output_dir)
}

/// Describes and stores every sampled frame. Returns the result together
/// with the path of the saved document.
pub(crate) async fn analyze(
    sampler: FrameSampler,
    output_dir: &Path,
    vision: &dyn VisionModel,
    frame_delay: Duration,
    status: &dyn StatusSink,
) -> Result<(AnalysisResult, PathBuf)> {
    let metadata = sampler.metadata().clone();
    let total = sampler.frame_count();

    report(status, "Extracting and analyzing frames...");
    let mut describer = FrameDescriber::new(vision, frame_delay);
    let frames = describe_frames(sampler, total, &mut describer, status).await?;

    report(status, "Saving analysis results...");
    let result = AnalysisResult::new(metadata, frames);
    let path = result.save(output_dir)?;
    Ok((result, path))
}

#[derive(Clone)]
pub(crate) struct NarrationSettings {
    pub(crate) transitions: TransitionVocabulary,
    pub(crate) temperature: f32,
    pub(crate) max_tokens: u32,
}

impl From<&Config> for NarrationSettings {
    fn from(config: &Config) -> Self {
        Self {
            transitions: config.transitions.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        }
    }
}

/// Turns a stored analysis into a narrative script written next to
/// `store_path`. Nothing is written unless synthesis succeeds.
pub(crate) async fn narrate(
    result: &AnalysisResult,
    store_path: &Path,
    style: NarrationStyle,
    model: &dyn TextModel,
    settings: &NarrationSettings,
    status: &dyn StatusSink,
) -> Result<PathBuf> {
    if result.frames.is_empty() {
        return Err(Error::corrupt(store_path, "no frames to narrate"));
    }
    let synthesizer = NarrativeSynthesizer::new(model, settings.temperature, settings.max_tokens);

    let narrative = match style {
        NarrationStyle::Natural => {
            report(status, "Identifying scene changes...");
            let scenes =
                SceneSegmenter::new(settings.transitions.clone()).segment(&result.frames);
            report(status, "Creating natural narrative...");
            synthesizer
                .synthesize(&NarrativeSource::Scenes(&scenes))
                .await?
        }
        NarrationStyle::Unified => {
            report(status, "Creating unified narrative...");
            synthesizer
                .synthesize(&NarrativeSource::Frames(&result.frames))
                .await?
        }
    };

    report(status, "Saving script...");
    let header = ScriptHeader {
        video_name: &result.video_name,
        duration: result.metadata.duration,
        date: chrono::Local::now().date_naive(),
        style,
    };
    let dir = store_path.parent().unwrap_or(Path::new("."));
    write_script(dir, &header, &narrative)
}

pub(crate) async fn narrate_file(
    store_path: &Path,
    style: NarrationStyle,
    model: &dyn TextModel,
    settings: &NarrationSettings,
    status: &dyn StatusSink,
) -> Result<PathBuf> {
    report(status, "Reading analysis data...");
    let result = AnalysisResult::load(store_path)?;
    narrate(&result, store_path, style, model, settings, status).await
}
