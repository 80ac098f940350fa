use std::fmt;

use crate::ai::{TextModel, TextRequest};
use crate::error::{Error, Result};
use crate::scene::Scene;
use crate::store::FrameRecord;

const SCENE_SEPARATOR: &str = "\n\n=== Location Change ===\n\n";

const NATURAL_PROMPT: &str = r#"You are a 50-year-old retired Army veteran giving a video tour.
Write exactly as you would naturally speak while showing someone around.

Essential guidelines:
- Use everyday language you'd use in normal conversation
- NO marketing language or flowery descriptions
- Speak like you're talking to a friend or family member
- Keep transitions simple ("Let's head to the kitchen" not "Moving along to our next space")
- Only mention things worth pointing out
- Keep descriptions brief and practical
- Include timestamps only when changing locations or pointing out something specific

Write like this:
"Here's the living room. Big windows give you plenty of natural light. Nice view of the mountains from here."

Not like this:
"As we gracefully transition into this elegantly appointed living space, you'll be captivated by the abundant natural illumination..."

Remember: You're a regular person showing someone around - not a marketing writer."#;

const UNIFIED_PROMPT: &str = "Create a single, flowing narrative script from these scene descriptions. \
The narrator is a 50-year-old retired Army veteran. Key points:

- Combine all descriptions into one coherent story
- Use clear, direct, conversational language with no marketing language
- Keep a professional but approachable tone and keep it brief
- Create smooth transitions between scenes
- Keep timestamps only where the location changes, integrated naturally
- Focus on practical details and clear directions
The narrative should flow naturally as one complete script, not as separate scene descriptions.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub(crate) enum NarrationStyle {
    /// Frames grouped into locations before narration.
    Natural,
    /// Every frame handed over as one flat timeline.
    Unified,
}

impl NarrationStyle {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            NarrationStyle::Natural => "natural",
            NarrationStyle::Unified => "unified",
        }
    }

    fn system_prompt(self) -> &'static str {
        match self {
            NarrationStyle::Natural => NATURAL_PROMPT,
            NarrationStyle::Unified => UNIFIED_PROMPT,
        }
    }

    fn instruction(self) -> &'static str {
        match self {
            NarrationStyle::Natural => {
                "Give a natural tour based on these scenes. Talk like you normally would:"
            }
            NarrationStyle::Unified => {
                "Create a single, flowing narrative that combines all these scenes into one coherent script:"
            }
        }
    }
}

impl fmt::Display for NarrationStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `MM:SS`, truncating fractional seconds. Minutes are not wrapped into hours.
pub(crate) fn format_time(seconds: f64) -> String {
    let total = seconds.max(0.0) as u64;
    format!("{:02}:{:02}", total / 60, total % 60)
}

/// What gets narrated: located scenes or the flat frame timeline.
pub(crate) enum NarrativeSource<'a> {
    Scenes(&'a [Scene<'a>]),
    Frames(&'a [FrameRecord]),
}

impl NarrativeSource<'_> {
    pub(crate) fn style(&self) -> NarrationStyle {
        match self {
            NarrativeSource::Scenes(_) => NarrationStyle::Natural,
            NarrativeSource::Frames(_) => NarrationStyle::Unified,
        }
    }

    /// The timeline text the model is asked to turn into a narrative.
    pub(crate) fn context(&self) -> String {
        match self {
            NarrativeSource::Scenes(scenes) => scenes
                .iter()
                .map(|scene| {
                    let narrations: Vec<&str> = scene.narrations().collect();
                    format!(
                        "Location starting at [{}]:\n{}",
                        format_time(scene.start().into()),
                        narrations.join("\n")
                    )
                })
                .collect::<Vec<_>>()
                .join(SCENE_SEPARATOR),
            NarrativeSource::Frames(frames) => frames
                .iter()
                .map(|frame| {
                    format!("[{}] {}", format_time(frame.timestamp.into()), frame.narration)
                })
                .collect::<Vec<_>>()
                .join("\n\n"),
        }
    }
}

pub(crate) struct NarrativeSynthesizer<'m> {
    model: &'m dyn TextModel,
    temperature: f32,
    max_tokens: u32,
}

impl<'m> NarrativeSynthesizer<'m> {
    pub(crate) fn new(model: &'m dyn TextModel, temperature: f32, max_tokens: u32) -> Self {
        Self {
            model,
            temperature,
            max_tokens,
        }
    }

    pub(crate) fn request(&self, source: &NarrativeSource<'_>) -> TextRequest {
        let style = source.style();
        TextRequest {
            system: style.system_prompt().to_string(),
            user: format!("{}\n\n{}", style.instruction(), source.context()),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }

    pub(crate) async fn synthesize(&self, source: &NarrativeSource<'_>) -> Result<String> {
        let request = self.request(source);
        tracing::info!(style = %source.style(), prompt_chars = request.user.len(), "requesting narrative");

        let narrative = self
            .model
            .synthesize(&request)
            .await
            .map_err(Error::SynthesisFailed)?;
        if narrative.trim().is_empty() {
            return Err(Error::SynthesisFailed(anyhow::anyhow!(
                "model returned an empty narrative"
            )));
        }
        Ok(narrative)
    }
}
