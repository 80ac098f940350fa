use crate::store::FrameRecord;

pub(crate) const DEFAULT_TRANSITIONS: [&str; 8] = [
    "moving to",
    "entering",
    "stepping into",
    "next we have",
    "moving into",
    "heading to",
    "walking into",
    "now in",
];

/// Phrases whose presence in a frame's narration marks a change of location.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct TransitionVocabulary {
    phrases: Vec<String>,
}

impl Default for TransitionVocabulary {
    fn default() -> Self {
        Self::new(DEFAULT_TRANSITIONS)
    }
}

impl TransitionVocabulary {
    /// Blank phrases are dropped; matching is case-insensitive.
    pub(crate) fn new<I, S>(phrases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            phrases: phrases
                .into_iter()
                .map(|p| p.as_ref().trim().to_lowercase())
                .filter(|p| !p.is_empty())
                .collect(),
        }
    }

    pub(crate) fn phrases(&self) -> &[String] {
        &self.phrases
    }

    pub(crate) fn is_transition(&self, narration: &str) -> bool {
        let narration = narration.to_lowercase();
        self.phrases.iter().any(|p| narration.contains(p.as_str()))
    }
}

/// A contiguous run of frames describing one location.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Scene<'a> {
    pub(crate) frames: &'a [FrameRecord],
}

impl<'a> Scene<'a> {
    pub(crate) fn start(&self) -> u32 {
        self.frames[0].timestamp
    }

    pub(crate) fn narrations(&self) -> impl Iterator<Item = &'a str> {
        let frames: &'a [FrameRecord] = self.frames;
        frames.iter().map(|f| f.narration.as_str())
    }
}

pub(crate) struct SceneSegmenter {
    vocabulary: TransitionVocabulary,
}

impl SceneSegmenter {
    pub(crate) fn new(vocabulary: TransitionVocabulary) -> Self {
        Self { vocabulary }
    }

    /// Splits `frames` before every frame that mentions a transition, except
    /// the first. The scenes borrow consecutive slices of `frames`, so their
    /// concatenation is always the input.
    pub(crate) fn segment<'a>(&self, frames: &'a [FrameRecord]) -> Vec<Scene<'a>> {
        let mut scenes = Vec::new();
        let mut scene_start = 0;

        for (i, frame) in frames.iter().enumerate().skip(1) {
            if self.vocabulary.is_transition(&frame.narration) {
                scenes.push(Scene {
                    frames: &frames[scene_start..i],
                });
                scene_start = i;
            }
        }
        if scene_start < frames.len() {
            scenes.push(Scene {
                frames: &frames[scene_start..],
            });
        }

        tracing::debug!(frames = frames.len(), scenes = scenes.len(), "segmented frames");
        scenes
    }
}
