use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;

use crate::error::Result;
use crate::narrative::{format_time, NarrationStyle};

const RULE: &str = "=====================================================";

/// `lake_house-tour` becomes `Lake House Tour`.
pub(crate) fn title_from_name(video_name: &str) -> String {
    let mut title = String::with_capacity(video_name.len());
    let mut in_word = false;
    for c in video_name.chars() {
        let c = if c == '_' || c == '-' { ' ' } else { c };
        if c.is_alphabetic() {
            if in_word {
                title.extend(c.to_lowercase());
            } else {
                title.extend(c.to_uppercase());
            }
            in_word = true;
        } else {
            title.push(c);
            in_word = false;
        }
    }
    title
}

pub(crate) fn narrative_file_name(video_name: &str, style: NarrationStyle) -> String {
    format!("{video_name}_{style}_narrative.txt")
}

pub(crate) struct ScriptHeader<'a> {
    pub(crate) video_name: &'a str,
    pub(crate) duration: f64,
    pub(crate) date: NaiveDate,
    pub(crate) style: NarrationStyle,
}

impl ScriptHeader<'_> {
    pub(crate) fn render(&self) -> String {
        let (heading, narrator) = match self.style {
            NarrationStyle::Natural => (
                "NARRATION SCRIPT",
                "Narrator: Veteran Tour Guide\n\
                 - Natural, conversational style\n\
                 - Clear and direct descriptions\n\
                 - Simple location transitions\n\
                 - Practical observations",
            ),
            NarrationStyle::Unified => (
                "PROFESSIONAL NARRATION SCRIPT",
                "Narrator Profile: Male, 50s, Army veteran\n\
                 Style Notes:\n\
                 - Clear, direct communication style\n\
                 - Professional but conversational tone\n\
                 - Straightforward descriptions\n\
                 - Natural, measured pacing\n\
                 - Military precision without being rigid",
            ),
        };

        format!(
            "{heading}\n{title}\nDuration: {duration}\nGenerated: {date}\n\n{narrator}\n\n{RULE}\n\n",
            title = title_from_name(self.video_name),
            duration = format_time(self.duration),
            date = self.date.format("%B %d, %Y"),
        )
    }
}

/// Writes header and body to `<dir>/<video>_<style>_narrative.txt`,
/// replacing any earlier script of the same name.
pub(crate) fn write_script(dir: &Path, header: &ScriptHeader<'_>, body: &str) -> Result<PathBuf> {
    let path = dir.join(narrative_file_name(header.video_name, header.style));
    let mut script = header.render();
    script.push_str(body);
    fs::write(&path, script)?;
    tracing::info!(path = %path.display(), "saved narrative script");
    Ok(path)
}
