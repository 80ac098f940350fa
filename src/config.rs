use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::scene::TransitionVocabulary;

pub(crate) const API_KEY_VAR: &str = "OPENAI_API_KEY";

const DEFAULT_MODEL: &str = "gpt-4o";
const DEFAULT_FRAME_DELAY_MS: u64 = 500;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 300;
const DEFAULT_TEMPERATURE: f32 = 0.7;
const DEFAULT_MAX_TOKENS: u32 = 4000;

/// Values given on the command line; they win over the environment.
#[derive(Debug, Default, Clone)]
pub(crate) struct Overrides {
    pub(crate) output_root: Option<PathBuf>,
    pub(crate) frame_delay_ms: Option<u64>,
    pub(crate) vision_model: Option<String>,
    pub(crate) text_model: Option<String>,
}

#[derive(Clone)]
pub(crate) struct Config {
    pub(crate) api_key: String,
    pub(crate) vision_model: String,
    pub(crate) text_model: String,
    pub(crate) frame_delay: Duration,
    pub(crate) request_timeout: Duration,
    pub(crate) temperature: f32,
    pub(crate) max_tokens: u32,
    pub(crate) transitions: TransitionVocabulary,
    pub(crate) output_root: PathBuf,
}

impl Config {
    /// Resolves settings from the command line, then the process environment
    /// (after loading `.env`), then defaults.
    pub(crate) fn load(overrides: Overrides) -> Result<Self> {
        if let Err(e) = dotenvy::dotenv() {
            if !e.not_found() {
                tracing::warn!("ignoring unreadable .env file: {e}");
            }
        }
        Self::resolve(overrides, |name| env::var(name).ok())
    }

    pub(crate) fn resolve(
        overrides: Overrides,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let api_key = lookup(API_KEY_VAR)
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty())
            .ok_or(Error::CredentialMissing(API_KEY_VAR))?;

        let transitions = lookup("NARRATOR_TRANSITIONS")
            .map(|list| TransitionVocabulary::new(list.split(',')))
            .filter(|vocabulary| !vocabulary.phrases().is_empty())
            .unwrap_or_default();

        Ok(Config {
            api_key,
            vision_model: overrides
                .vision_model
                .or_else(|| lookup("NARRATOR_VISION_MODEL"))
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            text_model: overrides
                .text_model
                .or_else(|| lookup("NARRATOR_TEXT_MODEL"))
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            frame_delay: Duration::from_millis(
                overrides
                    .frame_delay_ms
                    .or_else(|| parse_var(&lookup, "NARRATOR_FRAME_DELAY_MS"))
                    .unwrap_or(DEFAULT_FRAME_DELAY_MS),
            ),
            request_timeout: Duration::from_secs(
                parse_var(&lookup, "NARRATOR_REQUEST_TIMEOUT_SECS")
                    .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
            ),
            temperature: parse_var(&lookup, "NARRATOR_TEMPERATURE")
                .unwrap_or(DEFAULT_TEMPERATURE),
            max_tokens: parse_var(&lookup, "NARRATOR_MAX_TOKENS").unwrap_or(DEFAULT_MAX_TOKENS),
            transitions,
            output_root: overrides
                .output_root
                .or_else(|| lookup("NARRATOR_OUTPUT_ROOT").map(PathBuf::from))
                .unwrap_or_else(|| PathBuf::from(".")),
        })
    }
}

fn parse_var<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Option<T> {
    let value = lookup(name)?;
    match value.trim().parse() {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            tracing::warn!("ignoring {name}={value:?}: not a valid value");
            None
        }
    }
}
