use std::path::PathBuf;

pub(crate) type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub(crate) enum Error {
    #[error("cannot read video {}: {reason}", path.display())]
    SourceUnreadable { path: PathBuf, reason: String },

    #[error("video is {duration:.2}s long, at least one full second is required")]
    VideoTooShort { duration: f64 },

    /// Only ever rendered into the sentinel narration of a single frame.
    #[error("Error analyzing frame: {reason}")]
    DescriptionFailed { timestamp: u32, reason: String },

    #[error("narrative synthesis failed: {0:#}")]
    SynthesisFailed(anyhow::Error),

    #[error("analysis results {} are corrupt: {reason}", path.display())]
    StoreCorrupt { path: PathBuf, reason: String },

    #[error("{0} is not set; add it to the environment or a .env file")]
    CredentialMissing(&'static str),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn unreadable(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Error::SourceUnreadable {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn corrupt(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Error::StoreCorrupt {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}
