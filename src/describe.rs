use std::path::Path;
use std::time::Duration;

use tokio::time::Instant;

use crate::ai::VisionModel;
use crate::error::Error;

/// Fixed gap between the end of one call and the start of the next.
pub(crate) struct Throttle {
    interval: Duration,
    last_finished: Option<Instant>,
}

impl Throttle {
    pub(crate) fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_finished: None,
        }
    }

    pub(crate) async fn wait(&self) {
        if let Some(last) = self.last_finished {
            tokio::time::sleep_until(last + self.interval).await;
        }
    }

    pub(crate) fn finished(&mut self) {
        self.last_finished = Some(Instant::now());
    }
}

/// Describes frames one at a time and never fails: a service error becomes
/// the frame's narration.
pub(crate) struct FrameDescriber<'m> {
    model: &'m dyn VisionModel,
    throttle: Throttle,
}

impl<'m> FrameDescriber<'m> {
    pub(crate) fn new(model: &'m dyn VisionModel, delay: Duration) -> Self {
        Self {
            model,
            throttle: Throttle::new(delay),
        }
    }

    pub(crate) async fn describe(&mut self, timestamp: u32, image: &Path) -> String {
        self.throttle.wait().await;
        let outcome = self.model.describe(image).await;
        self.throttle.finished();

        match outcome {
            Ok(description) => {
                tracing::info!(timestamp, chars = description.len(), "described frame");
                description
            }
            Err(e) => {
                let failure = Error::DescriptionFailed {
                    timestamp,
                    reason: format!("{e:#}"),
                };
                tracing::error!(image = %image.display(), "{failure:?}");
                failure.to_string()
            }
        }
    }
}
