use std::fs;
use std::io::{self, Write};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt::{self, MakeWriter};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::Layer;

pub(crate) const ANALYSIS_LOG: &str = "analysis.log";

/// `analysis.log` inside a video's output directory. Events logged before
/// the file is attached are dropped, so the directory is only created once
/// the video is known to be readable.
#[derive(Clone, Default)]
pub(crate) struct AnalysisLog {
    file: Arc<Mutex<Option<fs::File>>>,
}

impl AnalysisLog {
    pub(crate) fn attach(&self, output_dir: &Path) -> io::Result<()> {
        fs::create_dir_all(output_dir)?;
        let file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(output_dir.join(ANALYSIS_LOG))?;
        *self.lock() = Some(file);
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, Option<fs::File>> {
        self.file.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

pub(crate) struct AnalysisLogWriter<'a>(MutexGuard<'a, Option<fs::File>>);

impl Write for AnalysisLogWriter<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self.0.as_mut() {
            Some(file) => file.write(buf),
            None => Ok(buf.len()),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.0.as_mut() {
            Some(file) => file.flush(),
            None => Ok(()),
        }
    }
}

impl<'a> MakeWriter<'a> for AnalysisLog {
    type Writer = AnalysisLogWriter<'a>;

    fn make_writer(&'a self) -> Self::Writer {
        AnalysisLogWriter(self.lock())
    }
}

/// Stderr gets `tournarrate=warn` unless `RUST_LOG` says otherwise; the
/// analysis log always records `tournarrate=info`.
pub(crate) fn init(analysis_log: AnalysisLog) {
    let console_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("tournarrate=warn"));

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(io::stderr)
                .with_filter(console_filter),
        )
        .with(
            fmt::layer()
                .with_ansi(false)
                .with_writer(analysis_log)
                .with_filter(EnvFilter::new("tournarrate=info")),
        )
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_events_before_attach_are_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let output_dir = dir.path().join("tour_analysis");
        let log = AnalysisLog::default();

        log.make_writer().write_all(b"loading\n").unwrap();
        assert!(!output_dir.exists());

        log.attach(&output_dir).unwrap();
        log.make_writer().write_all(b"opened video\n").unwrap();

        let written = fs::read_to_string(output_dir.join(ANALYSIS_LOG)).unwrap();
        assert_eq!(written, "opened video\n");
    }

    #[test]
    fn test_attach_appends_to_existing_log() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(ANALYSIS_LOG), "earlier run\n").unwrap();
        let log = AnalysisLog::default();

        log.attach(dir.path()).unwrap();
        log.make_writer().write_all(b"later run\n").unwrap();

        let written = fs::read_to_string(dir.path().join(ANALYSIS_LOG)).unwrap();
        assert_eq!(written, "earlier run\nlater run\n");
    }

    #[test]
    fn test_tracing_events_reach_attached_file() {
        let dir = tempfile::tempdir().unwrap();
        let log = AnalysisLog::default();
        let subscriber = tracing_subscriber::registry().with(
            fmt::layer()
                .with_ansi(false)
                .with_writer(log.clone())
                .with_filter(EnvFilter::new("tournarrate=info")),
        );

        tracing::subscriber::with_default(subscriber, || {
            tracing::info!("Loading video...");
            log.attach(dir.path()).unwrap();
            tracing::info!("Extracting and analyzing frames...");
            tracing::debug!("segmented frames");
        });

        let written = fs::read_to_string(dir.path().join(ANALYSIS_LOG)).unwrap();
        assert!(written.contains("Extracting and analyzing frames..."), "{written}");
        assert!(!written.contains("Loading video..."), "{written}");
        assert!(!written.contains("segmented frames"), "{written}");
    }
}
