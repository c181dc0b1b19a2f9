// Downloader backend trait definition

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::errors::DownloadError;
use super::models::{
    DownloadEvent, DownloadOutcome, DownloadRequest, FormatDescriptor, NetworkConfig,
    ProgressSample,
};
use super::runner::DownloadHandle;

/// Receives progress, warnings and the terminal outcome of a download
pub trait ProgressEmitter: Send + Sync {
    fn emit(&self, event: DownloadEvent);
}

impl ProgressEmitter for mpsc::UnboundedSender<DownloadEvent> {
    fn emit(&self, event: DownloadEvent) {
        // listener went away; the download keeps running until stopped
        let _ = self.send(event);
    }
}

/// Trait for downloader backend implementations
#[async_trait]
pub trait DownloaderBackend: Send + Sync {
    /// Name of the backend (for logging)
    fn name(&self) -> &'static str;

    /// Ask the extraction tool which formats a URL offers
    async fn list_formats(
        &self,
        url: &str,
        network: &NetworkConfig,
    ) -> Result<Vec<FormatDescriptor>, DownloadError>;

    /// Start a download in the background and return immediately
    fn start_download(
        &self,
        request: DownloadRequest,
        emitter: Arc<dyn ProgressEmitter>,
    ) -> DownloadHandle;
}

/// Forwards events until the terminal one, then drops everything
pub(crate) struct EventGate {
    emitter: Arc<dyn ProgressEmitter>,
    finished: bool,
}

impl EventGate {
    pub(crate) fn new(emitter: Arc<dyn ProgressEmitter>) -> Self {
        Self {
            emitter,
            finished: false,
        }
    }

    pub(crate) fn destination(&self, path: PathBuf) {
        if !self.finished {
            self.emitter.emit(DownloadEvent::Destination(path));
        }
    }

    pub(crate) fn progress(&self, sample: ProgressSample) {
        if !self.finished {
            self.emitter.emit(DownloadEvent::Progress(sample));
        }
    }

    pub(crate) fn warning(&self, message: String) {
        if !self.finished {
            self.emitter.emit(DownloadEvent::Warning(message));
        }
    }

    pub(crate) fn finish(&mut self, outcome: DownloadOutcome) {
        if self.finished {
            log::debug!("Ignoring second outcome {:?}", outcome);
            return;
        }
        self.finished = true;
        self.emitter.emit(DownloadEvent::Finished(outcome));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(percent: f32) -> ProgressSample {
        ProgressSample {
            percent,
            size: "1.00MiB".to_string(),
            speed: None,
            eta: None,
            fragments: None,
        }
    }

    #[test]
    fn test_gate_stops_after_finish() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut gate = EventGate::new(Arc::new(tx));

        gate.destination(PathBuf::from("/tmp/Clip.mp4"));
        gate.progress(sample(10.0));
        gate.warning("WARNING: slow".to_string());
        gate.finish(DownloadOutcome::Completed);
        gate.progress(sample(20.0));
        gate.warning("late".to_string());
        gate.finish(DownloadOutcome::Stopped);
        drop(gate);

        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        assert_eq!(
            events,
            vec![
                DownloadEvent::Destination(PathBuf::from("/tmp/Clip.mp4")),
                DownloadEvent::Progress(sample(10.0)),
                DownloadEvent::Warning("WARNING: slow".to_string()),
                DownloadEvent::Finished(DownloadOutcome::Completed),
            ]
        );
    }

    #[test]
    fn test_closed_channel_is_ignored() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        let mut gate = EventGate::new(Arc::new(tx));
        gate.progress(sample(1.0));
        gate.finish(DownloadOutcome::Completed);
    }
}
