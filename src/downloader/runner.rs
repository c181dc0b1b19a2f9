// Download runner: metadata phase, then the supervised transfer
//
// The spawned supervisor task is the only place that emits events for an
// attempt, so progress order follows stdout and the terminal event is last.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::errors::{DownloadError, DownloadResult};
use super::models::{DownloadOutcome, DownloadRequest};
use super::process::{OutputLine, SupervisedProcess};
use super::progress::parse_progress_line;
use super::traits::{EventGate, ProgressEmitter};
use crate::config::AppConfig;
use crate::ytdlp;

/// Caller's side of a running download
pub struct DownloadHandle {
    cancel: CancellationToken,
    task: JoinHandle<DownloadOutcome>,
}

impl DownloadHandle {
    /// Request a stop; the process tree is killed and the outcome becomes `Stopped`.
    /// Has no effect once the attempt finished.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    /// Token that stops this download when cancelled, e.g. from a signal handler
    pub fn stop_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Wait for the terminal outcome (the same value sent as the `Finished` event)
    pub async fn wait(self) -> DownloadOutcome {
        match self.task.await {
            Ok(outcome) => outcome,
            Err(e) => DownloadOutcome::Failed(format!("Download task failed: {}", e)),
        }
    }
}

/// Start a download on the current tokio runtime and return immediately.
pub fn start_download(
    config: Arc<AppConfig>,
    request: DownloadRequest,
    emitter: Arc<dyn ProgressEmitter>,
) -> DownloadHandle {
    let cancel = CancellationToken::new();
    let token = cancel.clone();

    let task = tokio::spawn(async move {
        let mut gate = EventGate::new(emitter);
        log::info!("Starting download of {} (format {})", request.url, request.format_id);

        let outcome = match run(&config, &request, &gate, &token).await {
            Ok(()) => DownloadOutcome::Completed,
            Err(e) if e.is_cancelled() => DownloadOutcome::Stopped,
            Err(e) => DownloadOutcome::Failed(e.to_string()),
        };

        match &outcome {
            DownloadOutcome::Failed(message) => log::warn!("Download failed: {}", message),
            other => log::info!("Download finished: {:?}", other),
        }
        gate.finish(outcome.clone());
        outcome
    });

    DownloadHandle { cancel, task }
}

async fn run(
    config: &AppConfig,
    request: &DownloadRequest,
    gate: &EventGate,
    cancel: &CancellationToken,
) -> DownloadResult<()> {
    let (metadata, warnings) = ytdlp::fetch_metadata(config, request, cancel).await?;
    for warning in warnings {
        gate.warning(warning);
    }
    let output_path = request.output_dir.join(metadata.file_name());
    log::info!("Saving to {}", output_path.display());
    gate.destination(output_path.clone());

    let args = ytdlp::transfer_args(
        request,
        &metadata.extension,
        &output_path,
        &config.tools.ffmpeg,
    );
    let mut process = SupervisedProcess::spawn(&config.tools.ytdlp, &args)?;
    let tool = config.tools.ytdlp.name();

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                process.kill_tree().await;
                return Err(DownloadError::UserCancelled);
            }
            line = process.next_line() => match line {
                Some(OutputLine::Stdout(line)) => match parse_progress_line(&line) {
                    Some(sample) => gate.progress(sample),
                    None => log::debug!("[{}] {}", tool, line),
                },
                Some(OutputLine::Stderr(line)) => {
                    log::warn!("[{}] {}", tool, line);
                    if config.stderr_policy.is_fatal(&line) {
                        process.kill_tree().await;
                        return Err(DownloadError::ToolReportedFailure(line));
                    }
                    gate.warning(line);
                }
                None => break,
            }
        }
    }

    let status = tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            process.kill_tree().await;
            return Err(DownloadError::UserCancelled);
        }
        status = process.wait() => status?,
    };

    if status.success() {
        return Ok(());
    }
    Err(DownloadError::ToolReportedFailure(match status.code() {
        Some(code) => format!("Download process exited with code {}", code),
        None => "Download process was terminated by a signal".to_string(),
    }))
}
