// Helper functions shared by the lister and the runner

use std::process::ExitStatus;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use super::diagnostics::StderrPolicy;
use super::errors::DownloadError;
use super::models::NetworkConfig;
use super::process::{OutputLine, SupervisedProcess};
use super::tools::ToolCommand;

/// Characters rejected in file names by at least one common filesystem
const ILLEGAL_FILENAME_CHARS: [char; 9] = ['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Everything a short-lived invocation printed
#[derive(Debug)]
pub struct CollectedOutput {
    pub stdout: String,
    /// Stderr lines the policy let through
    pub warnings: Vec<String>,
    pub status: ExitStatus,
}

impl CollectedOutput {
    /// Failure text for a non-zero exit: last warning if any, else the exit code
    pub fn failure_message(&self, context: &str) -> String {
        match (self.warnings.last(), self.status.code()) {
            (Some(last), _) => format!("{}: {}", context, last),
            (None, Some(code)) => format!("{} (exit code {})", context, code),
            (None, None) => format!("{} (terminated by signal)", context),
        }
    }
}

/// Run a tool to completion, collecting stdout.
///
/// A fatal stderr line, the timeout, or cancellation kill the whole process
/// tree before returning.
pub async fn run_to_completion(
    tool: &ToolCommand,
    args: &[String],
    policy: StderrPolicy,
    timeout_secs: u64,
    cancel: &CancellationToken,
) -> Result<CollectedOutput, DownloadError> {
    let mut process = SupervisedProcess::spawn(tool, args)?;

    let deadline = tokio::time::sleep(Duration::from_secs(timeout_secs));
    tokio::pin!(deadline);

    let mut stdout = String::new();
    let mut warnings = Vec::new();

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                process.kill_tree().await;
                return Err(DownloadError::UserCancelled);
            }
            _ = &mut deadline => {
                log::warn!("{} timed out after {}s", tool.name(), timeout_secs);
                process.kill_tree().await;
                return Err(DownloadError::Timeout(timeout_secs));
            }
            line = process.next_line() => match line {
                Some(OutputLine::Stdout(line)) => {
                    stdout.push_str(&line);
                    stdout.push('\n');
                }
                Some(OutputLine::Stderr(line)) => {
                    log::warn!("[{}] {}", tool.name(), line);
                    if policy.is_fatal(&line) {
                        process.kill_tree().await;
                        return Err(DownloadError::ToolReportedFailure(line));
                    }
                    warnings.push(line);
                }
                None => break,
            }
        }
    }

    let status = process.wait().await?;
    Ok(CollectedOutput {
        stdout,
        warnings,
        status,
    })
}

/// Build proxy arguments for yt-dlp
pub fn get_proxy_args(config: &NetworkConfig) -> Vec<String> {
    let mut args = Vec::new();

    if let Some(proxy) = &config.proxy {
        args.push("--proxy".to_string());
        args.push(proxy.clone());
    }

    args
}

/// Build timeout arguments for yt-dlp
pub fn get_timeout_args(config: &NetworkConfig) -> Vec<String> {
    let mut args = Vec::new();

    if let Some(timeout) = config.socket_timeout {
        args.push("--socket-timeout".to_string());
        args.push(timeout.to_string());
    }

    args
}

/// Strip `< > : " / \ | ? *` and surrounding whitespace
pub fn sanitize_filename(title: &str) -> String {
    title
        .chars()
        .filter(|c| !ILLEGAL_FILENAME_CHARS.contains(c))
        .collect::<String>()
        .trim()
        .to_string()
}
