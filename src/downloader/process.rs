// Child process supervision
//
// Every tool invocation runs in its own process group so that ffmpeg, which
// yt-dlp starts as a child for merging, goes down together with yt-dlp.

use std::process::{ExitStatus, Stdio};

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command as TokioCommand};
use tokio::sync::mpsc;

use super::errors::DownloadError;
use super::tools::ToolCommand;

/// One line of tool output, tagged with the stream it came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputLine {
    Stdout(String),
    Stderr(String),
}

pub struct SupervisedProcess {
    child: Child,
    pid: Option<u32>,
    lines: mpsc::UnboundedReceiver<OutputLine>,
}

impl SupervisedProcess {
    pub fn spawn(tool: &ToolCommand, args: &[String]) -> Result<Self, DownloadError> {
        let mut command = std::process::Command::new(&tool.program);
        command
            .args(&tool.base_args)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            command.process_group(0);
        }
        #[cfg(windows)]
        {
            use std::os::windows::process::CommandExt;
            const CREATE_NO_WINDOW: u32 = 0x0800_0000;
            command.creation_flags(CREATE_NO_WINDOW);
        }

        log::debug!("Spawning: {} {}", tool.display(), args.join(" "));

        let mut command = TokioCommand::from(command);
        command.kill_on_drop(true);
        let mut child = command
            .spawn()
            .map_err(|e| DownloadError::spawn(&tool.name(), &e))?;

        let name = tool.name();
        let capture_error =
            |stream: &str| DownloadError::Io(format!("Failed to capture {} from {}", stream, name));
        let stdout = child.stdout.take().ok_or_else(|| capture_error("stdout"))?;
        let stderr = child.stderr.take().ok_or_else(|| capture_error("stderr"))?;

        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(forward_lines(stdout, tx.clone(), OutputLine::Stdout));
        tokio::spawn(forward_lines(stderr, tx, OutputLine::Stderr));

        Ok(Self {
            pid: child.id(),
            child,
            lines: rx,
        })
    }

    /// Next output line in arrival order; `None` once both pipes are closed.
    pub async fn next_line(&mut self) -> Option<OutputLine> {
        self.lines.recv().await
    }

    pub async fn wait(&mut self) -> Result<ExitStatus, DownloadError> {
        Ok(self.child.wait().await?)
    }

    /// Kill the child and everything it started, then reap it.
    ///
    /// The group is signalled even when the leader already exited: a merging
    /// ffmpeg can outlive yt-dlp.
    pub async fn kill_tree(&mut self) {
        if let Some(pid) = self.pid {
            log::info!("Killing process tree {}", pid);
            kill_process_tree(pid).await;
        }
        let _ = self.child.kill().await;
    }
}

/// Split on both `\n` and `\r`: without `--newline` yt-dlp redraws progress
/// in place with carriage returns.
async fn forward_lines<R>(
    reader: R,
    tx: mpsc::UnboundedSender<OutputLine>,
    wrap: fn(String) -> OutputLine,
) where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                let text = String::from_utf8_lossy(&buf);
                for segment in text.split(['\r', '\n']).filter(|s| !s.trim().is_empty()) {
                    if tx.send(wrap(segment.to_string())).is_err() {
                        return;
                    }
                }
            }
            Err(e) => {
                log::debug!("Stopped reading tool output: {}", e);
                break;
            }
        }
    }
}

#[cfg(unix)]
async fn kill_process_tree(pid: u32) {
    // The child was spawned as a group leader, so its pid is the group id.
    let result = unsafe { libc::killpg(pid as libc::pid_t, libc::SIGKILL) };
    if result != 0 {
        log::debug!(
            "killpg({}) failed: {}",
            pid,
            std::io::Error::last_os_error()
        );
    }
}

#[cfg(windows)]
async fn kill_process_tree(pid: u32) {
    let result = TokioCommand::new("taskkill")
        .args(["/F", "/T", "/PID", &pid.to_string()])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await;
    if let Err(e) = result {
        log::debug!("taskkill for {} failed: {}", pid, e);
    }
}

#[cfg(not(any(unix, windows)))]
async fn kill_process_tree(_pid: u32) {}
