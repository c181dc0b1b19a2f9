// Error types for the format lister and download runner

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DownloadError {
    /// The OS could not start the process
    #[error("Failed to start {tool}: {message}")]
    SpawnFailure { tool: String, message: String },

    /// Non-zero exit or output on stderr
    #[error("{0}")]
    ToolReportedFailure(String),

    /// Tool output did not have the expected marker/shape
    #[error("{0}")]
    ParseFailure(String),

    /// Listing or metadata phase took longer than allowed
    #[error("Timed out after {0}s")]
    Timeout(u64),

    /// Stop was requested by the user
    #[error("Download stopped")]
    UserCancelled,

    /// Reading a pipe or waiting on the child failed
    #[error("I/O error: {0}")]
    Io(String),
}

impl DownloadError {
    pub fn spawn(tool: &str, err: &std::io::Error) -> Self {
        Self::SpawnFailure {
            tool: tool.to_string(),
            message: err.to_string(),
        }
    }

    /// Whether the caller asked for this rather than the tool failing
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::UserCancelled)
    }
}

impl From<std::io::Error> for DownloadError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

pub type DownloadResult<T> = Result<T, DownloadError>;
