// Common data models for the lister and runner

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Placeholder for columns the listing did not provide
pub const NOT_AVAILABLE: &str = "N/A";

/// One selectable quality/codec option from `yt-dlp -F`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatDescriptor {
    /// Format ID (e.g., "137", "140")
    pub id: String,
    /// Container extension (mp4, webm, m4a)
    pub container: String,
    /// Resolution column, or "audio only"
    pub resolution: String,
    /// Frame rate column or "N/A"
    pub frame_rate: String,
    /// Size with unit (e.g., "2.95MiB") or "N/A"
    pub file_size: String,
    /// Video codec (avc1, vp09, av01) or "N/A"
    pub video_codec: String,
    /// The trimmed listing line this was parsed from
    pub raw_line: String,
}

impl FormatDescriptor {
    pub fn is_audio_only(&self) -> bool {
        self.resolution == "audio only"
    }
}

/// Fragment counter printed for HLS/DASH downloads, e.g. "(frag 29/454)"
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FragmentCounter {
    pub current: u32,
    pub total: u32,
}

/// Point-in-time snapshot of transfer progress
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressSample {
    /// 0.0 ..= 100.0
    pub percent: f32,
    /// Total (or estimated total) size with unit, e.g. "10.00MiB"
    pub size: String,
    pub speed: Option<String>,
    pub eta: Option<String>,
    pub fragments: Option<FragmentCounter>,
}

/// Terminal result of a download attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "message", rename_all = "snake_case")]
pub enum DownloadOutcome {
    Completed,
    Failed(String),
    Stopped,
}

/// Everything pushed to a listener during one download
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum DownloadEvent {
    /// Full path of the file being written, sent once before the transfer
    Destination(PathBuf),
    Progress(ProgressSample),
    /// Stderr text that did not end the download
    Warning(String),
    /// Always the last event of an attempt
    Finished(DownloadOutcome),
}

/// Network configuration passed explicitly to every invocation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NetworkConfig {
    /// HTTP/SOCKS proxy URL (e.g., "socks5://127.0.0.1:1080")
    pub proxy: Option<String>,

    /// yt-dlp --socket-timeout in seconds
    pub socket_timeout: Option<u32>,
}

impl NetworkConfig {
    pub fn with_proxy(proxy: Option<String>) -> Self {
        Self {
            // empty string from a form field means "no proxy"
            proxy: proxy.filter(|p| !p.trim().is_empty()),
            socket_timeout: None,
        }
    }
}

/// One user-initiated download
#[derive(Debug, Clone)]
pub struct DownloadRequest {
    pub url: String,
    pub output_dir: PathBuf,
    pub format_id: String,
    pub network: NetworkConfig,
}

/// Title and container resolved before the transfer starts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedMetadata {
    pub title: String,
    pub extension: String,
}

impl ResolvedMetadata {
    pub fn file_name(&self) -> String {
        format!("{}.{}", self.title, self.extension)
    }
}
