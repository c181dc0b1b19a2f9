// yt-dlp invocations: format listing, metadata lookup, transfer arguments

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::config::AppConfig;
use crate::downloader::diagnostics::StderrPolicy;
use crate::downloader::errors::{DownloadError, DownloadResult};
use crate::downloader::format_list::parse_format_listing;
use crate::downloader::models::{DownloadRequest, FormatDescriptor, NetworkConfig, ResolvedMetadata};
use crate::downloader::runner::{self, DownloadHandle};
use crate::downloader::traits::{DownloaderBackend, ProgressEmitter};
use crate::downloader::utils::{self, run_to_completion};

/// Used when yt-dlp reports a filename without an extension
const DEFAULT_EXTENSION: &str = "mp4";

/// Title used when sanitizing leaves nothing
const FALLBACK_TITLE: &str = "video";

/// Network flags go first, ahead of the mode flags
fn network_args(network: &NetworkConfig) -> Vec<String> {
    let mut args = utils::get_proxy_args(network);
    args.extend(utils::get_timeout_args(network));
    args
}

pub fn list_formats_args(url: &str, network: &NetworkConfig) -> Vec<String> {
    let mut args = network_args(network);
    args.push("-F".to_string());
    args.push(url.to_string());
    args
}

pub fn metadata_args(request: &DownloadRequest) -> Vec<String> {
    let mut args = network_args(&request.network);
    args.extend([
        "--get-title".to_string(),
        "--get-filename".to_string(),
        "-f".to_string(),
        request.format_id.clone(),
        request.url.clone(),
    ]);
    args
}

/// Arguments for the transfer phase.
///
/// The chosen format is always paired with the best audio track and merged by
/// ffmpeg into the container the metadata phase reported.
pub fn transfer_args(
    request: &DownloadRequest,
    extension: &str,
    output_path: &Path,
    ffmpeg: &Path,
) -> Vec<String> {
    let mut args = network_args(&request.network);
    args.extend([
        "-f".to_string(),
        format!("{}+bestaudio", request.format_id),
        "--merge-output-format".to_string(),
        extension.to_string(),
        "-o".to_string(),
        output_path.to_string_lossy().to_string(),
        "--ffmpeg-location".to_string(),
        ffmpeg.to_string_lossy().to_string(),
        // one progress line per update instead of carriage-return redraws
        "--newline".to_string(),
        request.url.clone(),
    ]);
    args
}

/// List the formats a URL offers, in yt-dlp's order
pub async fn list_formats(
    config: &AppConfig,
    url: &str,
    network: &NetworkConfig,
) -> DownloadResult<Vec<FormatDescriptor>> {
    log::info!("Fetching formats for {}", url);
    let output = run_to_completion(
        &config.tools.ytdlp,
        &list_formats_args(url, network),
        config.stderr_policy,
        config.metadata_timeout_secs,
        &CancellationToken::new(),
    )
    .await?;

    if !output.status.success() {
        return Err(DownloadError::ToolReportedFailure(
            output.failure_message("Failed to fetch formats"),
        ));
    }

    let formats = parse_format_listing(&output.stdout)?;
    log::info!("Found {} formats", formats.len());
    Ok(formats)
}

/// Ask yt-dlp for the title and target filename of the chosen format.
///
/// Stderr never fails this lookup; its lines come back as warnings next to the
/// metadata. Only a non-zero exit, the timeout or cancellation do.
pub async fn fetch_metadata(
    config: &AppConfig,
    request: &DownloadRequest,
    cancel: &CancellationToken,
) -> DownloadResult<(ResolvedMetadata, Vec<String>)> {
    let output = run_to_completion(
        &config.tools.ytdlp,
        &metadata_args(request),
        StderrPolicy::Collect,
        config.metadata_timeout_secs,
        cancel,
    )
    .await?;

    if !output.status.success() {
        return Err(DownloadError::ToolReportedFailure(
            output.failure_message("Failed to get video info"),
        ));
    }

    let metadata = parse_metadata(&output.stdout)?;
    log::debug!("Resolved title {:?}, extension {}", metadata.title, metadata.extension);
    Ok((metadata, output.warnings))
}

/// First line is the title, second the filename yt-dlp would use
pub fn parse_metadata(stdout: &str) -> DownloadResult<ResolvedMetadata> {
    let mut lines = stdout.lines().map(str::trim).filter(|l| !l.is_empty());

    let raw_title = lines
        .next()
        .ok_or_else(|| DownloadError::ParseFailure("No video title reported".to_string()))?;
    let mut title = utils::sanitize_filename(raw_title);
    if title.is_empty() {
        title = FALLBACK_TITLE.to_string();
    }

    let extension = lines
        .next()
        .and_then(|filename| filename.rsplit_once('.'))
        .map(|(_, ext)| ext.trim())
        .filter(|ext| !ext.is_empty() && !ext.contains(['/', '\\']))
        .unwrap_or(DEFAULT_EXTENSION)
        .to_string();

    Ok(ResolvedMetadata { title, extension })
}

/// The yt-dlp backed lister and runner
pub struct YtDlpBackend {
    config: Arc<AppConfig>,
}

impl YtDlpBackend {
    pub fn new(config: Arc<AppConfig>) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }
}

#[async_trait]
impl DownloaderBackend for YtDlpBackend {
    fn name(&self) -> &'static str {
        "yt-dlp"
    }

    async fn list_formats(
        &self,
        url: &str,
        network: &NetworkConfig,
    ) -> Result<Vec<FormatDescriptor>, DownloadError> {
        list_formats(&self.config, url, network).await
    }

    fn start_download(
        &self,
        request: DownloadRequest,
        emitter: Arc<dyn ProgressEmitter>,
    ) -> DownloadHandle {
        runner::start_download(Arc::clone(&self.config), request, emitter)
    }
}
