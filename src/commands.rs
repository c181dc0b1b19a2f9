// Front-end surface: the calls a UI or the CLI makes
//
// Errors are flattened to display strings here; everything below keeps
// `DownloadError`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::config::AppConfig;
use crate::downloader::models::{DownloadEvent, DownloadRequest, FormatDescriptor, NetworkConfig};
use crate::downloader::runner::DownloadHandle;
use crate::downloader::tools::{probe_tool, ToolCommand, ToolInfo, ToolType};
use crate::downloader::traits::DownloaderBackend;
use crate::ytdlp::YtDlpBackend;

/// Subdirectory of the user's Downloads folder used by default
const DOWNLOADS_SUBDIR: &str = "youtube";

/// Validate a chosen save directory, creating it when missing.
///
/// `None` when the candidate is absent, names a file, or cannot be created.
pub fn select_directory(candidate: Option<&Path>) -> Option<PathBuf> {
    let dir = candidate?;
    if dir.is_dir() {
        return Some(dir.to_path_buf());
    }
    if dir.exists() {
        log::warn!("{} is not a directory", dir.display());
        return None;
    }
    match std::fs::create_dir_all(dir) {
        Ok(()) => {
            log::info!("Created {}", dir.display());
            Some(dir.to_path_buf())
        }
        Err(e) => {
            log::warn!("Cannot create {}: {}", dir.display(), e);
            None
        }
    }
}

/// `<Downloads>/youtube`; falls back to the home directory, then the working directory
pub fn get_downloads_path() -> PathBuf {
    dirs::download_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(DOWNLOADS_SUBDIR)
}

/// `Some(proxy)` replaces the configured proxy (an empty string disables it);
/// `None` keeps the startup settings.
fn network_for(config: &AppConfig, proxy: Option<String>) -> NetworkConfig {
    match proxy {
        Some(proxy) => NetworkConfig {
            socket_timeout: config.network.socket_timeout,
            ..NetworkConfig::with_proxy(Some(proxy))
        },
        None => config.network.clone(),
    }
}

pub async fn list_formats(
    backend: &YtDlpBackend,
    url: &str,
    proxy: Option<String>,
) -> Result<Vec<FormatDescriptor>, String> {
    let network = network_for(backend.config(), proxy);
    log::debug!("Listing formats with {}", backend.name());
    backend
        .list_formats(url, &network)
        .await
        .map_err(|e| e.to_string())
}

/// Start a download and return its handle with the event stream.
///
/// The stream ends after the `Finished` event.
pub fn start_download(
    backend: &YtDlpBackend,
    url: &str,
    save_dir: &Path,
    format_id: &str,
    proxy: Option<String>,
) -> (DownloadHandle, mpsc::UnboundedReceiver<DownloadEvent>) {
    let request = DownloadRequest {
        url: url.to_string(),
        output_dir: save_dir.to_path_buf(),
        format_id: format_id.to_string(),
        network: network_for(backend.config(), proxy),
    };
    let (tx, rx) = mpsc::unbounded_channel();
    let handle = backend.start_download(request, Arc::new(tx));
    (handle, rx)
}

/// Version and availability of both tools
pub async fn get_tools_status(config: &AppConfig) -> Vec<ToolInfo> {
    let ffmpeg = ToolCommand::binary(config.tools.ffmpeg.clone());
    let (ytdlp, ffmpeg) = tokio::join!(
        probe_tool(ToolType::YtDlp, &config.tools.ytdlp),
        probe_tool(ToolType::Ffmpeg, &ffmpeg),
    );
    vec![ytdlp, ffmpeg]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::downloader::tools::ToolPaths;

    fn config() -> AppConfig {
        let tools = ToolPaths::bundled(Path::new("/nonexistent/lib/linux"), "linux");
        AppConfig::new(tools).with_network(NetworkConfig {
            proxy: Some("http://startup:8080".to_string()),
            socket_timeout: Some(20),
        })
    }

    fn backend_for(config: AppConfig) -> YtDlpBackend {
        YtDlpBackend::new(Arc::new(config))
    }

    #[test]
    fn test_select_existing_directory() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(select_directory(Some(dir.path())), Some(dir.path().to_path_buf()));
        assert_eq!(select_directory(None), None);
    }

    #[test]
    fn test_select_creates_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("videos").join("2024");
        assert_eq!(select_directory(Some(&nested)), Some(nested.clone()));
        assert!(nested.is_dir());
    }

    #[test]
    fn test_select_rejects_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("notes.txt");
        std::fs::write(&file, b"hello").unwrap();
        assert_eq!(select_directory(Some(&file)), None);
    }

    #[test]
    fn test_downloads_path() {
        assert!(get_downloads_path().ends_with(DOWNLOADS_SUBDIR));
    }

    #[test]
    fn test_proxy_override() {
        let config = config();

        let kept = network_for(&config, None);
        assert_eq!(kept.proxy.as_deref(), Some("http://startup:8080"));

        let replaced = network_for(&config, Some("socks5://127.0.0.1:1080".to_string()));
        assert_eq!(replaced.proxy.as_deref(), Some("socks5://127.0.0.1:1080"));
        assert_eq!(replaced.socket_timeout, Some(20));

        let disabled = network_for(&config, Some(String::new()));
        assert_eq!(disabled.proxy, None);
    }

    #[tokio::test]
    async fn test_tools_status_when_missing() {
        let status = get_tools_status(&config()).await;
        assert_eq!(status.len(), 2);
        assert_eq!(status[0].tool_type, ToolType::YtDlp);
        assert_eq!(status[1].tool_type, ToolType::Ffmpeg);
        assert!(status.iter().all(|t| !t.is_available));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_start_download_spawn_failure() {
        use crate::downloader::models::DownloadOutcome;

        let dir = tempfile::tempdir().unwrap();
        let backend = backend_for(config());
        let (handle, mut events) =
            start_download(&backend, "https://youtu.be/abc", dir.path(), "18", None);

        let outcome = handle.wait().await;
        assert!(matches!(outcome, DownloadOutcome::Failed(_)));
        assert_eq!(events.recv().await, Some(DownloadEvent::Finished(outcome)));
        assert_eq!(events.recv().await, None);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_list_formats_uses_proxy_override() {
        // reports the proxy it was given at the end of its only row
        let script = r#"while [ "$#" -gt 0 ]; do
if [ "$1" = "--proxy" ]; then proxy="$2"; fi
shift
done
echo '[info] Available formats for abc:'
echo "18  mp4   640x360     25  |    1.00MiB  500k https | avc1.42001E $proxy""#;
        let args = vec!["-c".to_string(), script.to_string(), "yt-dlp".to_string()];
        let backend = backend_for(
            AppConfig::new(ToolPaths {
                ytdlp: ToolCommand::with_args("/bin/sh", args),
                ffmpeg: PathBuf::from("/usr/bin/ffmpeg"),
            })
            .with_network(NetworkConfig::with_proxy(Some("http://startup:8080".to_string()))),
        );

        let formats = list_formats(&backend, "https://youtu.be/abc", None)
            .await
            .unwrap();
        assert_eq!(formats.len(), 1);
        assert!(formats[0].raw_line.ends_with("http://startup:8080"));

        let formats = list_formats(
            &backend,
            "https://youtu.be/abc",
            Some("socks5://127.0.0.1:1080".to_string()),
        )
        .await
        .unwrap();
        assert!(formats[0].raw_line.ends_with("socks5://127.0.0.1:1080"));
    }
}
