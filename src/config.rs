// Startup configuration, resolved once and shared read-only

use std::path::{Path, PathBuf};

use crate::downloader::diagnostics::StderrPolicy;
use crate::downloader::models::NetworkConfig;
use crate::downloader::tools::{Deployment, ToolCommand, ToolPaths};

/// Default limit for the listing and metadata phases
pub const DEFAULT_METADATA_TIMEOUT_SECS: u64 = 120;

/// Checked in order; the first non-empty value wins
const PROXY_ENV_VARS: [&str; 4] = [
    "VIDEO_DOWNLOADER_PROXY",
    "HTTPS_PROXY",
    "HTTP_PROXY",
    "ALL_PROXY",
];

/// Path to a Python interpreter; when set yt-dlp runs as `<python> -m yt_dlp`
pub const ENV_YTDLP_PYTHON: &str = "YTDLP_PYTHON";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub tools: ToolPaths,
    /// Used when a call does not bring its own network settings
    pub network: NetworkConfig,
    pub stderr_policy: StderrPolicy,
    pub metadata_timeout_secs: u64,
}

impl AppConfig {
    pub fn new(tools: ToolPaths) -> Self {
        Self {
            tools,
            network: NetworkConfig::default(),
            stderr_policy: StderrPolicy::default(),
            metadata_timeout_secs: DEFAULT_METADATA_TIMEOUT_SECS,
        }
    }

    /// Resolve tools for the detected deployment and read proxy settings from the environment.
    pub fn from_env(tools_dir: Option<&Path>) -> Self {
        let deployment = Deployment::detect();
        log::debug!("Deployment: {:?}", deployment);

        let mut tools = ToolPaths::resolve(&deployment, tools_dir);
        if let Some(python) = non_empty_var(ENV_YTDLP_PYTHON) {
            log::info!("Running yt-dlp as a module of {}", python);
            tools.ytdlp = ToolCommand::python_module(PathBuf::from(python), "yt_dlp");
        }

        Self::new(tools).with_network(NetworkConfig::with_proxy(proxy_from_env()))
    }

    pub fn with_network(mut self, network: NetworkConfig) -> Self {
        self.network = network;
        self
    }

    pub fn with_stderr_policy(mut self, policy: StderrPolicy) -> Self {
        self.stderr_policy = policy;
        self
    }

    pub fn with_metadata_timeout(mut self, secs: u64) -> Self {
        self.metadata_timeout_secs = secs;
        self
    }
}

/// Proxy URL from the environment, if any of the known variables is set
pub fn proxy_from_env() -> Option<String> {
    proxy_from(non_empty_var)
}

fn proxy_from(lookup: impl Fn(&str) -> Option<String>) -> Option<String> {
    PROXY_ENV_VARS.iter().find_map(|key| {
        let value = lookup(*key)?;
        log::debug!("Proxy from {}: {}", key, value);
        Some(value)
    })
}

fn non_empty_var(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
