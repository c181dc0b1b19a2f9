use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command as TokioCommand;
use tokio::time::timeout;

/// Set to "development" to load tools from the crate's own `lib/` tree
pub const ENV_DEPLOYMENT: &str = "VIDEO_DOWNLOADER_ENV";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ToolType {
    YtDlp,
    Ffmpeg,
}

impl ToolType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolType::YtDlp => "yt-dlp",
            ToolType::Ffmpeg => "ffmpeg",
        }
    }

    /// Executable file name on the given OS (`std::env::consts::OS` values)
    pub fn executable_name(&self, os: &str) -> String {
        if os == "windows" {
            format!("{}.exe", self.as_str())
        } else {
            self.as_str().to_string()
        }
    }

    fn version_arg(&self) -> &'static str {
        match self {
            ToolType::YtDlp => "--version",
            ToolType::Ffmpeg => "-version", // ffmpeg uses a single dash
        }
    }
}

/// Directory name under `lib/` for an OS; matches the layout of the bundled binaries
pub fn platform_dir(os: &str) -> &str {
    match os {
        "windows" => "win32",
        "macos" => "darwin",
        other => other,
    }
}

/// Where the bundled `lib/` tree lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Deployment {
    /// Running from a checkout; `lib/` sits next to Cargo.toml
    Development { root: PathBuf },
    /// Installed build; `lib/` sits in the resources directory
    Packaged { resources: PathBuf },
}

impl Deployment {
    pub fn detect() -> Self {
        match std::env::var(ENV_DEPLOYMENT) {
            Ok(value) if value.eq_ignore_ascii_case("development") => Self::Development {
                root: PathBuf::from(env!("CARGO_MANIFEST_DIR")),
            },
            _ => Self::Packaged {
                resources: resources_dir(),
            },
        }
    }

    pub fn lib_dir(&self, os: &str) -> PathBuf {
        let base = match self {
            Self::Development { root } => root,
            Self::Packaged { resources } => resources,
        };
        base.join("lib").join(platform_dir(os))
    }
}

/// `Contents/Resources` inside a macOS bundle, `resources/` next to the binary elsewhere
fn resources_dir() -> PathBuf {
    let exe_dir = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."));

    if exe_dir.ends_with("Contents/MacOS") {
        if let Some(contents) = exe_dir.parent() {
            return contents.join("Resources");
        }
    }
    exe_dir.join("resources")
}

/// Program plus leading arguments, so yt-dlp can also run as `python3 -m yt_dlp`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    pub program: PathBuf,
    pub base_args: Vec<String>,
}

impl ToolCommand {
    pub fn binary(path: impl Into<PathBuf>) -> Self {
        Self {
            program: path.into(),
            base_args: Vec::new(),
        }
    }

    pub fn python_module(interpreter: impl Into<PathBuf>, module: &str) -> Self {
        Self {
            program: interpreter.into(),
            base_args: vec!["-m".to_string(), module.to_string()],
        }
    }

    pub fn with_args(program: impl Into<PathBuf>, base_args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            base_args,
        }
    }

    /// Short name for messages ("yt-dlp", "yt_dlp" for a module)
    pub fn name(&self) -> String {
        if let [flag, module] = self.base_args.as_slice() {
            if flag == "-m" {
                return module.clone();
            }
        }
        self.program
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| self.program.display().to_string())
    }

    /// Full command line prefix for logs
    pub fn display(&self) -> String {
        let mut parts = vec![self.program.display().to_string()];
        parts.extend(self.base_args.iter().cloned());
        parts.join(" ")
    }
}

/// Resolved locations of both external tools. Read-only after startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolPaths {
    pub ytdlp: ToolCommand,
    pub ffmpeg: PathBuf,
}

impl ToolPaths {
    /// Bundled layout only, no fallbacks: `<lib_dir>/yt-dlp[.exe]`, `<lib_dir>/ffmpeg[.exe]`
    pub fn bundled(lib_dir: &Path, os: &str) -> Self {
        Self {
            ytdlp: ToolCommand::binary(lib_dir.join(ToolType::YtDlp.executable_name(os))),
            ffmpeg: lib_dir.join(ToolType::Ffmpeg.executable_name(os)),
        }
    }

    /// Bundled binaries first, then common install locations, then PATH.
    pub fn resolve(deployment: &Deployment, lib_override: Option<&Path>) -> Self {
        let os = std::env::consts::OS;
        let lib_dir = lib_override
            .map(Path::to_path_buf)
            .unwrap_or_else(|| deployment.lib_dir(os));
        log::debug!("Looking for bundled tools in {}", lib_dir.display());

        Self {
            ytdlp: ToolCommand::binary(locate(ToolType::YtDlp, &lib_dir, os)),
            ffmpeg: locate(ToolType::Ffmpeg, &lib_dir, os),
        }
    }
}

fn locate(tool: ToolType, lib_dir: &Path, os: &str) -> PathBuf {
    let bundled = lib_dir.join(tool.executable_name(os));
    if bundled.is_file() {
        return bundled;
    }

    // Common paths where the tools might be installed
    let common_dirs: &[&str] = if os == "windows" {
        &[]
    } else {
        &["/opt/homebrew/bin", "/usr/local/bin", "/usr/bin"]
    };
    for dir in common_dirs {
        let candidate = Path::new(dir).join(tool.executable_name(os));
        if candidate.is_file() {
            log::info!("Using system {} at {}", tool.as_str(), candidate.display());
            return candidate;
        }
    }

    if let Ok(found) = which::which(tool.as_str()) {
        log::info!("Using {} from PATH: {}", tool.as_str(), found.display());
        return found;
    }

    log::warn!(
        "{} not found; expected it at {}",
        tool.as_str(),
        bundled.display()
    );
    bundled
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInfo {
    pub name: String,
    pub tool_type: ToolType,
    pub version: Option<String>,
    pub path: String,
    pub is_available: bool,
}

/// Run the tool's version flag and report what was found
pub async fn probe_tool(tool_type: ToolType, command: &ToolCommand) -> ToolInfo {
    let version = get_version(tool_type, command).await;
    ToolInfo {
        name: tool_type.as_str().to_string(),
        tool_type,
        is_available: version.is_some(),
        version,
        path: command.display(),
    }
}

async fn get_version(tool_type: ToolType, command: &ToolCommand) -> Option<String> {
    let mut cmd = TokioCommand::new(&command.program);
    cmd.args(&command.base_args)
        .arg(tool_type.version_arg())
        .stdin(Stdio::null())
        .kill_on_drop(true);

    match timeout(Duration::from_secs(10), cmd.output()).await {
        Ok(Ok(out)) if out.status.success() => {
            parse_version(tool_type, &String::from_utf8_lossy(&out.stdout))
        }
        Ok(Ok(out)) => {
            log::debug!("{} version check exited with {}", tool_type.as_str(), out.status);
            None
        }
        Ok(Err(e)) => {
            log::debug!("{} version check failed: {}", tool_type.as_str(), e);
            None
        }
        Err(_) => None,
    }
}

/// yt-dlp prints "2024.08.06"; ffmpeg prints "ffmpeg version 6.1.1 Copyright ..."
fn parse_version(tool_type: ToolType, stdout: &str) -> Option<String> {
    let first = stdout.lines().next()?.trim();
    if first.is_empty() {
        return None;
    }
    let version = match tool_type {
        ToolType::YtDlp => first,
        ToolType::Ffmpeg => first
            .strip_prefix("ffmpeg version ")
            .and_then(|rest| rest.split_whitespace().next())
            .unwrap_or(first),
    };
    Some(version.to_string())
}
