// Stderr classification and failure diagnostics
//
// Two separate questions are answered here:
// - does a stderr line end the current run (StderrPolicy)
// - what does a failure message most likely mean (BlockingReason), used for
//   hints next to the verbatim error text

use serde::{Deserialize, Serialize};

/// How stderr output of the extraction tool is treated.
///
/// yt-dlp writes warnings and some informational lines to stderr, so `Fatal`
/// fails downloads that would have succeeded. It stays the default because
/// existing front-ends rely on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StderrPolicy {
    /// Any non-empty stderr line fails the run and kills the process tree
    #[default]
    Fatal,
    /// Only lines starting with "ERROR:" are fatal; the rest become warnings
    ErrorLinesOnly,
    /// Nothing on stderr is fatal; every line becomes a warning.
    /// The title lookup runs this way and fails on its exit code alone.
    #[serde(skip)]
    Collect,
}

impl StderrPolicy {
    pub fn is_fatal(&self, line: &str) -> bool {
        let line = line.trim();
        if line.is_empty() {
            return false;
        }
        match self {
            Self::Fatal => true,
            Self::ErrorLinesOnly => line.starts_with("ERROR:"),
            Self::Collect => false,
        }
    }
}

impl std::str::FromStr for StderrPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fatal" => Ok(Self::Fatal),
            "error-lines" | "error-lines-only" => Ok(Self::ErrorLinesOnly),
            other => Err(format!("unknown stderr policy: {}", other)),
        }
    }
}

/// Likely reason behind a failed listing or download
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlockingReason {
    /// HTTP 403 Forbidden - general access denied
    Http403Forbidden,
    /// Age-restricted content requiring login
    AgeRestricted,
    /// Geographic restriction
    GeoBlocked,
    /// Network timeout or unreachable proxy
    NetworkTimeout,
    /// Rate limiting (429 or similar)
    RateLimited,
    /// Bot detection triggered
    BotDetection,
    /// Private video requiring authorization
    PrivateVideo,
    /// Video deleted or unavailable
    VideoUnavailable,
    /// DRM-protected content, cannot be downloaded at all
    DrmProtected,
    /// The chosen format id does not exist for this URL
    FormatUnavailable,
    /// ffmpeg missing or failed while merging
    MergeFailed,
    /// URL not handled by any extractor
    UnsupportedUrl,
}

impl BlockingReason {
    /// Check if a proxy might help
    pub fn proxy_might_help(&self) -> bool {
        matches!(
            self,
            Self::Http403Forbidden
                | Self::GeoBlocked
                | Self::NetworkTimeout
                | Self::RateLimited
                | Self::BotDetection
        )
    }

    /// Check if this is a permanent restriction (no workaround)
    pub fn is_permanent(&self) -> bool {
        matches!(
            self,
            Self::DrmProtected | Self::VideoUnavailable | Self::UnsupportedUrl
        )
    }

    /// Human-readable description
    pub fn description(&self) -> &'static str {
        match self {
            Self::Http403Forbidden => "Access denied (HTTP 403)",
            Self::AgeRestricted => "Age-restricted content",
            Self::GeoBlocked => "Geographic restriction",
            Self::NetworkTimeout => "Network timeout",
            Self::RateLimited => "Rate limited by the site",
            Self::BotDetection => "Bot detection triggered",
            Self::PrivateVideo => "Private video",
            Self::VideoUnavailable => "Video unavailable",
            Self::DrmProtected => "DRM-protected content",
            Self::FormatUnavailable => "Requested format is not available",
            Self::MergeFailed => "Merging audio and video failed (check ffmpeg)",
            Self::UnsupportedUrl => "Unsupported URL",
        }
    }

    /// Short follow-up for the user, if there is a useful one
    pub fn hint(&self, proxy: Option<&str>) -> Option<String> {
        if self.is_permanent() {
            return None;
        }
        match (self, proxy) {
            (Self::FormatUnavailable, _) => {
                Some("List formats again and pick another id".to_string())
            }
            (Self::MergeFailed, _) => Some("Make sure the bundled ffmpeg is present".to_string()),
            (Self::AgeRestricted | Self::PrivateVideo, _) => {
                Some("The video needs a signed-in account".to_string())
            }
            (reason, Some(p)) if reason.proxy_might_help() => {
                Some(format!("Proxy in use: {}; try another one or go direct", p))
            }
            (reason, None) if reason.proxy_might_help() => {
                Some("Try again through a proxy".to_string())
            }
            _ => None,
        }
    }
}

/// Analyze error text and return the most specific blocking reason
pub fn diagnose_error(error: &str) -> Option<BlockingReason> {
    let lower = error.to_lowercase();
    let has = |patterns: &[&str]| patterns.iter().any(|p| lower.contains(p));

    // Check patterns in order of specificity
    if has(&["drm", "widevine", "playready", "fairplay", "encrypted media"]) {
        return Some(BlockingReason::DrmProtected);
    }
    if has(&["requested format is not available", "format not available"]) {
        return Some(BlockingReason::FormatUnavailable);
    }
    if has(&["ffmpeg not found", "ffmpeg is not installed", "postprocessing:", "merging of"]) {
        return Some(BlockingReason::MergeFailed);
    }
    if has(&["unsupported url"]) {
        return Some(BlockingReason::UnsupportedUrl);
    }
    if has(&["age-restricted", "sign in to confirm your age"]) {
        return Some(BlockingReason::AgeRestricted);
    }
    if has(&["private video", "video is private"]) {
        return Some(BlockingReason::PrivateVideo);
    }
    if has(&["video unavailable", "video has been removed", "no longer available"]) {
        return Some(BlockingReason::VideoUnavailable);
    }
    if has(&["not available in your country", "blocked in your country", "geo restrict"]) {
        return Some(BlockingReason::GeoBlocked);
    }
    if has(&["429", "rate limit", "too many requests"]) {
        return Some(BlockingReason::RateLimited);
    }
    if has(&["confirm you're not a bot", "captcha", "unusual traffic"]) {
        return Some(BlockingReason::BotDetection);
    }
    if has(&["403", "forbidden"]) {
        return Some(BlockingReason::Http403Forbidden);
    }
    if has(&["timed out", "timeout", "connection refused", "network is unreachable"]) {
        return Some(BlockingReason::NetworkTimeout);
    }

    None
}
