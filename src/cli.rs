// Command-line argument structures using clap

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use video_downloader_lib::downloader::StderrPolicy;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Download videos with yt-dlp and ffmpeg",
    long_about = "Lists the formats a URL offers and downloads one of them, merged with the best audio track, while showing progress."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// More log output (-v info, -vv debug). RUST_LOG takes precedence.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Proxy URL for yt-dlp, e.g. socks5://127.0.0.1:1080.
    /// Overrides the proxy environment variables; an empty value disables the proxy.
    #[arg(long, global = true, value_name = "URL")]
    pub proxy: Option<String>,

    /// Directory holding yt-dlp and ffmpeg, instead of the bundled lib/<platform>
    #[arg(long, global = true, value_name = "DIR", env = "VIDEO_DOWNLOADER_TOOLS_DIR")]
    pub tools_dir: Option<PathBuf>,

    /// How yt-dlp stderr output is treated: "fatal" or "error-lines"
    #[arg(long, global = true, value_name = "POLICY", default_value = "fatal")]
    pub stderr_policy: StderrPolicy,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List the formats available for a URL
    Formats {
        #[arg(value_name = "URL")]
        url: String,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Download one format, merged with the best audio track
    Download {
        #[arg(value_name = "URL")]
        url: String,

        /// Format id from the `formats` listing (e.g. 137)
        #[arg(short = 'f', long = "format", required = true, value_name = "ID")]
        format_id: String,

        /// Save directory (defaults to <Downloads>/youtube)
        #[arg(short = 'o', long = "output", value_name = "DIR")]
        output_dir: Option<PathBuf>,
    },

    /// Show versions of the external tools
    Tools {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Print the default download directory
    DownloadsDir,
}
