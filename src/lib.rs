pub mod commands;
pub mod config;
pub mod downloader;
pub mod ytdlp;

pub use config::AppConfig;
pub use ytdlp::YtDlpBackend;
