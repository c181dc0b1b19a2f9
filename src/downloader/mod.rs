// Downloader module: parsing, process supervision and the download runner

pub mod diagnostics;
pub mod errors;
pub mod format_list;
pub mod models;
pub mod process;
pub mod progress;
pub mod runner;
pub mod tools;
pub mod traits;
pub mod utils;

pub use diagnostics::{diagnose_error, BlockingReason, StderrPolicy};
pub use errors::{DownloadError, DownloadResult};
pub use models::{
    DownloadEvent, DownloadOutcome, DownloadRequest, FormatDescriptor, NetworkConfig,
    ProgressSample,
};
pub use runner::DownloadHandle;
pub use traits::{DownloaderBackend, ProgressEmitter};
