// video-downloader command-line front-end
//
// Parses arguments, resolves the tools once, and runs one command. Exit codes:
// 0 on success, 1 on failure, 130 when a download was stopped with Ctrl-C.

mod cli;

use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use log::LevelFilter;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use cli::{Cli, Commands};
use video_downloader_lib::commands;
use video_downloader_lib::config::AppConfig;
use video_downloader_lib::YtDlpBackend;
use video_downloader_lib::downloader::{
    diagnose_error, DownloadEvent, DownloadOutcome, FormatDescriptor, ProgressSample,
};

const EXIT_FAILED: u8 = 1;
const EXIT_STOPPED: u8 = 130;

/// Bar length; percent is tracked to one decimal place
const PROGRESS_SCALE: u64 = 1000;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config =
        AppConfig::from_env(cli.tools_dir.as_deref()).with_stderr_policy(cli.stderr_policy);
    let hint_proxy = cli
        .proxy
        .clone()
        .or_else(|| config.network.proxy.clone())
        .filter(|p| !p.trim().is_empty());
    let backend = YtDlpBackend::new(Arc::new(config));

    match cli.command {
        Commands::Formats { url, json } => {
            match commands::list_formats(&backend, &url, cli.proxy).await {
                Ok(formats) => print_formats(&formats, json),
                Err(message) => fail(&message, hint_proxy.as_deref()),
            }
        }
        Commands::Download {
            url,
            format_id,
            output_dir,
        } => {
            let proxy = cli.proxy;
            run_download(&backend, &url, &format_id, output_dir, proxy, hint_proxy).await
        }
        Commands::Tools { json } => {
            let tools = commands::get_tools_status(backend.config()).await;
            if json {
                return print_json(&tools);
            }
            for tool in &tools {
                println!(
                    "{:<8} {:<14} {}",
                    tool.name,
                    tool.version.as_deref().unwrap_or("not found"),
                    tool.path
                );
            }
            if tools.iter().all(|t| t.is_available) {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(EXIT_FAILED)
            }
        }
        Commands::DownloadsDir => {
            println!("{}", commands::get_downloads_path().display());
            ExitCode::SUCCESS
        }
    }
}

/// Default level is warn; -v gives info, -vv debug. RUST_LOG overrides both.
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format_timestamp(None)
        .init();
}

async fn run_download(
    backend: &YtDlpBackend,
    url: &str,
    format_id: &str,
    output_dir: Option<PathBuf>,
    proxy: Option<String>,
    hint_proxy: Option<String>,
) -> ExitCode {
    let requested = output_dir.unwrap_or_else(commands::get_downloads_path);
    let Some(save_dir) = commands::select_directory(Some(&requested)) else {
        return fail(
            &format!("Cannot use {} as the download directory", requested.display()),
            None,
        );
    };

    let (handle, mut events) =
        commands::start_download(backend, url, &save_dir, format_id, proxy);

    let stop = handle.stop_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::info!("Interrupted, stopping download");
            stop.cancel();
        }
    });

    let bar = progress_bar();
    let mut destination = None;
    while let Some(event) = events.recv().await {
        match event {
            DownloadEvent::Destination(path) => {
                log::info!("Writing {}", path.display());
                destination = Some(path);
            }
            DownloadEvent::Progress(sample) => update_bar(&bar, &sample),
            DownloadEvent::Warning(message) => bar.println(format!("warning: {}", message)),
            DownloadEvent::Finished(outcome) => log::debug!("Finished: {:?}", outcome),
        }
    }
    bar.finish_and_clear();

    match handle.wait().await {
        DownloadOutcome::Completed => {
            let saved = destination.unwrap_or(save_dir);
            println!("Saved to {}", saved.display());
            ExitCode::SUCCESS
        }
        DownloadOutcome::Stopped => {
            eprintln!("Download stopped");
            ExitCode::from(EXIT_STOPPED)
        }
        DownloadOutcome::Failed(message) => fail(&message, hint_proxy.as_deref()),
    }
}

fn progress_bar() -> ProgressBar {
    let pb = ProgressBar::new(PROGRESS_SCALE);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {percent:>3}% {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓▒░ "),
    );
    pb.enable_steady_tick(Duration::from_millis(120));
    pb
}

fn update_bar(bar: &ProgressBar, sample: &ProgressSample) {
    bar.set_position((sample.percent * 10.0).round() as u64);

    let mut message = format!("of {}", sample.size);
    if let Some(speed) = &sample.speed {
        message.push_str(&format!(" at {}", speed));
    }
    if let Some(eta) = &sample.eta {
        message.push_str(&format!(" ETA {}", eta));
    }
    if let Some(frag) = &sample.fragments {
        message.push_str(&format!(" (frag {}/{})", frag.current, frag.total));
    }
    bar.set_message(message);
}

fn print_formats(formats: &[FormatDescriptor], json: bool) -> ExitCode {
    if json {
        return print_json(&formats);
    }
    println!(
        "{:<10} {:<5} {:<12} {:>4} {:>11}  CODEC",
        "ID", "EXT", "RESOLUTION", "FPS", "SIZE"
    );
    for f in formats {
        println!(
            "{:<10} {:<5} {:<12} {:>4} {:>11}  {}",
            f.id, f.container, f.resolution, f.frame_rate, f.file_size, f.video_codec
        );
    }
    ExitCode::SUCCESS
}

fn print_json<T: serde::Serialize>(value: &T) -> ExitCode {
    match serde_json::to_string_pretty(value) {
        Ok(text) => {
            println!("{}", text);
            ExitCode::SUCCESS
        }
        Err(e) => fail(&format!("Cannot serialize output: {}", e), None),
    }
}

/// Print the message verbatim, plus a hint when the cause is recognisable
fn fail(message: &str, proxy: Option<&str>) -> ExitCode {
    eprintln!("Error: {}", message);
    if let Some(reason) = diagnose_error(message) {
        log::warn!("Detected: {:?}", reason);
        eprintln!("Detected: {}", reason.description());
        if let Some(hint) = reason.hint(proxy) {
            eprintln!("Hint: {}", hint);
        }
    }
    ExitCode::from(EXIT_FAILED)
}
