pub mod core;

use std::ffi::OsString;
use std::process::ExitCode;
use std::sync::Arc;

use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::core::bootstrap::{Bootstrap, BootstrapOutcome};
use crate::core::downloader::Downloader;
use crate::core::error::LauncherResult;
use crate::core::http::build_http_client;
use crate::core::platform::HostPlatform;
use crate::core::progress::{ChannelSink, ProgressEvent, ProgressReporter};
use crate::core::state::{LauncherPaths, LauncherSettings};
use crate::core::version::{Endpoints, RemoteFeed};

const EXIT_UPDATE_REQUIRED: u8 = 2;

pub fn run() -> ExitCode {
    // Logs go to stderr; the client inherits our stdout.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,vita_launcher_lib=debug")),
        )
        .init();

    info!("VitaLite launcher {} starting...", env!("CARGO_PKG_VERSION"));

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(err) => {
            error!("Failed to create tokio runtime: {}", err);
            return ExitCode::FAILURE;
        }
    };

    let forwarded_args = forwarded_args(std::env::args_os().skip(1));
    runtime.block_on(launch_sequence(forwarded_args))
}

/// Arguments passed through to the client. Non-Unicode ones are converted
/// lossily rather than aborting the launch.
fn forwarded_args(raw: impl IntoIterator<Item = OsString>) -> Vec<String> {
    raw.into_iter()
        .map(|arg| match arg.into_string() {
            Ok(arg) => arg,
            Err(arg) => {
                let lossy = arg.to_string_lossy().into_owned();
                warn!("Argument {:?} is not valid Unicode, forwarding it as {:?}", arg, lossy);
                lossy
            }
        })
        .collect()
}

/// Runs the bootstrap on a worker task while this task renders its progress.
async fn launch_sequence(forwarded_args: Vec<String>) -> ExitCode {
    let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
    let reporter = ProgressReporter::new(Arc::new(ChannelSink::new(tx)));

    let worker = tokio::spawn(async move { bootstrap_from_disk(forwarded_args, &reporter).await });
    // Ends once the worker has dropped every handle to the sink.
    render_progress(rx).await;

    match worker.await {
        Ok(Ok(BootstrapOutcome::Ready)) => ExitCode::SUCCESS,
        Ok(Ok(BootstrapOutcome::ReadyTimedOut)) => {
            warn!("Exiting without a ready signal; VitaLite keeps running");
            ExitCode::SUCCESS
        }
        Ok(Ok(BootstrapOutcome::UpdateRequired)) => ExitCode::from(EXIT_UPDATE_REQUIRED),
        Ok(Err(_)) => ExitCode::FAILURE,
        Err(err) => {
            error!("Launch task aborted: {}", err);
            ExitCode::FAILURE
        }
    }
}

async fn bootstrap_from_disk(
    forwarded_args: Vec<String>,
    progress: &ProgressReporter,
) -> LauncherResult<BootstrapOutcome> {
    let (paths, settings, downloader) = match prepare() {
        Ok(prepared) => prepared,
        Err(err) => {
            error!("Launcher setup failed: {}", err);
            progress.error(&format!("An error occurred: {err}"));
            return Err(err);
        }
    };

    let feed = Arc::new(RemoteFeed::new(downloader.clone(), Endpoints::default()));
    Bootstrap::new(
        paths,
        HostPlatform::detect(),
        downloader,
        feed,
        settings,
        forwarded_args,
    )
    .run(progress)
    .await
}

fn prepare() -> LauncherResult<(LauncherPaths, LauncherSettings, Downloader)> {
    let paths = LauncherPaths::resolve()?;
    info!("Launcher root: {:?}", paths.root());

    let settings_file = paths.settings_file();
    let settings = if settings_file.exists() {
        LauncherSettings::load(&settings_file)
    } else {
        let defaults = LauncherSettings::default();
        if let Err(err) = defaults.save(&settings_file) {
            warn!("Could not write default settings: {}", err);
        }
        defaults
    };

    let downloader = Downloader::new(build_http_client()?);
    Ok((paths, settings, downloader))
}

async fn render_progress(mut events: UnboundedReceiver<ProgressEvent>) {
    let mut last_line = String::new();

    while let Some(event) = events.recv().await {
        let line = match event {
            ProgressEvent::Progress {
                stage_percent,
                overall_percent,
                text,
            } => format!("[{overall_percent:>3}%] {text} ({stage_percent}%)"),
            ProgressEvent::Error { text } => format!("[error] {text}"),
        };

        if line != last_line {
            eprintln!("{line}");
            last_line = line;
        }
    }
}
