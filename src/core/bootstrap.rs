// ─── Bootstrap ───
// provision runtime → apply updates → launch client → wait for handshake.
// Runs start to finish on one task; every failure ends the run.

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, instrument, warn};

use crate::core::downloader::Downloader;
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::java::RuntimeProvisioner;
use crate::core::launch::{launch, LaunchSpec, LaunchStatus};
use crate::core::platform::HostPlatform;
use crate::core::progress::{ProgressReporter, COMPLETE, LAUNCH_PENDING, RUNTIME_EXTRACT};
use crate::core::state::{LauncherPaths, LauncherSettings};
use crate::core::update::UpdateProcessor;
use crate::core::version::ReleaseFeed;

/// How long a started client gets to send its ready line.
pub const READY_TIMEOUT: Duration = Duration::from_secs(5 * 60);

pub const UPDATE_REQUIRED_MESSAGE: &str =
    "An update is required but not yet available. Please try again later.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapOutcome {
    /// The client signalled that it finished starting.
    Ready,
    /// The client is running but never signalled within [`READY_TIMEOUT`].
    ReadyTimedOut,
    /// No compatible client build is published yet; nothing was launched.
    UpdateRequired,
}

pub struct Bootstrap {
    paths: LauncherPaths,
    provisioner: RuntimeProvisioner,
    updater: UpdateProcessor,
    settings: LauncherSettings,
    forwarded_args: Vec<String>,
    ready_timeout: Duration,
}

impl Bootstrap {
    /// `settings` is a snapshot; the run only reads it. `forwarded_args` are
    /// appended after the settings-derived client arguments.
    pub fn new(
        paths: LauncherPaths,
        host: HostPlatform,
        downloader: Downloader,
        feed: Arc<dyn ReleaseFeed>,
        settings: LauncherSettings,
        forwarded_args: Vec<String>,
    ) -> Self {
        Self {
            provisioner: RuntimeProvisioner::new(paths.clone(), host, downloader),
            updater: UpdateProcessor::new(paths.clone(), feed),
            paths,
            settings,
            forwarded_args,
            ready_timeout: READY_TIMEOUT,
        }
    }

    pub fn with_ready_timeout(mut self, timeout: Duration) -> Self {
        self.ready_timeout = timeout;
        self
    }

    /// Run the whole sequence. Any failure is also reported once through
    /// `progress.error`.
    pub async fn run(self, progress: &ProgressReporter) -> LauncherResult<BootstrapOutcome> {
        match self.execute(progress).await {
            Ok(outcome) => Ok(outcome),
            Err(err) => {
                error!("Launch sequence failed: {}", err);
                progress.error(&format!("An error occurred: {err}"));
                Err(err)
            }
        }
    }

    #[instrument(skip_all)]
    async fn execute(&self, progress: &ProgressReporter) -> LauncherResult<BootstrapOutcome> {
        let runtime = self.provisioner.ensure_runtime(progress).await?;

        progress.report_new_stage(0, RUNTIME_EXTRACT.end(), "Checking for updates...");
        if !self.updater.apply(progress).await? {
            warn!("{}", UPDATE_REQUIRED_MESSAGE);
            progress.error(UPDATE_REQUIRED_MESSAGE);
            return Ok(BootstrapOutcome::UpdateRequired);
        }

        progress.report_new_stage(100, LAUNCH_PENDING, "Launching VitaLite...");
        let mut program_args = self.settings.build_arguments();
        program_args.extend(self.forwarded_args.iter().cloned());
        let spec = LaunchSpec::new(
            self.settings.effective_jvm_args(),
            program_args,
            self.paths.artifact_path(),
        );

        let client = launch(&runtime, &spec).await?;
        info!(
            "VitaLite started (pid {:?}), waiting for handshake on port {}",
            client.id(),
            client.port()
        );

        match client.wait_until_ready(self.ready_timeout).await? {
            LaunchStatus::Ready => {
                progress.report(100, COMPLETE, "Launch complete!");
                Ok(BootstrapOutcome::Ready)
            }
            LaunchStatus::Exited(status) => Err(LauncherError::ClientExited(status.to_string())),
            LaunchStatus::TimedOut => {
                warn!(
                    "VitaLite did not signal readiness within {:?}; leaving it running",
                    self.ready_timeout
                );
                Ok(BootstrapOutcome::ReadyTimedOut)
            }
        }
    }
}
