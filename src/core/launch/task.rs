// ─── Launch Task ───
// Spawns the client and watches for its readiness handshake.

use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::process::Child;
use tracing::{debug, info, instrument};

use crate::core::error::{LauncherError, LauncherResult};
use crate::core::java::RuntimeInstall;

use super::command::LaunchSpec;
use super::handshake::{HandshakeListener, ReadyHandle};

/// How long an exited client's handshake may still take to arrive.
const EXIT_GRACE: Duration = Duration::from_secs(1);

/// How a launched client settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchStatus {
    Ready,
    /// The process ended before it signalled readiness.
    Exited(ExitStatus),
    /// No signal within the wait; the client is left running.
    TimedOut,
}

/// A spawned client process plus its pending readiness signal.
#[derive(Debug)]
pub struct LaunchedClient {
    child: Child,
    ready: ReadyHandle,
    port: u16,
}

impl LaunchedClient {
    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn id(&self) -> Option<u32> {
        self.child.id()
    }

    /// Wait for the handshake, the process exit or `timeout`, whichever
    /// comes first. The process is never killed here.
    pub async fn wait_until_ready(self, timeout: Duration) -> LauncherResult<LaunchStatus> {
        let LaunchedClient {
            mut child, ready, ..
        } = self;

        let ready = ready.ready();
        tokio::pin!(ready);
        let deadline = tokio::time::sleep(timeout);
        tokio::pin!(deadline);
        // Set once the handshake settled without the ready line.
        let mut refused = false;

        loop {
            tokio::select! {
                biased;
                signalled = &mut ready, if !refused => {
                    if signalled {
                        return Ok(LaunchStatus::Ready);
                    }
                    refused = true;
                }
                status = child.wait() => {
                    let status = status
                        .map_err(|err| LauncherError::JavaExecution(err.to_string()))?;
                    // A client may write the ready line and exit before the
                    // handshake task has delivered it.
                    if !refused
                        && matches!(tokio::time::timeout(EXIT_GRACE, &mut ready).await, Ok(true))
                    {
                        return Ok(LaunchStatus::Ready);
                    }
                    return Ok(LaunchStatus::Exited(status));
                }
                _ = &mut deadline => return Ok(LaunchStatus::TimedOut),
            }
        }
    }
}

/// Start the client described by `spec` on `runtime`.
///
/// Returns as soon as the process is spawned; standard streams are inherited.
#[instrument(skip_all, fields(artifact = ?spec.artifact()))]
pub async fn launch(runtime: &RuntimeInstall, spec: &LaunchSpec) -> LauncherResult<LaunchedClient> {
    if !spec.artifact().is_file() {
        return Err(LauncherError::ArtifactNotInstalled(
            spec.artifact().to_path_buf(),
        ));
    }

    let listener = HandshakeListener::bind().await?;
    let port = listener.port();

    let mut cmd = spec.build_command(&runtime.java_bin, port);
    cmd.stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit());

    info!("Launching VitaLite with Java: {:?}", runtime.java_bin);
    debug!("Command (copy/paste): {}", format_command_for_logs(cmd.as_std()));

    let child = cmd
        .spawn()
        .map_err(|e| LauncherError::JavaExecution(e.to_string()))?;
    let ready = listener.spawn();

    Ok(LaunchedClient { child, ready, port })
}

fn format_command_for_logs(cmd: &std::process::Command) -> String {
    let program = shell_escape(&cmd.get_program().to_string_lossy());
    let args = cmd
        .get_args()
        .map(|arg| shell_escape(&arg.to_string_lossy()))
        .collect::<Vec<_>>()
        .join(" ");

    if args.is_empty() {
        program
    } else {
        format!("{} {}", program, args)
    }
}

fn shell_escape(raw: &str) -> String {
    if raw.is_empty() {
        return "\"\"".to_string();
    }

    if raw.chars().all(|ch| {
        ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.' | '/' | ':' | '\\' | '=' | '+' | ',')
    }) {
        return raw.to_string();
    }

    format!("\"{}\"", raw.replace('"', "\\\""))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::{Path, PathBuf};

    fn runtime(java_bin: &str) -> RuntimeInstall {
        RuntimeInstall {
            root: PathBuf::from("/"),
            java_bin: PathBuf::from(java_bin),
        }
    }

    #[test]
    fn logged_command_is_shell_escaped() {
        let mut cmd = std::process::Command::new("/opt/jdk/bin/java");
        cmd.args(["-XX:+UseSerialGC", "-jar", "/home/me/My Games/VitaLite.jar", "--proxy", ""]);
        assert_eq!(
            format_command_for_logs(&cmd),
            "/opt/jdk/bin/java -XX:+UseSerialGC -jar \"/home/me/My Games/VitaLite.jar\" --proxy \"\""
        );
    }

    #[tokio::test]
    async fn missing_artifact_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = dir.path().join("VitaLite.jar");
        let spec = LaunchSpec::new(Vec::new(), Vec::new(), artifact.clone());

        let err = launch(&runtime("java"), &spec).await.unwrap_err();
        assert!(matches!(err, LauncherError::ArtifactNotInstalled(path) if path == artifact));
    }

    // `/bin/sh -c <script>` stands in for the runtime; everything after the
    // script becomes positional parameters.
    #[cfg(unix)]
    fn shell_spec(dir: &Path, script: &str) -> LaunchSpec {
        let artifact = dir.join("VitaLite.jar");
        std::fs::write(&artifact, b"jar").unwrap();
        LaunchSpec::new(vec!["-c".into(), script.into()], Vec::new(), artifact)
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn early_exit_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let spec = shell_spec(dir.path(), "exit 3");

        let client = launch(&runtime("/bin/sh"), &spec).await.unwrap();
        let status = client
            .wait_until_ready(Duration::from_secs(30))
            .await
            .unwrap();

        match status {
            LaunchStatus::Exited(status) => assert_eq!(status.code(), Some(3)),
            other => panic!("unexpected status {other:?}"),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn silent_client_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let spec = shell_spec(dir.path(), "sleep 2");

        let client = launch(&runtime("/bin/sh"), &spec).await.unwrap();
        assert_ne!(client.port(), 0);
        let status = client
            .wait_until_ready(Duration::from_millis(100))
            .await
            .unwrap();
        assert_eq!(status, LaunchStatus::TimedOut);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn handshake_wins_over_running_process() {
        let listener = HandshakeListener::bind().await.unwrap();
        let port = listener.port();
        let ready = listener.spawn();
        let child = tokio::process::Command::new("sleep").arg("3").spawn().unwrap();
        let client = LaunchedClient { child, ready, port };

        let mut stream = tokio::net::TcpStream::connect(("127.0.0.1", port))
            .await
            .unwrap();
        tokio::io::AsyncWriteExt::write_all(&mut stream, b"Done\n")
            .await
            .unwrap();

        let status = client
            .wait_until_ready(Duration::from_secs(30))
            .await
            .unwrap();
        assert_eq!(status, LaunchStatus::Ready);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn ready_line_counts_even_when_client_exits_right_after() {
        let dir = tempfile::tempdir().unwrap();
        // The port is the last argument; bash opens the socket, writes and exits.
        let artifact = dir.path().join("VitaLite.jar");
        std::fs::write(&artifact, b"jar").unwrap();
        let script = r#"p="${@: -1}"; exec 3<>/dev/tcp/127.0.0.1/$p; printf "Done\n" >&3"#;
        let spec = LaunchSpec::new(vec!["-c".into(), script.into(), "client".into()], Vec::new(), artifact);

        for attempt in 0..40 {
            let client = launch(&runtime("/bin/bash"), &spec).await.unwrap();
            let status = client
                .wait_until_ready(Duration::from_secs(10))
                .await
                .unwrap();
            assert_eq!(status, LaunchStatus::Ready, "attempt {attempt}");
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn wrong_line_then_exit_is_reported_as_exit() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = dir.path().join("VitaLite.jar");
        std::fs::write(&artifact, b"jar").unwrap();
        let script = r#"p="${@: -1}"; exec 3<>/dev/tcp/127.0.0.1/$p; printf "Starting\n" >&3; exec 3>&-; sleep 0.2; exit 4"#;
        let spec = LaunchSpec::new(vec!["-c".into(), script.into(), "client".into()], Vec::new(), artifact);

        let client = launch(&runtime("/bin/bash"), &spec).await.unwrap();
        let status = client
            .wait_until_ready(Duration::from_secs(10))
            .await
            .unwrap();
        match status {
            LaunchStatus::Exited(status) => assert_eq!(status.code(), Some(4)),
            other => panic!("unexpected status {other:?}"),
        }
    }
}
