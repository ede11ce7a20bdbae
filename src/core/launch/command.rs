use std::path::{Path, PathBuf};

use tokio::process::Command;

use crate::core::state::DEFAULT_JVM_ARGS;

/// Marker flag telling the client it was started by this launcher.
pub const SAFE_LAUNCH_FLAG: &str = "-safeLaunch";

/// Flag followed by the loopback port the client reports readiness on.
pub const LAUNCHER_PORT_FLAG: &str = "--launcherCom";

/// Everything needed to start the client, fixed before the process exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchSpec {
    jvm_args: Vec<String>,
    program_args: Vec<String>,
    artifact: PathBuf,
}

impl LaunchSpec {
    /// An empty `jvm_args` list falls back to [`DEFAULT_JVM_ARGS`].
    pub fn new(jvm_args: Vec<String>, program_args: Vec<String>, artifact: PathBuf) -> Self {
        let jvm_args = if jvm_args.is_empty() {
            DEFAULT_JVM_ARGS.iter().map(|arg| arg.to_string()).collect()
        } else {
            jvm_args
        };

        Self {
            jvm_args,
            program_args,
            artifact,
        }
    }

    pub fn jvm_args(&self) -> &[String] {
        &self.jvm_args
    }

    pub fn program_args(&self) -> &[String] {
        &self.program_args
    }

    pub fn artifact(&self) -> &Path {
        &self.artifact
    }

    /// `java <jvm args> -jar <artifact> -safeLaunch <program args> --launcherCom <port>`
    pub fn build_command(&self, java_bin: &Path, port: u16) -> Command {
        let mut cmd = Command::new(java_bin);
        cmd.args(&self.jvm_args)
            .arg("-jar")
            .arg(&self.artifact)
            .arg(SAFE_LAUNCH_FLAG)
            .args(&self.program_args)
            .arg(LAUNCHER_PORT_FLAG)
            .arg(port.to_string());
        cmd
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args_of(cmd: &Command) -> Vec<String> {
        cmd.as_std()
            .get_args()
            .map(|arg| arg.to_string_lossy().to_string())
            .collect()
    }

    #[test]
    fn command_follows_fixed_order() {
        let spec = LaunchSpec::new(
            vec!["-Xmx1G".into()],
            vec!["-incognito".into(), "--proxy".into(), "1.2.3.4:80".into()],
            PathBuf::from("/vita/VitaLite.jar"),
        );
        let cmd = spec.build_command(Path::new("/vita/jdk/bin/java"), 41234);

        assert_eq!(cmd.as_std().get_program(), "/vita/jdk/bin/java");
        assert_eq!(
            args_of(&cmd),
            vec![
                "-Xmx1G",
                "-jar",
                "/vita/VitaLite.jar",
                "-safeLaunch",
                "-incognito",
                "--proxy",
                "1.2.3.4:80",
                "--launcherCom",
                "41234",
            ]
        );
    }

    #[test]
    fn empty_jvm_args_use_defaults() {
        let spec = LaunchSpec::new(Vec::new(), Vec::new(), PathBuf::from("a.jar"));
        assert_eq!(spec.jvm_args().len(), DEFAULT_JVM_ARGS.len());

        let args = args_of(&spec.build_command(Path::new("java"), 1));
        assert_eq!(&args[..DEFAULT_JVM_ARGS.len()], DEFAULT_JVM_ARGS);
        assert_eq!(
            args[DEFAULT_JVM_ARGS.len()..].to_vec(),
            vec!["-jar", "a.jar", "-safeLaunch", "--launcherCom", "1"]
        );
    }
}
