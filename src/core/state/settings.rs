use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::core::error::{io_at, LauncherResult};

/// JVM flags used when the user has not configured any.
pub const DEFAULT_JVM_ARGS: &[&str] = &[
    "-XX:+DisableAttachMechanism",
    "-Drunelite.launcher.blacklistedDlls=RTSSHooks.dll,RTSSHooks64.dll,NahimicOSD.dll,NahimicMSIOSD.dll,Nahimic2OSD.dll,Nahimic2DevProps.dll,k_fps32.dll,k_fps64.dll,SS2DevProps.dll,SS2OSD.dll,GTIII-OSD64-GL.dll,GTIII-OSD64-VK.dll,GTIII-OSD64.dll",
    "-XX:CompileThreshold=1500",
    "-XX:+UseSerialGC",
    "-XX:+UseStringDeduplication",
];

/// Which login flag the stored credential is passed with.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum LoginKind {
    #[default]
    Legacy,
    Jagex,
}

/// Snapshot of the user's launcher preferences.
///
/// Loaded once at startup and handed to the bootstrap by value; the core
/// only reads it.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LauncherSettings {
    pub disable_plugins: bool,
    pub minimal_memory: bool,
    pub disable_music: bool,
    pub incognito: bool,
    /// Persisted for the settings UI; the client has no flag for it yet.
    pub disable_mouse_hook: bool,
    pub dump_path: String,
    pub proxy_spec: String,
    pub login_credential: String,
    pub login_kind: LoginKind,
    pub jvm_args: Vec<String>,
}

impl LauncherSettings {
    /// Read settings from `path`. A missing or unreadable file yields defaults.
    pub fn load(path: &Path) -> Self {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(err) => {
                debug!("No launcher settings at {:?} ({}), using defaults", path, err);
                return Self::default();
            }
        };

        serde_json::from_str(&raw).unwrap_or_else(|err| {
            warn!("Ignoring malformed launcher settings {:?}: {}", path, err);
            Self::default()
        })
    }

    pub fn save(&self, path: &Path) -> LauncherResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(io_at(parent))?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).map_err(io_at(path))
    }

    /// Client arguments derived from the settings, in the order the client expects.
    pub fn build_arguments(&self) -> Vec<String> {
        let mut args = Vec::new();

        let dump_path = self.dump_path.trim();
        if !dump_path.is_empty() {
            args.push("--rsdump".to_string());
            args.push(dump_path.to_string());
        }

        if self.disable_plugins {
            args.push("-noPlugins".to_string());
        }

        if self.minimal_memory {
            args.push("-min".to_string());
        }

        if self.disable_music {
            args.push("-noMusic".to_string());
        }

        if self.incognito {
            args.push("-incognito".to_string());
        }

        let proxy = self.proxy_spec.trim();
        if !proxy.is_empty() {
            args.push("--proxy".to_string());
            args.push(proxy.to_string());
        }

        let credential = self.login_credential.trim();
        if !credential.is_empty() {
            let flag = match self.login_kind {
                LoginKind::Legacy => "--legacyLogin",
                LoginKind::Jagex => "--jagexLogin",
            };
            args.push(flag.to_string());
            args.push(credential.to_string());
        }

        args
    }

    /// Configured JVM flags, or [`DEFAULT_JVM_ARGS`] when none are set.
    pub fn effective_jvm_args(&self) -> Vec<String> {
        if self.jvm_args.is_empty() {
            DEFAULT_JVM_ARGS.iter().map(|arg| arg.to_string()).collect()
        } else {
            self.jvm_args.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dump_path_and_incognito_only() {
        let settings = LauncherSettings {
            dump_path: "/tmp/x".into(),
            incognito: true,
            ..Default::default()
        };
        assert_eq!(
            settings.build_arguments(),
            vec!["--rsdump", "/tmp/x", "-incognito"]
        );
    }

    #[test]
    fn every_flag_in_fixed_order() {
        let settings = LauncherSettings {
            disable_plugins: true,
            minimal_memory: true,
            disable_music: true,
            incognito: true,
            disable_mouse_hook: true,
            dump_path: " /dumps ".into(),
            proxy_spec: "127.0.0.1:1080:user:pass".into(),
            login_credential: "token".into(),
            login_kind: LoginKind::Jagex,
            jvm_args: Vec::new(),
        };
        assert_eq!(
            settings.build_arguments(),
            vec![
                "--rsdump",
                "/dumps",
                "-noPlugins",
                "-min",
                "-noMusic",
                "-incognito",
                "--proxy",
                "127.0.0.1:1080:user:pass",
                "--jagexLogin",
                "token",
            ]
        );
    }

    #[test]
    fn legacy_login_and_blank_strings() {
        let settings = LauncherSettings {
            proxy_spec: "   ".into(),
            login_credential: "user:pass".into(),
            ..Default::default()
        };
        assert_eq!(
            settings.build_arguments(),
            vec!["--legacyLogin", "user:pass"]
        );
        assert!(LauncherSettings::default().build_arguments().is_empty());
    }

    #[test]
    fn jvm_args_fall_back_to_defaults() {
        let defaults = LauncherSettings::default().effective_jvm_args();
        assert_eq!(defaults.len(), DEFAULT_JVM_ARGS.len());
        assert_eq!(defaults[0], "-XX:+DisableAttachMechanism");

        let custom = LauncherSettings {
            jvm_args: vec!["-Xmx1G".into()],
            ..Default::default()
        };
        assert_eq!(custom.effective_jvm_args(), vec!["-Xmx1G"]);
    }

    #[test]
    fn load_tolerates_missing_and_partial_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("launcher_settings.json");
        assert_eq!(LauncherSettings::load(&path), LauncherSettings::default());

        std::fs::write(&path, r#"{ "incognito": true, "login_kind": "Jagex" }"#).unwrap();
        let loaded = LauncherSettings::load(&path);
        assert!(loaded.incognito);
        assert_eq!(loaded.login_kind, LoginKind::Jagex);
        assert!(!loaded.disable_music);

        std::fs::write(&path, "not json").unwrap();
        assert_eq!(LauncherSettings::load(&path), LauncherSettings::default());
    }

    #[test]
    fn save_then_load_preserves_settings() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("launcher_settings.json");
        let settings = LauncherSettings {
            disable_music: true,
            proxy_spec: "10.0.0.1:8080".into(),
            jvm_args: vec!["-Xmx2G".into(), "-XX:+UseG1GC".into()],
            ..Default::default()
        };
        settings.save(&path).unwrap();
        assert_eq!(LauncherSettings::load(&path), settings);
    }
}
