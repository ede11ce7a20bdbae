pub mod paths;
pub mod settings;

pub use paths::{LauncherPaths, ARTIFACT_FILE};
pub use settings::{LauncherSettings, LoginKind, DEFAULT_JVM_ARGS};
