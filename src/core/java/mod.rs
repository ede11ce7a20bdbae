pub mod extract;
pub mod runtime;

pub use runtime::{runtime_download_url, RuntimeInstall, RuntimeProvisioner, JDK_VERSION};
