// ─── Host Platform ───
// OS family and CPU architecture, resolved once at startup. Every
// platform-dependent path, file name and archive format hangs off these.

use std::path::{Path, PathBuf};

/// Supported operating system families.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Windows,
    MacOs,
    Linux,
}

/// CPU architecture bucket used by the runtime distribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arch {
    X64,
    X32,
}

/// Archive container the runtime distribution ships in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    Zip,
    TarGz,
}

impl Platform {
    pub fn current() -> Self {
        Self::from_os_name(std::env::consts::OS)
    }

    /// Anything that is neither Windows nor macOS is treated as Linux.
    pub fn from_os_name(os: &str) -> Self {
        match os {
            "windows" => Platform::Windows,
            "macos" => Platform::MacOs,
            _ => Platform::Linux,
        }
    }

    /// OS segment of the Adoptium binary API.
    pub fn distribution_os(self) -> &'static str {
        match self {
            Platform::Windows => "windows",
            Platform::MacOs => "mac",
            Platform::Linux => "linux",
        }
    }

    pub fn java_exe(self) -> &'static str {
        match self {
            Platform::Windows => "java.exe",
            Platform::MacOs | Platform::Linux => "java",
        }
    }

    /// Directories between the runtime root and `bin/`.
    pub fn java_home_subpath(self) -> &'static [&'static str] {
        match self {
            Platform::MacOs => &["Contents", "Home"],
            Platform::Windows | Platform::Linux => &[],
        }
    }

    pub fn archive_format(self) -> ArchiveFormat {
        match self {
            Platform::Windows => ArchiveFormat::Zip,
            Platform::MacOs | Platform::Linux => ArchiveFormat::TarGz,
        }
    }

    /// Location of the java executable inside a runtime rooted at `runtime_root`.
    pub fn java_executable(self, runtime_root: &Path) -> PathBuf {
        let mut path = runtime_root.to_path_buf();
        for segment in self.java_home_subpath() {
            path.push(segment);
        }
        path.join("bin").join(self.java_exe())
    }
}

impl Arch {
    pub fn current() -> Self {
        Self::from_arch_name(std::env::consts::ARCH)
    }

    pub fn from_arch_name(arch: &str) -> Self {
        if arch.contains("64") {
            Arch::X64
        } else {
            Arch::X32
        }
    }

    pub fn distribution_arch(self) -> &'static str {
        match self {
            Arch::X64 => "x64",
            Arch::X32 => "x32",
        }
    }
}

impl ArchiveFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ArchiveFormat::Zip => ".zip",
            ArchiveFormat::TarGz => ".tar.gz",
        }
    }
}

/// The host this launcher runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostPlatform {
    pub os: Platform,
    pub arch: Arch,
}

impl HostPlatform {
    pub fn detect() -> Self {
        Self {
            os: Platform::current(),
            arch: Arch::current(),
        }
    }
}

impl std::fmt::Display for HostPlatform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}-{}",
            self.os.distribution_os(),
            self.arch.distribution_arch()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn java_executable_uses_nested_home_on_macos() {
        let root = Path::new("/opt/jdk");
        assert_eq!(
            Platform::MacOs.java_executable(root),
            PathBuf::from("/opt/jdk/Contents/Home/bin/java")
        );
        assert_eq!(
            Platform::Linux.java_executable(root),
            PathBuf::from("/opt/jdk/bin/java")
        );
        assert_eq!(
            Platform::Windows.java_executable(root),
            PathBuf::from("/opt/jdk/bin/java.exe")
        );
    }

    #[test]
    fn archive_format_follows_os() {
        assert_eq!(Platform::Windows.archive_format(), ArchiveFormat::Zip);
        assert_eq!(Platform::Linux.archive_format(), ArchiveFormat::TarGz);
        assert_eq!(Platform::MacOs.archive_format().extension(), ".tar.gz");
    }

    #[test]
    fn arch_buckets_into_64_and_32_bit() {
        assert_eq!(Arch::from_arch_name("x86_64"), Arch::X64);
        assert_eq!(Arch::from_arch_name("aarch64"), Arch::X64);
        assert_eq!(Arch::from_arch_name("x86"), Arch::X32);
        assert_eq!(Arch::from_arch_name("arm"), Arch::X32);
    }

    #[test]
    fn unknown_os_falls_back_to_linux() {
        assert_eq!(Platform::from_os_name("freebsd"), Platform::Linux);
        assert_eq!(Platform::from_os_name("macos"), Platform::MacOs);
    }
}
