//! Platform detection and identification.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Operating system families an extension can be packaged for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Platform {
    /// Windows (MSVC or GNU toolchains).
    Windows,
    /// macOS (Intel or Apple Silicon).
    MacOs,
    /// Linux and other ELF-based Unix systems.
    Linux,
}

impl Platform {
    /// Detect the host platform at runtime.
    #[must_use]
    pub fn current() -> Option<Self> {
        Self::from_os(std::env::consts::OS)
    }

    /// Map a `std::env::consts::OS` value to a platform.
    #[must_use]
    pub fn from_os(os: &str) -> Option<Self> {
        match os {
            "windows" => Some(Self::Windows),
            "macos" => Some(Self::MacOs),
            "linux" => Some(Self::Linux),
            _ => None,
        }
    }

    /// Classify a CI target tag such as `x86_64-pc-windows-msvc`.
    ///
    /// Matching is by substring, checked in the order `windows`, `linux`,
    /// `darwin`.
    #[must_use]
    pub fn from_target_tag(tag: &str) -> Option<Self> {
        if tag.contains("windows") {
            Some(Self::Windows)
        } else if tag.contains("linux") {
            Some(Self::Linux)
        } else if tag.contains("darwin") {
            Some(Self::MacOs)
        } else {
            None
        }
    }

    /// Get the platform key string (e.g., "linux").
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Windows => "windows",
            Self::MacOs => "macos",
            Self::Linux => "linux",
        }
    }

    /// Suffix appended to archive names for CI builds.
    #[must_use]
    pub fn archive_suffix(&self) -> &'static str {
        match self {
            Self::Windows => "-windows",
            Self::MacOs => "-macos",
            Self::Linux => "-linux",
        }
    }

    /// Get the expected dynamic library file extension for this platform.
    #[must_use]
    pub fn library_extension(&self) -> &'static str {
        match self {
            Self::Linux => "so",
            Self::MacOs => "dylib",
            Self::Windows => "dll",
        }
    }

    /// Get the library filename prefix for this platform.
    #[must_use]
    pub fn library_prefix(&self) -> &'static str {
        match self {
            Self::Linux | Self::MacOs => "lib",
            Self::Windows => "",
        }
    }

    /// Get the executable file extension, empty on Unix-like platforms.
    #[must_use]
    pub fn executable_extension(&self) -> &'static str {
        match self {
            Self::Windows => "exe",
            Self::Linux | Self::MacOs => "",
        }
    }

    /// Format a dynamic library name for this platform.
    ///
    /// # Example
    ///
    /// ```
    /// use extpack_bundle::Platform;
    ///
    /// assert_eq!(Platform::Linux.library_name("dmi"), "libdmi.so");
    /// assert_eq!(Platform::Windows.library_name("lua54"), "lua54.dll");
    /// ```
    #[must_use]
    pub fn library_name(&self, base_name: &str) -> String {
        format!(
            "{}{}.{}",
            self.library_prefix(),
            base_name,
            self.library_extension()
        )
    }

    /// Format an executable name for this platform.
    #[must_use]
    pub fn executable_name(&self, base_name: &str) -> String {
        match self.executable_extension() {
            "" => base_name.to_string(),
            ext => format!("{base_name}.{ext}"),
        }
    }

    /// Whether the host application needs a separately shipped Lua runtime.
    ///
    /// Only Windows builds load Lua from a side-by-side DLL.
    #[must_use]
    pub fn requires_runtime_dependency(&self) -> bool {
        matches!(self, Self::Windows)
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
