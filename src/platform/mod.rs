//! Platform detection for release asset selection
//! Maps the host OS and CPU architecture to the canonical tag used in
//! release asset names.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Operating systems with published release binaries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Os {
    Linux,
    Darwin,
}

impl Os {
    pub const SUPPORTED: &'static [&'static str] = &["linux", "darwin"];
}

impl fmt::Display for Os {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Os::Linux => write!(f, "linux"),
            Os::Darwin => write!(f, "darwin"),
        }
    }
}

/// CPU architectures with published release binaries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Arch {
    Amd64,
    Arm64,
    X86,
    Arm,
}

impl Arch {
    pub const SUPPORTED: &'static [&'static str] = &["amd64", "arm64", "386", "arm"];
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arch::Amd64 => write!(f, "amd64"),
            Arch::Arm64 => write!(f, "arm64"),
            Arch::X86 => write!(f, "386"),
            Arch::Arm => write!(f, "arm"),
        }
    }
}

/// Raised when the host is not covered by the release matrix
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PlatformError {
    #[error("unsupported operating system '{}' (supported: {})", .0, Os::SUPPORTED.join(", "))]
    UnsupportedOs(String),

    #[error("unsupported architecture '{}' (supported: {})", .0, Arch::SUPPORTED.join(", "))]
    UnsupportedArch(String),
}

/// A resolved `{os}-{arch}` pair, fixed for the whole run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Platform {
    pub os: Os,
    pub arch: Arch,
}

impl Platform {
    /// Resolve the platform of the running host.
    ///
    /// Fails fast on anything outside the release matrix; there is no
    /// best-effort fallback.
    pub fn detect() -> Result<Self, PlatformError> {
        Self::from_parts(std::env::consts::OS, std::env::consts::ARCH)
    }

    /// Resolve a platform from raw OS/arch strings.
    ///
    /// Accepts both Rust's `std::env::consts` spellings and the canonical
    /// release spellings, so callers can feed either.
    pub fn from_parts(os: &str, arch: &str) -> Result<Self, PlatformError> {
        let os = match os {
            "linux" => Os::Linux,
            "macos" | "darwin" => Os::Darwin,
            other => return Err(PlatformError::UnsupportedOs(other.to_string())),
        };

        let arch = match arch {
            "x86_64" | "amd64" => Arch::Amd64,
            "aarch64" | "arm64" => Arch::Arm64,
            "x86" | "386" | "i686" => Arch::X86,
            "arm" => Arch::Arm,
            other => return Err(PlatformError::UnsupportedArch(other.to_string())),
        };

        Ok(Platform { os, arch })
    }

    /// Canonical tag used in asset names, e.g. `linux-amd64`
    pub fn tag(&self) -> String {
        format!("{}-{}", self.os, self.arch)
    }

    /// Release archive name for this platform, e.g.
    /// `fritz-mcp-linux-amd64.tar.xz`
    pub fn asset_name(&self) -> String {
        format!("fritz-mcp-{}.tar.xz", self.tag())
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tag())
    }
}
