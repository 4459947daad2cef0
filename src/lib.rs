//! fritz-mcp-installer - download, verify & install fritz-mcp releases
//! This library exposes the installer pipeline so each stage (platform
//! resolution, version lookup, retrying download, checksum verification,
//! installation) is usable and testable on its own.

pub mod archive;
pub mod commands;
pub mod config;
pub mod fetch;
pub mod install;
pub mod output;
pub mod platform;
pub mod release;
pub mod verify;

// Re-export main types for convenience
pub use config::InstallConfig;
pub use fetch::{download, with_retry, HttpTransport, RetryPolicy, Transport};
pub use install::{
    install, select_policy, AlwaysProceed, ConfirmationPolicy, InstallError, InstallOutcome,
    InteractivePrompt,
};
pub use output::{InstallerOutput, OutputFormat};
pub use platform::{Arch, Os, Platform, PlatformError};
pub use release::{extract_tag_name, resolve_version, VersionSpec};
pub use verify::{verify_bytes, verify_file, Manifest, VerifyError};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
