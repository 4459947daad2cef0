//! Run configuration for the installer
//! Builds an explicit `InstallConfig` from defaults, environment overrides,
//! and CLI flags, threaded through the pipeline instead of ambient globals.

use std::env;
use std::path::PathBuf;

use crate::release::VersionSpec;

/// Release asset download base. Assets live at `{base}/{version}/{name}`.
pub const DEFAULT_BASE_URL: &str =
    "https://github.com/fritz-mcp/fritz-mcp/releases/download";

/// Release metadata endpoint used to resolve `latest`.
pub const DEFAULT_RELEASES_API_URL: &str =
    "https://api.github.com/repos/fritz-mcp/fritz-mcp/releases/latest";

/// Name of the executable inside the release archive.
pub const ARCHIVE_BINARY_NAME: &str = "fritz-mcp";

/// Name of the installed executable.
pub const TARGET_BINARY_NAME: &str = "fritzbox-mcp-server";

/// Checksum manifest asset name published with every release.
pub const MANIFEST_NAME: &str = "SHA256SUMS";

/// Environment override for the release version.
pub const ENV_VERSION: &str = "FRITZ_MCP_VERSION";

/// Environment override for the install directory.
pub const ENV_INSTALL_DIR: &str = "FRITZ_MCP_INSTALL_DIR";

/// Everything one installer run needs to know
#[derive(Debug, Clone)]
pub struct InstallConfig {
    pub base_url: String,
    pub releases_api_url: String,
    pub version: VersionSpec,
    pub install_dir: PathBuf,
    pub target_name: String,
    pub assume_yes: bool,
}

impl InstallConfig {
    /// Build a config from CLI flags layered over environment overrides
    /// and built-in defaults. Flags win over env, env over defaults.
    pub fn resolve(
        version_flag: Option<&str>,
        install_dir_flag: Option<&str>,
        assume_yes: bool,
    ) -> Self {
        let version = version_flag
            .map(str::to_string)
            .or_else(|| non_empty_env(ENV_VERSION))
            .map(|v| VersionSpec::parse(&v))
            .unwrap_or(VersionSpec::Latest);

        let install_dir = install_dir_flag
            .map(PathBuf::from)
            .or_else(|| non_empty_env(ENV_INSTALL_DIR).map(PathBuf::from))
            .unwrap_or_else(default_install_dir);

        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            releases_api_url: DEFAULT_RELEASES_API_URL.to_string(),
            version,
            install_dir,
            target_name: TARGET_BINARY_NAME.to_string(),
            assume_yes,
        }
    }

    /// URL of a named asset for a concrete version
    pub fn asset_url(&self, version: &str, asset_name: &str) -> String {
        format!("{}/{}/{}", self.base_url, version, asset_name)
    }

    /// URL of the checksum manifest for a concrete version
    pub fn manifest_url(&self, version: &str) -> String {
        self.asset_url(version, MANIFEST_NAME)
    }

    /// Final path of the installed executable
    pub fn target_path(&self) -> PathBuf {
        self.install_dir.join(&self.target_name)
    }
}

/// Default install location: `~/.local/bin`, falling back to a relative
/// `.local/bin` when the home directory cannot be determined.
fn default_install_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".local")
        .join("bin")
}

fn non_empty_env(key: &str) -> Option<String> {
    match env::var(key) {
        Ok(value) if !value.trim().is_empty() => Some(value),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_win_over_defaults() {
        let config = InstallConfig::resolve(Some("v1.2.3"), Some("/opt/bin"), true);
        assert_eq!(config.version, VersionSpec::Explicit("v1.2.3".to_string()));
        assert_eq!(config.install_dir, PathBuf::from("/opt/bin"));
        assert!(config.assume_yes);
    }

    #[test]
    fn test_latest_sentinel_from_flag() {
        let config = InstallConfig::resolve(Some("latest"), None, false);
        assert_eq!(config.version, VersionSpec::Latest);
    }

    #[test]
    fn test_default_version_is_latest() {
        // No flag; the env override may be set by the test harness, so
        // only assert the flag-free default when it is absent.
        if std::env::var(ENV_VERSION).is_err() {
            let config = InstallConfig::resolve(None, None, false);
            assert_eq!(config.version, VersionSpec::Latest);
        }
    }

    #[test]
    fn test_asset_and_manifest_urls() {
        let config = InstallConfig::resolve(Some("v0.4.0"), Some("/tmp/bin"), false);
        assert_eq!(
            config.asset_url("v0.4.0", "fritz-mcp-linux-amd64.tar.xz"),
            format!("{}/v0.4.0/fritz-mcp-linux-amd64.tar.xz", DEFAULT_BASE_URL)
        );
        assert_eq!(
            config.manifest_url("v0.4.0"),
            format!("{}/v0.4.0/SHA256SUMS", DEFAULT_BASE_URL)
        );
    }

    #[test]
    fn test_target_path_joins_dir_and_name() {
        let config = InstallConfig::resolve(None, Some("/opt/bin"), false);
        assert_eq!(
            config.target_path(),
            PathBuf::from("/opt/bin/fritzbox-mcp-server")
        );
    }
}
