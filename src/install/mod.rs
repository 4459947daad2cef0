//! Final installation of the verified executable
//! Copies the extracted binary into the install directory behind an
//! overwrite-confirmation gate and confirms the execute bit actually took.

use colored::Colorize;
use std::fs;
use std::io::{self, IsTerminal, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Installation failures, one variant per filesystem step
#[derive(Debug, Error)]
pub enum InstallError {
    #[error("failed to create install directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: io::Error,
    },

    #[error("failed to copy binary to {path}: {source}")]
    Copy {
        path: PathBuf,
        source: io::Error,
    },

    #[error("failed to set executable permissions on {path}: {source}")]
    SetMode {
        path: PathBuf,
        source: io::Error,
    },

    /// The chmod call reported success but the file still has no execute
    /// bit. Kept separate from `SetMode` so the two can be told apart.
    #[error("{path} is not executable after installation (mode {mode:o})")]
    ModeNotEffective {
        path: PathBuf,
        mode: u32,
    },

    #[error("failed to read overwrite confirmation: {0}")]
    Prompt(#[source] io::Error),
}

/// How one installer run concluded
#[derive(Debug, PartialEq, Eq)]
pub enum InstallOutcome {
    /// The binary is in place at the given path.
    Installed(PathBuf),
    /// The user declined to overwrite an existing file. Not an error.
    Declined,
}

/// Decides whether an existing file at the target path may be replaced.
pub trait ConfirmationPolicy {
    fn confirm_overwrite(&self, path: &Path) -> Result<bool, InstallError>;
}

/// Asks on stdin with a `[y/N]` prompt; anything but `y` declines.
pub struct InteractivePrompt;

impl ConfirmationPolicy for InteractivePrompt {
    fn confirm_overwrite(&self, path: &Path) -> Result<bool, InstallError> {
        print!(
            "{} {} already exists. Overwrite? [y/N] ",
            "⚠".yellow(),
            path.display()
        );
        io::stdout().flush().map_err(InstallError::Prompt)?;

        let mut input = String::new();
        io::stdin()
            .read_line(&mut input)
            .map_err(InstallError::Prompt)?;

        Ok(input.trim().eq_ignore_ascii_case("y"))
    }
}

/// Never prompts; existing files are replaced silently. This is the
/// non-interactive default so CI and scripted runs do not hang.
pub struct AlwaysProceed;

impl ConfirmationPolicy for AlwaysProceed {
    fn confirm_overwrite(&self, _path: &Path) -> Result<bool, InstallError> {
        Ok(true)
    }
}

/// Pick the policy for this run: `--yes` or a non-terminal stdin selects
/// the silent-overwrite policy.
pub fn select_policy(assume_yes: bool) -> Box<dyn ConfirmationPolicy> {
    if assume_yes || !io::stdin().is_terminal() {
        Box::new(AlwaysProceed)
    } else {
        Box::new(InteractivePrompt)
    }
}

/// Install a verified binary at `target`, creating the parent directory
/// as needed and consulting `policy` before replacing an existing file.
pub fn install(
    binary: &Path,
    target: &Path,
    policy: &dyn ConfirmationPolicy,
) -> Result<InstallOutcome, InstallError> {
    if let Some(dir) = target.parent() {
        fs::create_dir_all(dir).map_err(|source| InstallError::CreateDir {
            path: dir.to_path_buf(),
            source,
        })?;
    }

    if target.exists() && !policy.confirm_overwrite(target)? {
        return Ok(InstallOutcome::Declined);
    }

    fs::copy(binary, target).map_err(|source| InstallError::Copy {
        path: target.to_path_buf(),
        source,
    })?;

    set_executable(target)?;

    Ok(InstallOutcome::Installed(target.to_path_buf()))
}

#[cfg(unix)]
fn set_executable(target: &Path) -> Result<(), InstallError> {
    use std::os::unix::fs::PermissionsExt;

    fs::set_permissions(target, fs::Permissions::from_mode(0o755)).map_err(|source| {
        InstallError::SetMode {
            path: target.to_path_buf(),
            source,
        }
    })?;

    // Re-read the mode rather than trusting the chmod call; a filesystem
    // that drops permission bits would otherwise install a dead binary.
    let mode = fs::metadata(target)
        .map_err(|source| InstallError::SetMode {
            path: target.to_path_buf(),
            source,
        })?
        .permissions()
        .mode();

    if mode & 0o111 == 0 {
        return Err(InstallError::ModeNotEffective {
            path: target.to_path_buf(),
            mode,
        });
    }

    Ok(())
}

#[cfg(not(unix))]
fn set_executable(_target: &Path) -> Result<(), InstallError> {
    // Execute bits do not exist here; the copy alone suffices.
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct AlwaysDecline;

    impl ConfirmationPolicy for AlwaysDecline {
        fn confirm_overwrite(&self, _path: &Path) -> Result<bool, InstallError> {
            Ok(false)
        }
    }

    fn write_binary(dir: &Path, content: &[u8]) -> PathBuf {
        let path = dir.join("fritz-mcp");
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_installs_into_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let binary = write_binary(dir.path(), b"bin-v1");
        let target = dir.path().join("deep/nested/bin/fritzbox-mcp-server");

        let outcome = install(&binary, &target, &AlwaysProceed).unwrap();
        assert_eq!(outcome, InstallOutcome::Installed(target.clone()));
        assert_eq!(fs::read(&target).unwrap(), b"bin-v1".to_vec());
    }

    #[cfg(unix)]
    #[test]
    fn test_installed_file_is_executable() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let binary = write_binary(dir.path(), b"bin-v1");
        let target = dir.path().join("bin/fritzbox-mcp-server");

        install(&binary, &target, &AlwaysProceed).unwrap();

        let mode = fs::metadata(&target).unwrap().permissions().mode();
        assert_ne!(mode & 0o111, 0, "execute bit not set (mode {:o})", mode);
    }

    #[test]
    fn test_silent_overwrite_is_idempotent() {
        // Running the install twice with the non-interactive policy must
        // replace the target without prompting and leave one file behind.
        let dir = tempfile::tempdir().unwrap();
        let binary = write_binary(dir.path(), b"bin-v1");
        let target = dir.path().join("bin/fritzbox-mcp-server");

        install(&binary, &target, &AlwaysProceed).unwrap();
        let outcome = install(&binary, &target, &AlwaysProceed).unwrap();

        assert_eq!(outcome, InstallOutcome::Installed(target.clone()));
        assert_eq!(fs::read(&target).unwrap(), b"bin-v1".to_vec());
        assert_eq!(fs::read_dir(target.parent().unwrap()).unwrap().count(), 1);
    }

    #[test]
    fn test_declined_overwrite_keeps_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let binary = write_binary(dir.path(), b"bin-v2");
        let target = dir.path().join("bin/fritzbox-mcp-server");
        fs::create_dir_all(target.parent().unwrap()).unwrap();
        fs::write(&target, b"bin-v1").unwrap();

        let outcome = install(&binary, &target, &AlwaysDecline).unwrap();

        assert_eq!(outcome, InstallOutcome::Declined);
        assert_eq!(fs::read(&target).unwrap(), b"bin-v1".to_vec());
    }

    #[test]
    fn test_fresh_target_skips_the_policy() {
        // The policy is only consulted when a file already exists.
        struct PanicPolicy;
        impl ConfirmationPolicy for PanicPolicy {
            fn confirm_overwrite(&self, _path: &Path) -> Result<bool, InstallError> {
                panic!("policy must not be consulted for a fresh target");
            }
        }

        let dir = tempfile::tempdir().unwrap();
        let binary = write_binary(dir.path(), b"bin-v1");
        let target = dir.path().join("bin/fritzbox-mcp-server");

        let outcome = install(&binary, &target, &PanicPolicy).unwrap();
        assert_eq!(outcome, InstallOutcome::Installed(target));
    }
}
