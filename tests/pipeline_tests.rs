//! Pipeline tests for the installer
//!
//! Run the download-verify-install sequence end to end over a fake
//! transport, so no network access is needed.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::Result;
use sha2::{Digest, Sha256};
use tempfile::TempDir;

use fritz_mcp_installer::commands::install::execute;
use fritz_mcp_installer::{
    AlwaysProceed, InstallConfig, InstallOutcome, OutputFormat, Platform, Transport, VerifyError,
};

/// Release archive produced by the release tooling: a .tar.xz holding the
/// `fritz-mcp` executable.
const RELEASE_ARCHIVE: &[u8] = include_bytes!("fixtures/fritz-mcp-release.tar.xz");

const VERSION: &str = "v0.4.0";

/// Serves canned bytes per URL, optionally failing the first N fetch
/// calls with a partial write to exercise the retry overwrite behavior.
struct FakeTransport {
    responses: HashMap<String, Vec<u8>>,
    fail_first: Cell<usize>,
    requests: RefCell<Vec<String>>,
}

impl FakeTransport {
    fn new(responses: HashMap<String, Vec<u8>>) -> Self {
        Self {
            responses,
            fail_first: Cell::new(0),
            requests: RefCell::new(Vec::new()),
        }
    }

    fn failing_first(mut self, failures: usize) -> Self {
        self.fail_first = Cell::new(failures);
        self
    }

    fn request_count(&self) -> usize {
        self.requests.borrow().len()
    }
}

impl Transport for FakeTransport {
    fn fetch(&self, url: &str, dest: &Path) -> Result<()> {
        self.requests.borrow_mut().push(url.to_string());

        let remaining = self.fail_first.get();
        if remaining > 0 {
            self.fail_first.set(remaining - 1);
            // Leave a partial write behind; the next attempt must
            // truncate it, not append.
            fs::write(dest, b"partial garbage")?;
            anyhow::bail!("simulated network failure for {}", url);
        }

        let bytes = self
            .responses
            .get(url)
            .ok_or_else(|| anyhow::anyhow!("404 not found: {}", url))?;
        fs::write(dest, bytes)?;
        Ok(())
    }
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

fn test_platform() -> Platform {
    Platform::from_parts("linux", "amd64").unwrap()
}

/// Build a config pointing at a temp install dir plus a transport serving
/// the fixture archive and a manifest with the given digest.
fn setup(install_dir: &Path, digest: &str) -> (InstallConfig, FakeTransport) {
    let config = InstallConfig::resolve(
        Some(VERSION),
        Some(install_dir.to_str().unwrap()),
        true,
    );
    let platform = test_platform();
    let asset_name = platform.asset_name();

    let manifest = format!("{}  {}\n", digest, asset_name);
    let mut responses = HashMap::new();
    responses.insert(config.manifest_url(VERSION), manifest.into_bytes());
    responses.insert(
        config.asset_url(VERSION, &asset_name),
        RELEASE_ARCHIVE.to_vec(),
    );

    (config, FakeTransport::new(responses))
}

fn run_pipeline(
    config: &InstallConfig,
    transport: &FakeTransport,
    scratch: &Path,
) -> Result<InstallOutcome> {
    execute(
        config,
        &test_platform(),
        VERSION,
        transport,
        &AlwaysProceed,
        scratch,
        OutputFormat::Json,
    )
}

// ============================================================================
// Happy path
// ============================================================================

#[test]
fn test_end_to_end_install() {
    let install_dir = TempDir::new().unwrap();
    let scratch = TempDir::new().unwrap();
    let (config, transport) = setup(install_dir.path(), &sha256_hex(RELEASE_ARCHIVE));

    let outcome = run_pipeline(&config, &transport, scratch.path()).unwrap();

    let target = install_dir.path().join("fritzbox-mcp-server");
    assert_eq!(outcome, InstallOutcome::Installed(target.clone()));
    assert!(target.exists());

    // The installed file is the executable from inside the archive.
    let content = fs::read(&target).unwrap();
    assert!(content.starts_with(b"#!/bin/sh"));

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = fs::metadata(&target).unwrap().permissions().mode();
        assert_ne!(mode & 0o111, 0, "installed binary must be executable");
    }

    // Exactly two fetches: manifest, then asset.
    assert_eq!(transport.request_count(), 2);
}

#[test]
fn test_reinstall_overwrites_without_prompting() {
    let install_dir = TempDir::new().unwrap();
    let (config, transport) = setup(install_dir.path(), &sha256_hex(RELEASE_ARCHIVE));

    let scratch_one = TempDir::new().unwrap();
    run_pipeline(&config, &transport, scratch_one.path()).unwrap();

    let scratch_two = TempDir::new().unwrap();
    let outcome = run_pipeline(&config, &transport, scratch_two.path()).unwrap();

    assert!(matches!(outcome, InstallOutcome::Installed(_)));
    // One installed file, nothing else accumulated.
    assert_eq!(fs::read_dir(install_dir.path()).unwrap().count(), 1);
}

// ============================================================================
// Retry behavior
// ============================================================================

#[test]
fn test_recovers_when_first_two_attempts_fail() {
    let install_dir = TempDir::new().unwrap();
    let scratch = TempDir::new().unwrap();
    let (config, transport) = setup(install_dir.path(), &sha256_hex(RELEASE_ARCHIVE));
    let transport = transport.failing_first(2);

    let outcome = run_pipeline(&config, &transport, scratch.path()).unwrap();

    assert!(matches!(outcome, InstallOutcome::Installed(_)));
    // Manifest fetch burned the two failures plus one success, then the
    // asset fetch succeeded first try.
    assert_eq!(transport.request_count(), 4);

    // The partial garbage from failed attempts never leaks into the
    // verified download.
    let target = install_dir.path().join("fritzbox-mcp-server");
    assert!(fs::read(&target).unwrap().starts_with(b"#!/bin/sh"));
}

#[test]
fn test_gives_up_after_three_attempts() {
    let install_dir = TempDir::new().unwrap();
    let scratch = TempDir::new().unwrap();
    let (config, transport) = setup(install_dir.path(), &sha256_hex(RELEASE_ARCHIVE));
    let transport = transport.failing_first(99);

    let err = run_pipeline(&config, &transport, scratch.path()).unwrap_err();

    assert!(format!("{:#}", err).contains("giving up after 3 attempts"));
    assert_eq!(transport.request_count(), 3);
    assert!(!install_dir.path().join("fritzbox-mcp-server").exists());
}

// ============================================================================
// Verification gate
// ============================================================================

#[test]
fn test_checksum_mismatch_aborts_before_install() {
    let install_dir = TempDir::new().unwrap();
    let scratch = TempDir::new().unwrap();
    let wrong_digest = "a".repeat(64);
    let (config, transport) = setup(install_dir.path(), &wrong_digest);

    let err = run_pipeline(&config, &transport, scratch.path()).unwrap_err();

    match err.downcast_ref::<VerifyError>() {
        Some(VerifyError::Mismatch { expected, actual }) => {
            assert_eq!(*expected, wrong_digest);
            assert_eq!(*actual, sha256_hex(RELEASE_ARCHIVE));
        }
        other => panic!("expected Mismatch, got {:?}", other),
    }

    // Nothing was installed.
    assert!(!install_dir.path().join("fritzbox-mcp-server").exists());
}

#[test]
fn test_uppercase_manifest_digest_still_matches() {
    let install_dir = TempDir::new().unwrap();
    let scratch = TempDir::new().unwrap();
    let digest = sha256_hex(RELEASE_ARCHIVE).to_uppercase();
    let (config, transport) = setup(install_dir.path(), &digest);

    let outcome = run_pipeline(&config, &transport, scratch.path()).unwrap();
    assert!(matches!(outcome, InstallOutcome::Installed(_)));
}

#[test]
fn test_asset_missing_from_manifest_is_distinct_error() {
    let install_dir = TempDir::new().unwrap();
    let scratch = TempDir::new().unwrap();
    let (config, mut transport) = setup(install_dir.path(), &sha256_hex(RELEASE_ARCHIVE));

    // Manifest only lists some other platform's asset.
    let manifest = format!("{}  fritz-mcp-darwin-arm64.tar.xz\n", "b".repeat(64));
    transport
        .responses
        .insert(config.manifest_url(VERSION), manifest.into_bytes());

    let err = run_pipeline(&config, &transport, scratch.path()).unwrap_err();

    assert_eq!(
        *err.downcast_ref::<VerifyError>().unwrap(),
        VerifyError::ChecksumNotFound("fritz-mcp-linux-amd64.tar.xz".to_string())
    );
    assert!(!install_dir.path().join("fritzbox-mcp-server").exists());
}

#[test]
fn test_empty_manifest_fails_the_run() {
    let install_dir = TempDir::new().unwrap();
    let scratch = TempDir::new().unwrap();
    let (config, mut transport) = setup(install_dir.path(), &sha256_hex(RELEASE_ARCHIVE));

    transport
        .responses
        .insert(config.manifest_url(VERSION), Vec::new());

    let err = run_pipeline(&config, &transport, scratch.path()).unwrap_err();
    assert!(err.to_string().contains("manifest"));
    assert!(!install_dir.path().join("fritzbox-mcp-server").exists());
}

// ============================================================================
// Scratch directory lifecycle
// ============================================================================

#[test]
fn test_scratch_dir_is_removed_on_success_and_failure() {
    let install_dir = TempDir::new().unwrap();

    // Success path.
    let (config, transport) = setup(install_dir.path(), &sha256_hex(RELEASE_ARCHIVE));
    let scratch = TempDir::new().unwrap();
    let scratch_path = scratch.path().to_path_buf();
    run_pipeline(&config, &transport, &scratch_path).unwrap();
    drop(scratch);
    assert!(!scratch_path.exists());

    // Failure path: staged downloads must not outlive the run either.
    let (config, transport) = setup(install_dir.path(), &"c".repeat(64));
    let scratch = TempDir::new().unwrap();
    let scratch_path = scratch.path().to_path_buf();
    run_pipeline(&config, &transport, &scratch_path).unwrap_err();
    assert!(scratch_path.join("SHA256SUMS").exists());
    drop(scratch);
    assert!(!scratch_path.exists());
}
