//! The install pipeline
//! Drives the whole run: preflight, platform and version resolution,
//! manifest and asset downloads, verification, extraction, installation.

use anyhow::{Context, Result};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::time::Duration;

use crate::archive::extract_binary;
use crate::config::{InstallConfig, ARCHIVE_BINARY_NAME, MANIFEST_NAME};
use crate::fetch::{download, HttpTransport, RetryPolicy, Transport};
use crate::install::{install, select_policy, ConfirmationPolicy, InstallOutcome};
use crate::output::{InstallerOutput, OutputFormat};
use crate::platform::Platform;
use crate::release::resolve_version;
use crate::verify::{verify_file, Manifest};

/// Run the install command
pub fn run(
    version_flag: Option<&str>,
    install_dir_flag: Option<&str>,
    assume_yes: bool,
    dry_run: bool,
    format: OutputFormat,
) -> Result<()> {
    let config = InstallConfig::resolve(version_flag, install_dir_flag, assume_yes);

    // Preflight: the tools the old install script probed for are compiled
    // in, so the only thing left to check up front is the HTTP client.
    let transport = HttpTransport::new()?;

    let platform = Platform::detect()?;
    step(format, &format!("Platform: {}", platform.tag().bold()));

    let version = resolve_version(&config.version, &config.releases_api_url)?;
    step(format, &format!("Version: {}", version.bold()));

    if dry_run {
        return report_dry_run(&config, &platform, &version, format);
    }

    let scratch = tempfile::Builder::new()
        .prefix("fritz-mcp-install-")
        .tempdir()
        .context("failed to create scratch directory")?;

    // The TempDir guard covers success and error returns; the interrupt
    // handler covers Ctrl-C, where destructors never run.
    let cleanup_path = scratch.path().to_path_buf();
    let handler = ctrlc::set_handler(move || {
        let _ = std::fs::remove_dir_all(&cleanup_path);
        std::process::exit(130);
    });
    if let Err(e) = handler {
        // A second run() in the same process cannot re-register; cleanup
        // then rests on the TempDir guard alone.
        if format == OutputFormat::Text {
            eprintln!("{} interrupt handler unavailable: {}", "⚠".yellow(), e);
        }
    }

    let policy = select_policy(config.assume_yes);
    let outcome = execute(
        &config,
        &platform,
        &version,
        &transport,
        policy.as_ref(),
        scratch.path(),
        format,
    )?;

    match outcome {
        InstallOutcome::Installed(target) => {
            if format == OutputFormat::Json {
                let output = InstallerOutput::new("install")
                    .with_success(true)
                    .with_version(&version)
                    .with_platform(&platform.tag())
                    .with_data(serde_json::json!({
                        "target": target.display().to_string(),
                        "dry_run": false
                    }));
                println!("{}", output.to_json()?);
            } else {
                println!();
                println!(
                    "{} Installed {} {} at {}",
                    "✓".green().bold(),
                    config.target_name.bold(),
                    version,
                    target.display()
                );
            }
        }
        InstallOutcome::Declined => {
            // A declined overwrite is a clean exit, not a failure.
            if format == OutputFormat::Json {
                let output = InstallerOutput::new("install")
                    .with_success(true)
                    .with_version(&version)
                    .with_data(serde_json::json!({ "declined": true }));
                println!("{}", output.to_json()?);
            } else {
                println!("{}", "Installation cancelled.".yellow());
            }
        }
    }

    Ok(())
}

/// The download-verify-install sequence over an already-resolved version.
///
/// Takes the transport and confirmation policy as parameters so the whole
/// sequence runs against fakes in tests.
pub fn execute(
    config: &InstallConfig,
    platform: &Platform,
    version: &str,
    transport: &dyn Transport,
    policy: &dyn ConfirmationPolicy,
    scratch: &Path,
    format: OutputFormat,
) -> Result<InstallOutcome> {
    let retry = RetryPolicy::standard();

    let manifest_path = scratch.join(MANIFEST_NAME);
    fetch_with_spinner(
        transport,
        &config.manifest_url(version),
        &manifest_path,
        &retry,
        format,
    )?;

    let manifest = Manifest::load(&manifest_path)?;
    if manifest.is_empty() {
        anyhow::bail!(
            "checksum manifest for {} is empty; cannot verify the download",
            version
        );
    }

    let asset_name = platform.asset_name();
    let asset_path = scratch.join(&asset_name);
    fetch_with_spinner(
        transport,
        &config.asset_url(version, &asset_name),
        &asset_path,
        &retry,
        format,
    )?;

    // Verification strictly precedes installation; there is no path to
    // the target file that skips this call.
    verify_file(&manifest, &asset_path)?;
    if format == OutputFormat::Text {
        println!("{} Checksum verified", "✓".green().bold());
    }

    let binary = extract_binary(&asset_path, ARCHIVE_BINARY_NAME, scratch)?;
    if format == OutputFormat::Text {
        println!("{} Extracted {}", "✓".green().bold(), ARCHIVE_BINARY_NAME);
    }

    install(&binary, &config.target_path(), policy).map_err(Into::into)
}

fn fetch_with_spinner(
    transport: &dyn Transport,
    url: &str,
    dest: &Path,
    retry: &RetryPolicy,
    format: OutputFormat,
) -> Result<()> {
    let file_name = dest
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("download");

    if format == OutputFormat::Json {
        return download(transport, url, dest, retry);
    }

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(format!("Downloading {}", file_name));
    spinner.enable_steady_tick(Duration::from_millis(100));

    let result = download(transport, url, dest, retry);
    spinner.finish_and_clear();

    if result.is_ok() {
        println!("{} Downloaded {}", "✓".green().bold(), file_name);
    }
    result
}

fn report_dry_run(
    config: &InstallConfig,
    platform: &Platform,
    version: &str,
    format: OutputFormat,
) -> Result<()> {
    let asset_name = platform.asset_name();

    if format == OutputFormat::Json {
        let output = InstallerOutput::new("install")
            .with_success(true)
            .with_version(version)
            .with_platform(&platform.tag())
            .with_data(serde_json::json!({
                "dry_run": true,
                "asset_url": config.asset_url(version, &asset_name),
                "manifest_url": config.manifest_url(version),
                "target": config.target_path().display().to_string()
            }));
        println!("{}", output.to_json()?);
    } else {
        println!();
        println!("{}", "Dry run - nothing downloaded or written.".dimmed());
        println!("  {} {}", "asset:".bold(), config.asset_url(version, &asset_name));
        println!("  {} {}", "manifest:".bold(), config.manifest_url(version));
        println!("  {} {}", "target:".bold(), config.target_path().display());
    }

    Ok(())
}

fn step(format: OutputFormat, message: &str) {
    if format == OutputFormat::Text {
        println!("{} {}", "→".cyan(), message);
    }
}
