//! Offline report of what an install would do on this host
//! Prints the resolved platform tag, asset name, and effective install
//! directory without any network access.

use anyhow::Result;
use colored::Colorize;

use crate::config::InstallConfig;
use crate::output::{InstallerOutput, OutputFormat};
use crate::platform::Platform;

pub fn run(install_dir_flag: Option<&str>, format: OutputFormat) -> Result<()> {
    let config = InstallConfig::resolve(None, install_dir_flag, false);
    let platform = Platform::detect()?;

    if format == OutputFormat::Json {
        let output = InstallerOutput::new("detect")
            .with_success(true)
            .with_platform(&platform.tag())
            .with_data(serde_json::json!({
                "os": platform.os.to_string(),
                "arch": platform.arch.to_string(),
                "asset": platform.asset_name(),
                "install_dir": config.install_dir.display().to_string(),
                "target": config.target_path().display().to_string(),
                "requested_version": config.version.to_string()
            }));
        println!("{}", output.to_json()?);
    } else {
        println!("{}", "Host Platform".bold().cyan());
        println!("  {} {}", "os:".bold(), platform.os);
        println!("  {} {}", "arch:".bold(), platform.arch);
        println!("  {} {}", "tag:".bold(), platform.tag().green());
        println!();
        println!("{}", "Install Plan".bold().cyan());
        println!("  {} {}", "asset:".bold(), platform.asset_name());
        println!("  {} {}", "version:".bold(), config.version);
        println!("  {} {}", "target:".bold(), config.target_path().display());
    }

    Ok(())
}
