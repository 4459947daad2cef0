use clap::{Parser, Subcommand};
use colored::Colorize;

use fritz_mcp_installer::commands;
use fritz_mcp_installer::OutputFormat;

/// fritz-mcp-installer - download, verify & install the fritz-mcp server
/// Fetches a release binary, checks it against the published SHA256SUMS,
/// and places it in the install directory.
#[derive(Parser)]
#[command(name = "fritz-mcp-install")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Output format (text, json)
    #[arg(long, global = true, default_value = "text")]
    format: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download, verify, and install a fritz-mcp release
    Install {
        /// Release tag to install (default: latest, env: FRITZ_MCP_VERSION)
        #[arg(short = 'v', long = "version", value_name = "TAG")]
        version: Option<String>,

        /// Install directory (default: ~/.local/bin, env: FRITZ_MCP_INSTALL_DIR)
        #[arg(short = 'd', long = "install-dir", value_name = "DIR")]
        install_dir: Option<String>,

        /// Overwrite an existing binary without prompting
        #[arg(short, long)]
        yes: bool,

        /// Resolve platform and version, print the plan, change nothing
        #[arg(long)]
        dry_run: bool,
    },

    /// Show the detected platform and install plan (offline)
    Detect {
        /// Install directory (default: ~/.local/bin, env: FRITZ_MCP_INSTALL_DIR)
        #[arg(short = 'd', long = "install-dir", value_name = "DIR")]
        install_dir: Option<String>,
    },
}

fn main() {
    let cli = Cli::parse();
    let format = OutputFormat::from_str(&cli.format);
    let is_json = format == OutputFormat::Json;

    if !is_json {
        println!("{}", "⚡ fritz-mcp-installer".bold().cyan());
        println!("{}", "Download, verify & install fritz-mcp releases".dimmed());
        println!();
    }

    let result = match cli.command {
        Commands::Install {
            version,
            install_dir,
            yes,
            dry_run,
        } => commands::install::run(
            version.as_deref(),
            install_dir.as_deref(),
            yes,
            dry_run,
            format,
        ),
        Commands::Detect { install_dir } => {
            commands::detect::run(install_dir.as_deref(), format)
        }
    };

    if let Err(e) = result {
        if is_json {
            let error_output = serde_json::json!({
                "success": false,
                "error": format!("{:#}", e),
                "timestamp": chrono::Utc::now().to_rfc3339()
            });
            eprintln!("{}", serde_json::to_string_pretty(&error_output).unwrap_or_default());
        } else {
            eprintln!("{} {:#}", "Error:".red().bold(), e);
        }
        std::process::exit(1);
    }
}
