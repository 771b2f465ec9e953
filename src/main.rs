use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use export_wizard::cli::{console, tui};
use export_wizard::config::{self, InitialDevice};
use export_wizard::logging::{self, LogConfig};
use serde::Serialize;

/// Where TUI logs go when no log file is configured.
const TUI_LOG_FILE: &str = "export-wizard.log";

#[derive(Parser)]
#[command(name = "export-wizard")]
#[command(about = "Guided export of files to an encrypted USB device", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (defaults to ./export-wizard.toml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(flatten)]
    overrides: Overrides,
}

#[derive(Subcommand)]
enum Commands {
    /// Drive the wizard from typed commands
    Console {
        /// Print notifications as JSON lines
        #[arg(long)]
        json: bool,
    },
    /// Run a command script on a simulated clock
    Replay {
        file: PathBuf,
        #[arg(long)]
        json: bool,
    },
    /// Full-screen wizard
    Tui,
    /// Print the effective configuration as TOML
    PrintConfig,
}

#[derive(Args, Serialize)]
struct Overrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[arg(long, global = true, num_args = 0..=1, require_equals = true, default_missing_value = "true")]
    verbose: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[arg(long, global = true, num_args = 0..=1, require_equals = true, default_missing_value = "true")]
    log_json: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[arg(long, global = true)]
    auto_start_export: Option<bool>,

    #[command(flatten)]
    simulation: SimulationOverrides,
}

#[derive(Args, Serialize)]
struct SimulationOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[arg(long, global = true, value_parser = parse_initial_device)]
    initial_device: Option<InitialDevice>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[arg(long, global = true)]
    passphrase: Option<String>,
}

fn parse_initial_device(value: &str) -> Result<InitialDevice, String> {
    match value {
        "none" => Ok(InitialDevice::None),
        "missing" => Ok(InitialDevice::Missing),
        "locked" => Ok(InitialDevice::Locked),
        "unlocked" => Ok(InitialDevice::Unlocked),
        other => Err(format!(
            "unknown device '{}', expected none, missing, locked or unlocked",
            other
        )),
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = config::AppConfig::load(cli.config.as_deref(), Some(&cli.overrides))?;

    if let Commands::PrintConfig = cli.command {
        print!("{}", config.to_toml()?);
        return Ok(());
    }

    // The TUI owns the terminal, so its logs must not go to stderr.
    let log_file = match (&cli.command, &config.log_file) {
        (_, Some(path)) => Some(path.clone()),
        (Commands::Tui, None) => Some(PathBuf::from(TUI_LOG_FILE)),
        _ => None,
    };
    logging::init(LogConfig {
        json: config.log_json,
        verbose: config.verbose,
        file: log_file,
    })?;

    match &cli.command {
        Commands::Console { json } => console::run_interactive(&config, *json)
            .await
            .context("Console failed")?,
        Commands::Replay { file, json } => {
            let script = std::fs::read_to_string(file)
                .with_context(|| format!("Failed to read script {}", file.display()))?;
            console::replay(&script, &config, *json, std::io::stdout())?;
        }
        Commands::Tui => tui::run(&config).context("TUI failed")?,
        Commands::PrintConfig => {}
    }

    Ok(())
}
