//! ---
//! sig_section: "04-tooling-interfaces"
//! sig_subsection: "binary"
//! sig_type: "source"
//! sig_scope: "code"
//! sig_description: "Command line tool for inspecting and aggregating signals."
//! sig_version: "v0.0.0-prealpha"
//! sig_owner: "tbd"
//! ---
use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::{ArgAction, Parser, Subcommand};
use signals_common::config::LoadedSignalsConfig;
use signals_common::{init_tracing, SignalsConfig, VersionInfo};
use signals_payloads::SignalRegistries;
use tracing::debug;

mod aggregate;
mod inspect;

#[derive(Debug, Parser)]
#[command(
    author,
    disable_version_flag = true,
    about = "Inspect and aggregate signal envelopes",
    long_about = None
)]
struct Cli {
    #[arg(
        short = 'V',
        long = "version",
        action = ArgAction::SetTrue,
        help = "Print extended version information and exit"
    )]
    version: bool,
    /// Configuration file; `SIGNALS_CONFIG` takes precedence.
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// List every registered command and response type.
    Types,
    /// Parse a signal file and re-emit it at a chosen schema version.
    Inspect(inspect::InspectArgs),
    /// Combine per-instance response files into one aggregated response.
    Aggregate(aggregate::AggregateArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    if cli.version {
        println!("{}", VersionInfo::current().extended());
        return Ok(());
    }
    let Some(command) = cli.command else {
        bail!("no subcommand given; run with --help for usage");
    };

    let loaded = load_config(cli.config)?;
    init_tracing("signalsctl", &loaded.config.logging)?;
    debug!(
        source = ?loaded.source,
        banner = %VersionInfo::current().banner(),
        "configuration resolved"
    );
    let registries = SignalRegistries::build()?;

    match command {
        Commands::Types => print_types(&registries),
        Commands::Inspect(args) => inspect::run(args, &loaded.config, &registries)?,
        Commands::Aggregate(args) => aggregate::run(args, &loaded.config, &registries)?,
    }
    Ok(())
}

fn load_config(explicit: Option<PathBuf>) -> Result<LoadedSignalsConfig> {
    let mut candidates = Vec::new();
    if let Some(path) = explicit {
        if !path.exists() {
            bail!("configuration file {} does not exist", path.display());
        }
        candidates.push(path);
    }
    candidates.push(PathBuf::from("configs/signals.toml"));
    SignalsConfig::load_with_source(&candidates)
}

fn print_types(registries: &SignalRegistries) {
    for tag in registries.commands.type_tags() {
        println!("command\t{}", tag);
    }
    for tag in registries.responses.type_tags() {
        println!("response\t{}", tag);
    }
}
