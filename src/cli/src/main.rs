//! GeoGuard CLI - inspect filter chains and access rules offline.
//!
//! Provides commands for chain listing, request routing, access decisions,
//! and configuration validation.

mod commands;
mod output;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{access, chains, decide, resolve, validate};
use geoguard_core::config::Config;
use geoguard_core::telemetry::{init_telemetry, LogFormat, LoggingConfig};
use output::OutputFormat;

/// GeoGuard - catalog authorization and filter chain routing
#[derive(Parser)]
#[command(
    name = "geoguard",
    author = "Aezi <aezi.zhu@icloud.com>",
    version = "0.1.0",
    about = "GeoGuard - catalog authorization and filter chain routing",
    long_about = "CLI tool for inspecting GeoGuard filter chains, access rules and decisions.",
    propagate_version = true
)]
pub struct Cli {
    /// Output format
    #[arg(short, long, global = true, default_value = "table")]
    output: OutputFormat,

    /// Configuration file. Without it only GEOGUARD__* variables are read.
    #[arg(short, long, global = true, env = "GEOGUARD_CONFIG")]
    config: Option<PathBuf>,

    /// Log decisions and table changes to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Filter chain table operations
    #[command(subcommand)]
    Chains(chains::ChainCommands),

    /// Route a request path to its filter chain
    Resolve(resolve::ResolveArgs),

    /// Evaluate a raw access decision
    Decide(decide::DecideArgs),

    /// Rule set and per-object policy operations
    #[command(subcommand)]
    Access(access::AccessCommands),

    /// Validate the configuration
    Validate,
}

fn load_config(path: Option<&PathBuf>) -> Result<Config> {
    match path {
        Some(path) => Config::from_file(&path.to_string_lossy()),
        None => Config::load(),
    }
}

fn main() {
    let cli = Cli::parse();

    if cli.no_color {
        colored::control::set_override(false);
    }

    if let Err(e) = run(cli) {
        output::status(output::Status::Error, &format!("{:#}", e));
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = load_config(cli.config.as_ref())?;

    if cli.verbose {
        let logging = LoggingConfig {
            level: "debug".to_string(),
            format: LogFormat::Compact,
            ..config.logging.clone()
        };
        init_telemetry(&logging, &config.environment)?;
    }

    let format = cli.output;
    match cli.command {
        Commands::Chains(cmd) => chains::execute(cmd, &config, format),
        Commands::Resolve(args) => resolve::execute(args, &config, format),
        Commands::Decide(args) => decide::execute(args, format),
        Commands::Access(cmd) => access::execute(cmd, &config, format),
        Commands::Validate => validate::execute(&config, format),
    }
}
