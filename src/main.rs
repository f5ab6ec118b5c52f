#![allow(clippy::multiple_crate_versions)]

mod commands;
mod logging;
mod mcp_server;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use ergo_runtime::{Config, ErgoEngine};

#[derive(Parser)]
#[command(name = "ergo-mcp")]
#[command(about = "MCP server for the ErgoAI reasoning engine")]
#[command(version)]
struct Cli {
    /// Configuration file path (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Path to the runergo launcher, tried before any other lookup
    #[arg(long, global = true)]
    executable: Option<PathBuf>,

    /// Log level: error, warn, info, debug or trace
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the ErgoAI tools over stdio (the default)
    Mcp,
    /// Check that the ErgoAI engine can be found and started
    Doctor,
    /// Run a single query and print the result as JSON
    Query {
        /// Query text; the trailing period is optional
        query: String,
        /// Module to query (default: main)
        #[arg(short, long)]
        module: Option<String>,
        /// Timeout in milliseconds
        #[arg(short, long)]
        timeout: Option<u64>,
        /// Working directory for the engine
        #[arg(short = 'C', long)]
        working_directory: Option<PathBuf>,
    },
    /// Check a source file for syntax errors without loading it
    Check {
        /// The .ergo file to check
        file: PathBuf,
        /// Timeout in milliseconds
        #[arg(short, long)]
        timeout: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(executable) = cli.executable {
        config.engine.executable = Some(executable);
    }
    if let Some(level) = cli.log_level {
        config.logging.level = level.trim().to_lowercase();
    }
    config.validate()?;

    logging::init(&config.logging.level);

    match cli.command.unwrap_or(Commands::Mcp) {
        Commands::Mcp => mcp_server::start_mcp_server(ErgoEngine::from_config(&config)).await,
        Commands::Doctor => {
            commands::doctor::run(&config).await;
            Ok(())
        }
        Commands::Query {
            query,
            module,
            timeout,
            working_directory,
        } => commands::query::run(&config, query, module, timeout, working_directory).await,
        Commands::Check { file, timeout } => commands::check::run(&config, &file, timeout).await,
    }
}
