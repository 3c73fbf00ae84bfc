//! Agent Sidebar - CLI entry point
//!
//! Connects to the session producer's socket and shows the live, grouped,
//! branch-aware session list in the terminal.

mod commands;

use agent_sidebar::config::{Config, ConfigLoader, LogLevel};
use agent_sidebar::logging;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

/// Agent Sidebar
#[derive(Parser)]
#[command(name = "asb")]
#[command(version, about = "Live, branch-aware view of agent sessions")]
struct Cli {
    /// Producer socket path (overrides the config file)
    #[arg(long, global = true)]
    socket: Option<PathBuf>,

    /// Configuration file (defaults to the XDG location)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands for the asb CLI
#[derive(Subcommand)]
enum Commands {
    /// Stream the grouped session view until interrupted
    Watch,

    /// Print the grouped session view once
    List {
        /// How long to wait for the producer
        #[arg(long, default_value = "3s", value_parser = humantime::parse_duration)]
        timeout: Duration,
    },

    /// Switch tmux to the session that most needs attention
    Focus {
        /// How long to wait for the producer
        #[arg(long, default_value = "3s", value_parser = humantime::parse_duration)]
        timeout: Duration,
    },

    /// Hand one session's branch to another session's checkout to merge
    Merge {
        /// Session whose branch is merged
        source: String,
        /// Session whose checkout receives the merge
        target: String,
        /// How long to wait for the producer
        #[arg(long, default_value = "3s", value_parser = humantime::parse_duration)]
        timeout: Duration,
    },

    /// Manage configuration file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Actions for the `config` subcommand.
#[derive(Subcommand)]
enum ConfigAction {
    /// Show configuration file path
    Path,
    /// Validate configuration file
    Validate,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Config { action } => {
            logging::init(LogLevel::default());
            match action {
                ConfigAction::Path => commands::run_config_path(config_path),
                ConfigAction::Validate => commands::run_config_validate(config_path),
            }
        }
        Commands::Watch => match prepare(config_path, cli.socket) {
            Ok((config, socket, retry)) => commands::run_watch(&config, socket, retry),
            Err(code) => code,
        },
        Commands::List { timeout } => match prepare(config_path, cli.socket) {
            Ok((config, socket, retry)) => commands::run_list(&config, socket, retry, timeout),
            Err(code) => code,
        },
        Commands::Focus { timeout } => match prepare(config_path, cli.socket) {
            Ok((config, socket, retry)) => commands::run_focus(&config, socket, retry, timeout),
            Err(code) => code,
        },
        Commands::Merge {
            source,
            target,
            timeout,
        } => match prepare(config_path, cli.socket) {
            Ok((config, socket, retry)) => {
                commands::run_merge(&config, socket, retry, timeout, &source, &target)
            }
            Err(code) => code,
        },
    }
}

/// Loads configuration, starts logging, and resolves connection settings.
fn prepare(config_path: Option<&Path>, socket: Option<PathBuf>) -> Result<(Config, PathBuf, Duration), ExitCode> {
    let config = ConfigLoader::load(config_path).map_err(|e| {
        eprintln!("Config error: {e}");
        ExitCode::FAILURE
    })?;
    logging::init(config.logging.level);

    let retry = config.retry_interval().map_err(|e| {
        eprintln!("Config error: {e}");
        ExitCode::FAILURE
    })?;
    let socket = resolve_socket(socket, &config);
    Ok((config, socket, retry))
}

/// `--socket` wins over the configured path.
fn resolve_socket(flag: Option<PathBuf>, config: &Config) -> PathBuf {
    flag.unwrap_or_else(|| config.socket_path())
}
