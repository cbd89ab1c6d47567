//! # Recorder CLI Module
//!
//! This module implements the CLI interface for the blueprint recorder.
//!
//! ## Available Commands
//!
//! - `server` - Start the HTTP server
//! - `status` - Show blueprint status
//! - `show` - Print the cleaned blueprint (and the seed if it differs)
//! - `url` - Print the playground handoff URL
//! - `apply` - Replay recorded hook invocations from a file
//! - `export` - Write the cleaned blueprint to a file
//! - `init` - Initialize (or reset) the settings database

mod commands;

use crate::config::Config;
use clap::{Parser, Subcommand};
use recorder_core::{RecorderError, primitives::SEED_FILE_NAME};
use std::path::{Path, PathBuf};

pub use commands::*;

const DEFAULT_DATABASE: &str = "recorder.db";
const DEFAULT_BACKEND: &str = "redb";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 8080;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// Blueprint Recorder
///
/// Watches a WordPress site's hooks and writes what changed as a
/// replayable playground blueprint.
#[derive(Parser, Debug)]
#[command(name = "recorder")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to the settings database [default: recorder.db]
    #[arg(short = 'D', long, global = true)]
    pub database: Option<PathBuf>,

    /// Storage backend: "redb" (ACID database) or "memory" (volatile) [default: redb]
    #[arg(short = 'B', long, global = true)]
    pub backend: Option<String>,

    /// Seed blueprint file [default: blueprint.json next to the database]
    #[arg(short = 'S', long, global = true)]
    pub seed: Option<PathBuf>,

    /// TOML configuration file
    #[arg(short = 'c', long, global = true)]
    pub config: Option<PathBuf>,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start HTTP server
    Server {
        /// Host to bind to [default: 127.0.0.1]
        #[arg(short = 'H', long)]
        host: Option<String>,

        /// Port to bind to [default: 8080]
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Show blueprint status
    Status,

    /// Print the cleaned blueprint
    Show,

    /// Print the playground handoff URL
    Url {
        /// Link to the blueprint builder instead of the playground
        #[arg(short, long)]
        builder: bool,
    },

    /// Replay hook invocations from a JSON file
    Apply {
        /// JSON array of `{"hook": ..., "args": ..., "context": ...}`
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Write the cleaned blueprint to a file
    Export {
        /// Output file path
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Initialize the settings database
    Init {
        /// Discard the recorded blueprint and start again from the seed
        #[arg(short, long)]
        force: bool,
    },
}

// =============================================================================
// SETTINGS RESOLUTION
// =============================================================================

/// Effective settings after merging flags, config file and defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub database: PathBuf,
    pub backend: String,
    pub seed: PathBuf,
    pub host: String,
    pub port: u16,
}

impl Settings {
    /// Flags win over the config file; the file wins over defaults.
    pub fn resolve(cli: &Cli, config: &Config) -> Self {
        let database = cli
            .database
            .clone()
            .or_else(|| config.storage.database.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATABASE));
        let backend = cli
            .backend
            .clone()
            .or_else(|| config.storage.backend.clone())
            .unwrap_or_else(|| DEFAULT_BACKEND.to_string());
        let seed = cli
            .seed
            .clone()
            .or_else(|| config.storage.seed.clone())
            .unwrap_or_else(|| default_seed_path(&database));

        let (host, port) = match &cli.command {
            Some(Commands::Server { host, port }) => (host.clone(), *port),
            _ => (None, None),
        };

        Self {
            database,
            backend,
            seed,
            host: host
                .or_else(|| config.server.host.clone())
                .unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: port.or(config.server.port).unwrap_or(DEFAULT_PORT),
        }
    }
}

/// `blueprint.json` in the database's directory.
pub fn default_seed_path(database: &Path) -> PathBuf {
    match database.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.join(SEED_FILE_NAME),
        _ => PathBuf::from(SEED_FILE_NAME),
    }
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub async fn execute(cli: Cli) -> Result<(), RecorderError> {
    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    let settings = Settings::resolve(&cli, &config);
    let json_mode = cli.json_mode;

    if cli.verbose {
        tracing::info!(
            database = %settings.database.display(),
            backend = %settings.backend,
            seed = %settings.seed.display(),
            "Resolved settings"
        );
    }

    match cli.command {
        Some(Commands::Server { .. }) => cmd_server(&settings).await,
        Some(Commands::Status) => cmd_status(&settings, json_mode),
        Some(Commands::Show) => cmd_show(&settings),
        Some(Commands::Url { builder }) => cmd_url(&settings, builder),
        Some(Commands::Apply { file }) => cmd_apply(&settings, json_mode, &file),
        Some(Commands::Export { output }) => cmd_export(&settings, &output),
        Some(Commands::Init { force }) => cmd_init(&settings, force),
        None => {
            // No subcommand - show status by default
            cmd_status(&settings, json_mode)
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
