//! CLI command definitions for pro-irp.
//!
//! The main entry point is the `Cli` struct; with no subcommand the HTTP
//! server is started.

pub mod export;
pub mod import;
pub mod migrate;

use clap::{Parser, Subcommand, ValueEnum};
use export::ExportArgs;
use import::ImportArgs;
use migrate::MigrateArgs;

use tracing::debug;

use crate::config::{Config, ConfigTier, StorageBackend};

/// Client store backend as given on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StoreArg {
    /// SQLite application database
    Sqlite,
    /// Single JSON file under the data directory
    Json,
}

impl From<StoreArg> for StorageBackend {
    fn from(arg: StoreArg) -> Self {
        match arg {
            StoreArg::Sqlite => StorageBackend::Sqlite,
            StoreArg::Json => StorageBackend::Json,
        }
    }
}

/// Pro IRP server and maintenance tools
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Path to database file (overrides config)
    #[arg(short, long, global = true)]
    pub database: Option<String>,

    /// Data directory for the JSON client store (overrides config)
    #[arg(long, global = true)]
    pub data_dir: Option<String>,

    /// Client store backend (overrides config)
    #[arg(long, value_enum, global = true)]
    pub store: Option<StoreArg>,

    /// Address to bind the HTTP server to
    #[arg(long)]
    pub bind: Option<String>,

    /// Port for the HTTP server (default: 4000)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Logging output: 0/off, 1/stdout, 2/stderr (default), or filename
    #[arg(short, long, default_value = "2", global = true)]
    pub log: String,

    #[command(subcommand)]
    pub command: Option<Command>,
}

impl Cli {
    /// Apply command-line overrides on top of the loaded configuration.
    ///
    /// Returns the config fields that were overridden.
    pub fn apply_overrides(&self, config: &mut Config) -> Vec<&'static str> {
        let mut applied = Vec::new();
        if let Some(db_path) = &self.database {
            config.storage.db_path = db_path.into();
            applied.push("storage.db_path");
        }
        if let Some(data_dir) = &self.data_dir {
            config.storage.data_dir = data_dir.into();
            applied.push("storage.data_dir");
        }
        if let Some(store) = self.store {
            config.storage.backend = store.into();
            applied.push("storage.backend");
        }
        if let Some(bind) = &self.bind {
            config.server.bind = bind.clone();
            applied.push("server.bind");
        }
        if let Some(port) = self.port {
            config.server.port = port;
            applied.push("server.port");
        }
        if !applied.is_empty() {
            debug!(tier = %ConfigTier::Cli, fields = ?applied, "Applied config overrides");
        }
        applied
    }
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the HTTP server (default if no subcommand given)
    Serve,

    /// Apply database migrations or show their status
    Migrate(MigrateArgs),

    /// Export all clients to a JSON file
    Export(ExportArgs),

    /// Import clients from a JSON export or legacy clients.json
    Import(ImportArgs),
}
