//! Pro IRP server binary.

use anyhow::{Context, Result};
use clap::Parser;
use pro_irp::api::{AppState, start_server};
use pro_irp::cli::{Cli, Command, export, import, migrate};
use pro_irp::config::{Config, ConfigLoader, ConfigPaths};
use pro_irp::db::Database;
use pro_irp::logging::init_logging;
use pro_irp::store::{ClientStore, open_client_store};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log, cli.verbose)?;

    // An explicit --config takes the place of PRO_IRP_CONFIG_PATH
    let explicit = cli.config.clone();
    let mut loader = ConfigLoader::load_with(ConfigPaths::discover(), |key| match key {
        "PRO_IRP_CONFIG_PATH" if explicit.is_some() => explicit.clone(),
        _ => std::env::var(key).ok(),
    })?;
    for source in loader.sources() {
        info!(path = %source.display(), "Loaded config");
    }
    cli.apply_overrides(loader.config_mut());
    let config = loader.into_config();
    config.validate()?;

    match cli.command {
        Some(Command::Migrate(args)) => {
            config.ensure_dirs()?;
            migrate::run_migrate(&config.storage.db_path, &args)?;
        }
        Some(Command::Export(args)) => {
            let (_, store) = open_stores(&config)?;
            export::run_export(store.as_ref(), &args).await?;
        }
        Some(Command::Import(args)) => {
            let (_, store) = open_stores(&config)?;
            import::run_import(store.as_ref(), &args).await?;
        }
        Some(Command::Serve) | None => {
            run_server(config).await?;
        }
    }

    Ok(())
}

/// Open the application database and the configured client store.
fn open_stores(config: &Config) -> Result<(Arc<Database>, Arc<dyn ClientStore>)> {
    config.ensure_dirs()?;
    let db = Database::open(&config.storage.db_path).with_context(|| {
        format!(
            "cannot open database {}",
            config.storage.db_path.display()
        )
    })?;
    let db = Arc::new(db.with_max_comms(config.storage.max_comms));
    let store = open_client_store(&config.storage, &db)?;
    Ok((db, store))
}

async fn run_server(config: Config) -> Result<()> {
    let (db, store) = open_stores(&config)?;
    info!(
        db = %config.storage.db_path.display(),
        backend = ?config.storage.backend,
        "Storage ready"
    );

    let addr: SocketAddr = format!("{}:{}", config.server.bind, config.server.port)
        .parse()
        .with_context(|| {
            format!(
                "invalid listen address {}:{}",
                config.server.bind, config.server.port
            )
        })?;

    let state = AppState::new(config, db, store)?;
    let (shutdown_tx, bound) = start_server(state, addr).await?;
    info!("Pro IRP listening on http://{}", bound);

    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl-C: {}", e);
    }
    info!("Shutting down");
    let _ = shutdown_tx.send(());
    Ok(())
}
