//! Import subcommand.
//!
//! Loads a JSON array of clients (an `export` file or a legacy
//! `clients.json`, optionally gzipped) into the configured store. Clients
//! whose id already exists are skipped; a record the store rejects is
//! counted and logged, and the import carries on.

use anyhow::{Context, Result};
use clap::Args;
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::store::ClientStore;
use crate::types::Client;

/// Arguments for the import subcommand
#[derive(Args, Debug)]
pub struct ImportArgs {
    /// Path to the file to import
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Owner for records that carry no userId
    #[arg(short, long, value_name = "USER_ID")]
    pub user: Option<String>,

    /// Report what would be imported without modifying the store
    #[arg(long)]
    pub dry_run: bool,
}

/// Outcome of an import.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ImportReport {
    pub imported: usize,
    pub existing: usize,
    pub unowned: usize,
    pub failed: usize,
}

impl std::fmt::Display for ImportReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} imported, {} already present, {} without owner, {} failed",
            self.imported, self.existing, self.unowned, self.failed
        )
    }
}

/// Read clients from a plain or gzip-compressed JSON file.
pub fn read_clients(path: &Path) -> Result<Vec<Client>> {
    let mut bytes = Vec::new();
    File::open(path)
        .with_context(|| format!("cannot open {}", path.display()))?
        .read_to_end(&mut bytes)?;

    let clients = if bytes.starts_with(&[0x1f, 0x8b]) {
        let decoder = flate2::read::GzDecoder::new(BufReader::new(bytes.as_slice()));
        serde_json::from_reader(decoder)
    } else {
        serde_json::from_slice(&bytes)
    };
    clients.with_context(|| format!("{} is not a JSON array of clients", path.display()))
}

/// Import `clients` into `store`, filling in `owner` where no userId is set.
pub async fn import_clients(
    store: &dyn ClientStore,
    clients: Vec<Client>,
    owner: Option<&str>,
    dry_run: bool,
) -> Result<ImportReport> {
    let mut report = ImportReport::default();
    let mut known: HashSet<String> = if dry_run {
        store
            .all_clients()
            .await?
            .into_iter()
            .map(|c| c.id)
            .collect()
    } else {
        HashSet::new()
    };

    for mut client in clients {
        if client.user_id.is_empty() {
            match owner {
                Some(owner) => client.user_id = owner.to_string(),
                None => {
                    warn!(client_id = %client.id, "Skipping client without userId");
                    report.unowned += 1;
                    continue;
                }
            }
        }

        let inserted = if dry_run {
            known.insert(client.id.clone())
        } else {
            let client_id = client.id.clone();
            match store.import_client(client).await {
                Ok(inserted) => inserted,
                Err(e) => {
                    warn!(client_id = %client_id, error = %e, "Failed to import client");
                    report.failed += 1;
                    continue;
                }
            }
        };
        if inserted {
            report.imported += 1;
        } else {
            report.existing += 1;
        }
    }
    Ok(report)
}

/// Run the import command.
pub async fn run_import(store: &dyn ClientStore, args: &ImportArgs) -> Result<ImportReport> {
    let clients = read_clients(&args.file)?;
    info!(file = %args.file.display(), count = clients.len(), "Importing clients");

    let report = import_clients(store, clients, args.user.as_deref(), args.dry_run).await?;
    if args.dry_run {
        eprintln!("Dry run: {}", report);
    } else {
        eprintln!("Import complete: {}", report);
    }
    Ok(report)
}
