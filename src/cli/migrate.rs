//! Schema migration command.

use anyhow::Result;
use clap::Args;
use std::path::Path;

use crate::db::{Database, MigrationInfo};

/// Arguments for the migrate command.
#[derive(Args, Debug)]
pub struct MigrateArgs {
    /// Show migration status without applying anything.
    #[arg(long)]
    pub status: bool,
}

/// Run the migrate command against the database at `db_path`.
pub fn run_migrate(db_path: &Path, args: &MigrateArgs) -> Result<()> {
    let db = Database::connect(db_path)?;

    if !args.status {
        let applied = db.run_migrations()?;
        if applied.is_empty() {
            println!("Database is up to date: {}", db_path.display());
        } else {
            for name in &applied {
                println!("Applied {}", name);
            }
        }
    }

    let status = db.migration_status()?;
    print!("{}", format_status(&status));
    Ok(())
}

/// One line per known migration.
pub fn format_status(migrations: &[MigrationInfo]) -> String {
    let mut out = String::new();
    for m in migrations {
        let mark = if m.applied { "applied" } else { "pending" };
        out.push_str(&format!("V{}__{}  {}\n", m.version, m.name, mark));
    }
    out
}
