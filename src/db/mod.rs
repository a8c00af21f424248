//! Database layer for the Pro IRP server.

pub mod clients;
pub mod risk;
pub mod stats;
pub mod tasks;
pub mod users;

use anyhow::{Result, anyhow};
use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::types::MAX_COMMS_PER_CLIENT;

mod embedded {
    use refinery::embed_migrations;
    embed_migrations!("migrations");
}

/// A schema migration known to the binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationInfo {
    pub version: i32,
    pub name: String,
    pub applied: bool,
}

/// Database handle wrapping a SQLite connection.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
    max_comms: usize,
}

impl Database {
    /// Open or create the database at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let db = Self::connect(path)?;
        db.run_migrations()?;
        Ok(db)
    }

    /// Open the database file without applying migrations.
    pub fn connect<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;

        // Enable WAL mode for concurrent access
        conn.execute_batch(
            "PRAGMA journal_mode=WAL;
             PRAGMA foreign_keys=ON;
             PRAGMA busy_timeout=5000;",
        )?;

        Ok(Self::from_connection(conn))
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;

        let db = Self::from_connection(conn);
        db.run_migrations()?;
        Ok(db)
    }

    fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
            max_comms: MAX_COMMS_PER_CLIENT,
        }
    }

    /// Override the per-client comms cap used by the client tables.
    pub fn with_max_comms(mut self, max_comms: usize) -> Self {
        self.max_comms = max_comms.max(1);
        self
    }

    pub fn max_comms(&self) -> usize {
        self.max_comms
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("database connection lock poisoned"))
    }

    /// Run pending migrations, returning the names of those applied now.
    pub fn run_migrations(&self) -> Result<Vec<String>> {
        let mut conn = self.lock()?;
        let report = embedded::migrations::runner().run(&mut *conn)?;
        Ok(report
            .applied_migrations()
            .iter()
            .map(|m| format!("V{}__{}", m.version(), m.name()))
            .collect())
    }

    /// Every embedded migration and whether it has been applied.
    pub fn migration_status(&self) -> Result<Vec<MigrationInfo>> {
        let mut conn = self.lock()?;
        let runner = embedded::migrations::runner();
        let applied: Vec<i32> = runner
            .get_applied_migrations(&mut *conn)?
            .iter()
            .map(|m| m.version())
            .collect();
        let mut all: Vec<MigrationInfo> = runner
            .get_migrations()
            .iter()
            .map(|m| MigrationInfo {
                version: m.version(),
                name: m.name().to_string(),
                applied: applied.contains(&m.version()),
            })
            .collect();
        all.sort_by_key(|m| m.version);
        Ok(all)
    }

    /// Execute a function with exclusive access to the connection.
    pub fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self.lock()?;
        f(&conn)
    }
}

/// Get the current timestamp in milliseconds.
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
