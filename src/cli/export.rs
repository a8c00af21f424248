//! Export subcommand.
//!
//! Dumps every client of every user from the configured store as a JSON
//! array, the same shape the JSON backend keeps on disk.

use anyhow::Result;
use clap::Args;
use flate2::Compression;
use flate2::write::GzEncoder;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::store::ClientStore;

/// Arguments for the export subcommand
#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Output file path (default: stdout)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Force gzip compression (auto-detected from .gz extension otherwise)
    #[arg(long)]
    pub gzip: bool,
}

impl ExportArgs {
    /// Whether output should be gzip compressed.
    pub fn should_compress(&self) -> bool {
        self.gzip || self.output.as_deref().is_some_and(has_gz_extension)
    }
}

fn has_gz_extension(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("gz"))
}

/// Run the export command. Returns the number of exported clients.
pub async fn run_export(store: &dyn ClientStore, args: &ExportArgs) -> Result<usize> {
    let clients = store.all_clients().await?;
    let json = serde_json::to_string_pretty(&clients)?;
    let compress = args.should_compress();

    match &args.output {
        Some(path) => {
            let file = std::fs::File::create(path)?;
            write_output(file, json.as_bytes(), compress)?;
            eprintln!(
                "Exported {} clients to {}{}",
                clients.len(),
                path.display(),
                if compress { " (gzipped)" } else { "" }
            );
        }
        None => {
            let stdout = std::io::stdout();
            write_output(stdout.lock(), json.as_bytes(), compress)?;
        }
    }
    Ok(clients.len())
}

fn write_output<W: Write>(mut out: W, bytes: &[u8], compress: bool) -> Result<()> {
    if compress {
        let mut encoder = GzEncoder::new(out, Compression::default());
        encoder.write_all(bytes)?;
        encoder.finish()?.flush()?;
    } else {
        out.write_all(bytes)?;
        out.flush()?;
    }
    Ok(())
}
