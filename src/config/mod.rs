//! Layered configuration.
//!
//! Tiers, lowest priority first, merged field by field:
//! 1. **Defaults** - compiled in
//! 2. **Project** - `$CWD/pro-irp/config.yaml`
//! 3. **User** - `~/.pro-irp/config.yaml`
//! 4. **Environment** - variables below
//! 5. **CLI** - `serve` flags, applied by the caller
//!
//! ## Environment Variables
//! - `PRO_IRP_CONFIG_PATH` - Explicit config file (replaces the file tiers)
//! - `PRO_IRP_DB_PATH` - SQLite database path
//! - `PRO_IRP_DATA_DIR` - Directory for `clients.json`
//! - `PRO_IRP_FILES_DIR` - Upload directory
//! - `PRO_IRP_STORE` - Client store backend (`sqlite` or `json`)
//! - `PRO_IRP_BIND`, `PRO_IRP_PORT` (or `PORT`) - Listen address
//! - `PRO_IRP_JWT_SECRET` - Session signing secret
//! - `PRO_IRP_CORS_ORIGINS` - Comma-separated allowed origins
//! - `PRO_IRP_COOKIE_SECURE` - Mark cookies `Secure`
//! - `PRO_IRP_USER_DIR`, `PRO_IRP_PROJECT_DIR` - Override tier directories

mod loader;
mod merge;
mod types;

pub use loader::{ConfigLoader, ConfigPaths, ConfigTier};
pub use merge::deep_merge;
pub use types::*;
