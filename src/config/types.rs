//! Configuration types and structures.
//!
//! This module contains all the configuration types used throughout the application.

use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::types::MAX_COMMS_PER_CLIENT;

/// Default port for the HTTP API.
pub const DEFAULT_PORT: u16 = 4000;

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub auth: AuthConfig,
}

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address to bind (default: 127.0.0.1).
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Port to listen on (default: 4000).
    #[serde(default = "default_port")]
    pub port: u16,

    /// Allowed CORS origins. Empty allows any origin without credentials.
    #[serde(default)]
    pub cors_origins: Vec<String>,

    /// Largest accepted upload body in bytes (default: 10 MiB).
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
            cors_origins: Vec::new(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_max_upload_bytes() -> usize {
    10 * 1024 * 1024
}

/// Which backend holds client records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    /// Tables in the SQLite application database (default).
    #[default]
    Sqlite,
    /// A single `clients.json` file under the data directory.
    Json,
}

impl StorageBackend {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "sqlite" | "db" => Some(StorageBackend::Sqlite),
            "json" | "file" => Some(StorageBackend::Json),
            _ => None,
        }
    }
}

/// Storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Client store backend.
    #[serde(default)]
    pub backend: StorageBackend,

    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Directory holding `clients.json` for the JSON backend.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Directory for uploaded client files.
    #[serde(default = "default_files_dir")]
    pub files_dir: PathBuf,

    /// Comms kept per client before the oldest are dropped.
    #[serde(default = "default_max_comms")]
    pub max_comms: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            db_path: default_db_path(),
            data_dir: default_data_dir(),
            files_dir: default_files_dir(),
            max_comms: default_max_comms(),
        }
    }
}

impl StorageConfig {
    /// Path of the JSON client store file.
    pub fn clients_file(&self) -> PathBuf {
        self.data_dir.join("clients.json")
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("data/pro-irp.db")
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_files_dir() -> PathBuf {
    PathBuf::from("data/files")
}

fn default_max_comms() -> usize {
    MAX_COMMS_PER_CLIENT
}

/// Authentication configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Secret for signing session tokens. Generated per process if unset.
    #[serde(default)]
    pub jwt_secret: Option<String>,

    /// Session lifetime in seconds (default: 7 days).
    #[serde(default = "default_token_ttl")]
    pub token_ttl_seconds: i64,

    /// Name of the HttpOnly session cookie.
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,

    /// Name of the script-readable CSRF cookie.
    #[serde(default = "default_csrf_cookie_name")]
    pub csrf_cookie_name: String,

    /// Mark cookies `Secure` (enable behind HTTPS).
    #[serde(default)]
    pub cookie_secure: bool,

    /// Minimum password length at signup.
    #[serde(default = "default_min_password_len")]
    pub min_password_len: usize,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: None,
            token_ttl_seconds: default_token_ttl(),
            cookie_name: default_cookie_name(),
            csrf_cookie_name: default_csrf_cookie_name(),
            cookie_secure: false,
            min_password_len: default_min_password_len(),
        }
    }
}

fn default_token_ttl() -> i64 {
    7 * 24 * 60 * 60
}

fn default_cookie_name() -> String {
    "irp_session".to_string()
}

fn default_csrf_cookie_name() -> String {
    "irp_csrf".to_string()
}

fn default_min_password_len() -> usize {
    8
}

impl Config {
    /// Load configuration from a single YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        // Empty or comment-only files parse as null
        let config: Option<Config> = serde_yaml::from_str(&content)?;
        Ok(config.unwrap_or_default())
    }

    /// Reject settings the server cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.auth.token_ttl_seconds <= 0 {
            return Err(anyhow!("auth.token_ttl_seconds must be positive"));
        }
        if self.auth.min_password_len == 0 {
            return Err(anyhow!("auth.min_password_len must be at least 1"));
        }
        if self.storage.max_comms == 0 {
            return Err(anyhow!("storage.max_comms must be at least 1"));
        }
        if let Some(ref secret) = self.auth.jwt_secret
            && secret.len() < 16
        {
            return Err(anyhow!("auth.jwt_secret must be at least 16 characters"));
        }
        if self.auth.cookie_name == self.auth.csrf_cookie_name {
            return Err(anyhow!(
                "auth.cookie_name and auth.csrf_cookie_name must differ"
            ));
        }
        Ok(())
    }

    /// Ensure the directories the server writes to exist.
    pub fn ensure_dirs(&self) -> Result<()> {
        if let Some(parent) = self.storage.db_path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::create_dir_all(&self.storage.data_dir)?;
        std::fs::create_dir_all(&self.storage.files_dir)?;
        Ok(())
    }
}
