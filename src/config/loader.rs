//! Configuration loader with tier-based merging.
//!
//! Loads configuration from multiple tiers and merges them field-by-field.

use super::merge::deep_merge_all;
use super::types::{Config, StorageBackend};
use anyhow::{Context, Result};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Configuration tier priority (lowest to highest).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ConfigTier {
    /// Embedded defaults (lowest priority)
    Defaults = 0,
    /// Project-level config ($CWD/pro-irp/)
    Project = 1,
    /// User-level config (~/.pro-irp/)
    User = 2,
    /// Environment variables
    Environment = 3,
    /// Command-line flags (highest priority)
    Cli = 4,
}

impl std::fmt::Display for ConfigTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigTier::Defaults => write!(f, "defaults"),
            ConfigTier::Project => write!(f, "project"),
            ConfigTier::User => write!(f, "user"),
            ConfigTier::Environment => write!(f, "environment"),
            ConfigTier::Cli => write!(f, "cli"),
        }
    }
}

/// Paths for each configuration tier.
#[derive(Debug, Clone)]
pub struct ConfigPaths {
    /// Project-level config directory
    pub project_dir: Option<PathBuf>,
    /// User-level config directory
    pub user_dir: Option<PathBuf>,
}

impl Default for ConfigPaths {
    fn default() -> Self {
        Self::discover()
    }
}

impl ConfigPaths {
    /// Discover configuration paths from environment and defaults.
    pub fn discover() -> Self {
        // User dir: PRO_IRP_USER_DIR or ~/.pro-irp
        let user_dir = std::env::var("PRO_IRP_USER_DIR")
            .ok()
            .map(PathBuf::from)
            .or_else(|| dirs::home_dir().map(|h| h.join(".pro-irp")));

        // Project dir: PRO_IRP_PROJECT_DIR or $CWD/pro-irp
        let project_dir = std::env::var("PRO_IRP_PROJECT_DIR")
            .ok()
            .map(PathBuf::from)
            .or_else(|| Some(PathBuf::from("pro-irp")));

        Self {
            project_dir,
            user_dir,
        }
    }

    /// Create paths with explicit directories.
    pub fn with_dirs(project_dir: Option<PathBuf>, user_dir: Option<PathBuf>) -> Self {
        Self {
            project_dir,
            user_dir,
        }
    }
}

/// Configuration loader that handles tier-based merging.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    /// Paths for each tier
    pub paths: ConfigPaths,
    /// Loaded configuration
    config: Config,
    /// Config files that contributed, lowest tier first
    sources: Vec<PathBuf>,
}

impl ConfigLoader {
    /// Load configuration with explicit paths and an environment lookup.
    pub fn load_with<F>(paths: ConfigPaths, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Explicit config file replaces the file tiers
        if let Some(explicit_path) = env("PRO_IRP_CONFIG_PATH") {
            let path = PathBuf::from(&explicit_path);
            let mut config = Config::load(&path)
                .with_context(|| format!("Failed to load config file {}", path.display()))?;
            Self::apply_env_overrides(&mut config, &env);
            return Ok(Self {
                paths,
                config,
                sources: vec![path],
            });
        }

        let mut configs: Vec<Value> = Vec::new();
        let mut sources = Vec::new();

        // Tier 1: Defaults (embedded)
        configs.push(serde_json::to_value(Config::default())?);
        debug!(tier = %ConfigTier::Defaults, "Loaded config tier");

        // Tier 2: Project config
        if let Some(ref project_dir) = paths.project_dir
            && let Some(value) = read_tier(&project_dir.join("config.yaml"), ConfigTier::Project)
        {
            configs.push(value);
            sources.push(project_dir.join("config.yaml"));
        }

        // Tier 3: User config
        if let Some(ref user_dir) = paths.user_dir
            && let Some(value) = read_tier(&user_dir.join("config.yaml"), ConfigTier::User)
        {
            configs.push(value);
            sources.push(user_dir.join("config.yaml"));
        }

        let merged = deep_merge_all(configs);
        let mut config: Config =
            serde_json::from_value(merged).context("Invalid configuration")?;

        // Tier 4: Environment variable overrides
        Self::apply_env_overrides(&mut config, &env);

        Ok(Self {
            paths,
            config,
            sources,
        })
    }

    /// Apply environment variable overrides to config.
    ///
    /// Returns the config fields that were overridden.
    fn apply_env_overrides<F>(config: &mut Config, env: &F) -> Vec<&'static str>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut applied = Vec::new();

        if let Some(db_path) = env("PRO_IRP_DB_PATH") {
            config.storage.db_path = PathBuf::from(db_path);
            applied.push("storage.db_path");
        }

        if let Some(data_dir) = env("PRO_IRP_DATA_DIR") {
            config.storage.data_dir = PathBuf::from(data_dir);
            applied.push("storage.data_dir");
        }

        if let Some(files_dir) = env("PRO_IRP_FILES_DIR") {
            config.storage.files_dir = PathBuf::from(files_dir);
            applied.push("storage.files_dir");
        }

        if let Some(backend) = env("PRO_IRP_STORE") {
            match StorageBackend::from_str(&backend) {
                Some(b) => {
                    config.storage.backend = b;
                    applied.push("storage.backend");
                }
                None => warn!(value = %backend, "Ignoring unknown PRO_IRP_STORE"),
            }
        }

        if let Some(bind) = env("PRO_IRP_BIND") {
            config.server.bind = bind;
            applied.push("server.bind");
        }

        // PRO_IRP_PORT wins over the conventional PORT
        if let Some(port) = env("PRO_IRP_PORT").or_else(|| env("PORT")) {
            match port.trim().parse() {
                Ok(p) => {
                    config.server.port = p;
                    applied.push("server.port");
                }
                Err(_) => warn!(value = %port, "Ignoring invalid port"),
            }
        }

        if let Some(secret) = env("PRO_IRP_JWT_SECRET")
            && !secret.is_empty()
        {
            config.auth.jwt_secret = Some(secret);
            applied.push("auth.jwt_secret");
        }

        if let Some(origins) = env("PRO_IRP_CORS_ORIGINS") {
            config.server.cors_origins = origins
                .split(',')
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .map(String::from)
                .collect();
            applied.push("server.cors_origins");
        }

        if let Some(secure) = env("PRO_IRP_COOKIE_SECURE") {
            config.auth.cookie_secure = matches!(
                secure.trim().to_lowercase().as_str(),
                "1" | "true" | "yes" | "on"
            );
            applied.push("auth.cookie_secure");
        }

        if !applied.is_empty() {
            debug!(tier = %ConfigTier::Environment, fields = ?applied, "Applied config overrides");
        }
        applied
    }

    /// Get the loaded configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get mutable access to the configuration.
    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    /// Consume the loader and return the configuration.
    pub fn into_config(self) -> Config {
        self.config
    }

    /// Config files that were merged, lowest tier first.
    pub fn sources(&self) -> &[PathBuf] {
        &self.sources
    }

}

/// Read one tier's YAML file. Missing files are skipped; unreadable ones are logged.
fn read_tier(path: &Path, tier: ConfigTier) -> Option<Value> {
    if !path.exists() {
        return None;
    }
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            warn!(%tier, path = %path.display(), error = %e, "Skipping unreadable config");
            return None;
        }
    };
    match serde_yaml::from_str::<Value>(&content) {
        Ok(Value::Null) => None,
        Ok(value) => {
            debug!(%tier, path = %path.display(), "Loaded config tier");
            Some(value)
        }
        Err(e) => {
            warn!(%tier, path = %path.display(), error = %e, "Skipping invalid config");
            None
        }
    }
}
