//! Configuration file and environment overrides.

use crate::error::{Result, SyncError};
use crate::state::default_state_path;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Longest allowed delay between watch passes: one week.
pub const MAX_INTERVAL_MINUTES: u64 = 7 * 24 * 60;

/// Environment variables that override the configuration file.
pub mod env_vars {
    pub const NOTION_TOKEN: &str = "NOTION_TOKEN";
    pub const NOTION_DATABASE_ID: &str = "NOTION_DATABASE_ID";
    pub const VAULT_PATH: &str = "OBSIDIAN_VAULT_PATH";
    pub const SYNC_INTERVAL_MINUTES: &str = "SYNC_INTERVAL_MINUTES";
    pub const LOG_LEVEL: &str = "LOG_LEVEL";
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Root of the vault to sync.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vault_path: Option<PathBuf>,

    /// Sync state file. Derived from the vault path when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state_path: Option<PathBuf>,

    /// Minutes between passes in watch mode.
    pub interval_minutes: u64,

    /// Default log filter.
    pub log_level: String,

    /// Vault-relative globs of notes never synced.
    pub exclude: Vec<String>,

    /// Reuse an existing page with the same title instead of creating one.
    pub adopt_existing_pages: bool,

    pub notion: NotionConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            vault_path: None,
            state_path: None,
            interval_minutes: 60,
            log_level: "info".to_string(),
            exclude: Vec::new(),
            adopt_existing_pages: true,
            notion: NotionConfig::default(),
        }
    }
}

/// Notion connection and database property names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotionConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub database_id: Option<String>,

    /// Title property of the database.
    pub title_property: String,

    /// Multi-select property receiving the tags.
    pub tags_property: String,

    /// Date property receiving the note date.
    pub date_property: String,
}

impl Default for NotionConfig {
    fn default() -> Self {
        Self {
            token: None,
            database_id: None,
            title_property: "Name".to_string(),
            tags_property: "Tags".to_string(),
            date_property: "Date".to_string(),
        }
    }
}

/// Default configuration file: `<config dir>/vaultsync/config.toml`.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from(".config"))
        .join("vaultsync")
        .join("config.toml")
}

impl Config {
    /// Load configuration from `path`, or from the default location.
    ///
    /// A missing default file yields the defaults; a missing explicit file
    /// is an error. Environment overrides are applied afterwards.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                if !path.is_file() {
                    return Err(SyncError::ConfigError(format!(
                        "config file not found at {}",
                        path.display()
                    )));
                }
                Self::from_file(path)?
            }
            None => {
                let path = default_config_path();
                if path.is_file() {
                    Self::from_file(&path)?
                } else {
                    Self::default()
                }
            }
        };

        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Parse a TOML configuration file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            SyncError::ConfigError(format!("failed to read {}: {}", path.display(), e))
        })?;
        Ok(toml::from_str(&content)?)
    }

    /// Apply environment overrides through `lookup`. Empty values are ignored.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(token) = get(env_vars::NOTION_TOKEN) {
            self.notion.token = Some(token);
        }
        if let Some(id) = get(env_vars::NOTION_DATABASE_ID) {
            self.notion.database_id = Some(id);
        }
        if let Some(path) = get(env_vars::VAULT_PATH) {
            self.vault_path = Some(PathBuf::from(path));
        }
        if let Some(minutes) = get(env_vars::SYNC_INTERVAL_MINUTES) {
            self.interval_minutes = minutes.trim().parse().map_err(|_| {
                SyncError::ConfigError(format!(
                    "{} must be a whole number of minutes, got '{}'",
                    env_vars::SYNC_INTERVAL_MINUTES,
                    minutes
                ))
            })?;
        }
        if let Some(level) = get(env_vars::LOG_LEVEL) {
            self.log_level = level;
        }
        Ok(())
    }

    /// The configured vault root.
    pub fn vault_root(&self) -> Result<&Path> {
        self.vault_path.as_deref().ok_or_else(|| {
            SyncError::ConfigError(format!(
                "no vault configured (set vault_path, {} or --vault)",
                env_vars::VAULT_PATH
            ))
        })
    }

    /// State file for the vault at `vault_root`.
    pub fn state_path_for(&self, vault_root: &Path) -> PathBuf {
        self.state_path
            .clone()
            .unwrap_or_else(|| default_state_path(vault_root))
    }

    /// Delay between passes in watch mode.
    pub fn interval(&self) -> Result<Duration> {
        if !(1..=MAX_INTERVAL_MINUTES).contains(&self.interval_minutes) {
            return Err(SyncError::ConfigError(format!(
                "interval_minutes must be between 1 and {}, got {}",
                MAX_INTERVAL_MINUTES, self.interval_minutes
            )));
        }
        Ok(Duration::from_secs(self.interval_minutes * 60))
    }
}
