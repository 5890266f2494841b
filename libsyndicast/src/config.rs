//! Configuration management for Syndicast

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{ConfigError, Result};

pub const DEFAULT_DOMAIN: &str = "https://bsky.social";
pub const DEFAULT_POST_TYPE: &str = "post";

/// Upper bound for any configured duration (100 years)
const MAX_DURATION: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub bluesky: BlueskyConfig,
    #[serde(default)]
    pub syndication: SyndicationConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "~/.local/share/syndicast/syndicast.db".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlueskyConfig {
    /// PDS used until a domain has been stored through `connect`
    #[serde(default = "default_domain")]
    pub domain: String,
    /// HTTP request timeout, humantime format
    #[serde(default = "default_timeout")]
    pub timeout: String,
}

impl Default for BlueskyConfig {
    fn default() -> Self {
        Self {
            domain: default_domain(),
            timeout: default_timeout(),
        }
    }
}

impl BlueskyConfig {
    pub fn timeout(&self) -> Result<Duration> {
        parse_humantime("bluesky.timeout", &self.timeout)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyndicationConfig {
    /// Base allow-list, still filtered through the post-types hook
    #[serde(default = "default_post_types")]
    pub post_types: Vec<String>,
}

impl Default for SyndicationConfig {
    fn default() -> Self {
        Self {
            post_types: default_post_types(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval: String,
    #[serde(default = "default_poll_interval")]
    pub poll_interval: String,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            refresh_interval: default_refresh_interval(),
            poll_interval: default_poll_interval(),
        }
    }
}

impl ScheduleConfig {
    pub fn refresh_interval(&self) -> Result<Duration> {
        parse_humantime("schedule.refresh_interval", &self.refresh_interval)
    }

    pub fn poll_interval(&self) -> Result<Duration> {
        parse_humantime("schedule.poll_interval", &self.poll_interval)
    }
}

fn default_domain() -> String {
    DEFAULT_DOMAIN.to_string()
}

fn default_timeout() -> String {
    "5s".to_string()
}

fn default_post_types() -> Vec<String> {
    vec![DEFAULT_POST_TYPE.to_string()]
}

fn default_refresh_interval() -> String {
    "1d".to_string()
}

fn default_poll_interval() -> String {
    "60s".to_string()
}

fn parse_humantime(field: &str, value: &str) -> Result<Duration> {
    let duration = humantime::parse_duration(value).map_err(|e| ConfigError::InvalidValue {
        field: field.to_string(),
        reason: e.to_string(),
    })?;

    if duration.is_zero() {
        return Err(ConfigError::InvalidValue {
            field: field.to_string(),
            reason: "duration must be greater than zero".to_string(),
        }
        .into());
    }

    if duration > MAX_DURATION {
        return Err(ConfigError::InvalidValue {
            field: field.to_string(),
            reason: format!(
                "duration must be at most {}",
                humantime::format_duration(MAX_DURATION)
            ),
        }
        .into());
    }

    Ok(duration)
}

impl Config {
    /// Load configuration, falling back to defaults when no file exists yet
    pub fn load_or_default() -> Result<Self> {
        let config_path = resolve_config_path()?;
        if !config_path.exists() {
            tracing::debug!("No config at {}, using defaults", config_path.display());
            return Ok(Self::default());
        }
        Self::load_from_path(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadError)?;
        let config: Config = toml::from_str(&content).map_err(ConfigError::ParseError)?;
        config.validate()?;
        Ok(config)
    }

    /// Write configuration as TOML, creating parent directories
    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(ConfigError::ReadError)?;
        }
        let content = toml::to_string_pretty(self).map_err(ConfigError::SerializeError)?;
        std::fs::write(path, content).map_err(ConfigError::ReadError)?;
        Ok(())
    }

    /// Check every humantime field parses
    pub fn validate(&self) -> Result<()> {
        self.bluesky.timeout()?;
        self.schedule.refresh_interval()?;
        self.schedule.poll_interval()?;

        if self.database.path.trim().is_empty() {
            return Err(ConfigError::MissingField("database.path".to_string()).into());
        }

        Ok(())
    }

    /// Database path with `~` expanded
    pub fn database_path(&self) -> String {
        shellexpand::tilde(&self.database.path).to_string()
    }
}

/// Resolve the configuration file path (XDG config dir unless overridden)
pub fn resolve_config_path() -> Result<PathBuf> {
    if let Ok(path) = std::env::var("SYNDICAST_CONFIG") {
        return Ok(PathBuf::from(shellexpand::tilde(&path).to_string()));
    }

    let config_dir = dirs::config_dir()
        .ok_or_else(|| ConfigError::MissingField("config directory".to_string()))?;

    Ok(config_dir.join("syndicast").join("config.toml"))
}
