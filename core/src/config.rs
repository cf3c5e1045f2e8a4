//! Configuration management.
//!
//! Stores configuration in JSON format at `~/.zap/config.json`. A missing
//! file means defaults; `ZAP_*` environment variables override file values.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::domain::Runtime;
use crate::error::{Error, Result};

/// Overrides `proc_root`.
pub const ENV_PROC_ROOT: &str = "ZAP_PROC_ROOT";
/// Overrides `refresh_interval`.
pub const ENV_REFRESH_INTERVAL: &str = "ZAP_REFRESH_INTERVAL";

/// Configuration data stored in JSON format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Interactive list refresh interval in seconds.
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval: u64,

    /// Timeout for runtime and service manager commands, in seconds.
    #[serde(default = "default_command_timeout")]
    pub command_timeout_secs: u64,

    /// Mount point of the proc filesystem.
    #[serde(default = "default_proc_root")]
    pub proc_root: PathBuf,

    /// Runtimes queried, in order, by port-based container detection.
    #[serde(default = "default_runtimes")]
    pub runtimes: Vec<Runtime>,
}

fn default_refresh_interval() -> u64 {
    2
}

fn default_command_timeout() -> u64 {
    10
}

fn default_proc_root() -> PathBuf {
    PathBuf::from("/proc")
}

fn default_runtimes() -> Vec<Runtime> {
    vec![Runtime::Docker, Runtime::Podman]
}

impl Default for Config {
    fn default() -> Self {
        Self {
            refresh_interval: default_refresh_interval(),
            command_timeout_secs: default_command_timeout(),
            proc_root: default_proc_root(),
            runtimes: default_runtimes(),
        }
    }
}

impl Config {
    pub fn refresh_duration(&self) -> Duration {
        Duration::from_secs(self.refresh_interval.max(1))
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs.max(1))
    }

    /// Apply `ZAP_*` overrides from the process environment.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_vars(|key| std::env::var(key).ok())
    }

    fn apply_vars(&mut self, var: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(root) = var(ENV_PROC_ROOT).filter(|v| !v.is_empty()) {
            self.proc_root = PathBuf::from(root);
        }

        if let Some(value) = var(ENV_REFRESH_INTERVAL) {
            let interval: u64 = value.trim().parse().map_err(|_| {
                Error::Config(format!(
                    "{} must be a number of seconds, got {:?}",
                    ENV_REFRESH_INTERVAL, value
                ))
            })?;
            if interval == 0 {
                return Err(Error::Config(format!("{} must be at least 1", ENV_REFRESH_INTERVAL)));
            }
            self.refresh_interval = interval;
        }

        Ok(())
    }
}

/// Configuration store for reading and writing settings.
///
/// Handles reading and writing configuration to `~/.zap/config.json`.
pub struct ConfigStore {
    /// Path to the configuration file.
    config_path: PathBuf,
}

impl ConfigStore {
    /// Create a new config store with the default path.
    ///
    /// Default path: `~/.zap/config.json`
    pub fn new() -> Result<Self> {
        let home = dirs::home_dir()
            .ok_or_else(|| Error::Config("Could not determine home directory".to_string()))?;

        Ok(Self {
            config_path: home.join(".zap").join("config.json"),
        })
    }

    /// Create a config store with a custom path (for testing).
    pub fn with_path(config_path: PathBuf) -> Self {
        Self { config_path }
    }

    pub fn path(&self) -> &Path {
        &self.config_path
    }

    /// Load configuration from disk.
    ///
    /// Returns default config if the file doesn't exist.
    pub async fn load(&self) -> Result<Config> {
        if !self.config_path.exists() {
            return Ok(Config::default());
        }

        let content = fs::read_to_string(&self.config_path)
            .await
            .map_err(|e| Error::Config(format!("Failed to read config: {}", e)))?;

        serde_json::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))
    }

    /// Load the file, then apply environment overrides.
    pub async fn load_effective(&self) -> Result<Config> {
        let mut config = self.load().await?;
        config.apply_env()?;
        Ok(config)
    }

    /// Save configuration to disk.
    ///
    /// Creates the config directory if it doesn't exist.
    pub async fn save(&self, config: &Config) -> Result<()> {
        if let Some(config_dir) = self.config_path.parent() {
            fs::create_dir_all(config_dir)
                .await
                .map_err(|e| Error::Config(format!("Failed to create config directory: {}", e)))?;
        }

        let content = serde_json::to_string_pretty(config)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;

        // Write atomically by writing to temp file then renaming
        let temp_path = self.config_path.with_extension("json.tmp");

        let mut file = fs::File::create(&temp_path)
            .await
            .map_err(|e| Error::Config(format!("Failed to create temp config file: {}", e)))?;

        file.write_all(content.as_bytes())
            .await
            .map_err(|e| Error::Config(format!("Failed to write config: {}", e)))?;

        file.sync_all()
            .await
            .map_err(|e| Error::Config(format!("Failed to sync config: {}", e)))?;

        fs::rename(&temp_path, &self.config_path)
            .await
            .map_err(|e| Error::Config(format!("Failed to rename config file: {}", e)))?;

        Ok(())
    }
}
