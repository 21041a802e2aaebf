use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub listen: String,
    #[serde(default = "default_public_dir")]
    pub public_dir: String,
    #[serde(default = "default_system_interval_secs")]
    pub system_interval_secs: u64,
    #[serde(default)]
    pub openclaw: OpenclawConfig,
    #[serde(default)]
    pub snapshot: SnapshotConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OpenclawConfig {
    /// Status endpoint of the local gateway. An empty URL disables probing:
    /// every check reports the gateway as offline.
    #[serde(default)]
    pub status_url: String,
    #[serde(default = "default_openclaw_interval_secs")]
    pub interval_secs: u64,
    #[serde(default = "default_openclaw_timeout_ms")]
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SnapshotConfig {
    /// OpenClaw gateway config. Empty means $HOME/.openclaw/openclaw.json.
    #[serde(default)]
    pub openclaw_config: String,
    #[serde(default = "default_cron_snapshot")]
    pub cron_snapshot: String,
    #[serde(default = "default_projects_file")]
    pub projects_file: String,
    #[serde(default)]
    pub gemini_usage: String,
    #[serde(default = "default_snapshot_output")]
    pub output: String,
}

impl Default for OpenclawConfig {
    fn default() -> Self {
        Self {
            status_url: String::new(),
            interval_secs: default_openclaw_interval_secs(),
            timeout_ms: default_openclaw_timeout_ms(),
        }
    }
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            openclaw_config: String::new(),
            cron_snapshot: default_cron_snapshot(),
            projects_file: default_projects_file(),
            gemini_usage: String::new(),
            output: default_snapshot_output(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse YAML in {path}: {source}")]
    Parse {
        path: String,
        source: serde_yaml::Error,
    },
    #[error("config validation error: {0}")]
    Validation(String),
}

impl Config {
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path_ref = path.as_ref();
        let path_display = path_ref.display().to_string();
        let text = fs::read_to_string(path_ref).map_err(|source| ConfigError::Read {
            path: path_display.clone(),
            source,
        })?;

        let cfg: Config = serde_yaml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path_display,
            source,
        })?;

        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.listen.trim().is_empty() {
            return Err(ConfigError::Validation(
                "listen field is required".to_string(),
            ));
        }
        if SocketAddr::from_str(&self.listen).is_err() {
            return Err(ConfigError::Validation(
                "listen must be a valid host:port address".to_string(),
            ));
        }
        if self.system_interval_secs < 1 {
            return Err(ConfigError::Validation(
                "system_interval_secs must be >= 1".to_string(),
            ));
        }
        if self.openclaw.interval_secs < 1 {
            return Err(ConfigError::Validation(
                "openclaw.interval_secs must be >= 1".to_string(),
            ));
        }
        if self.openclaw.timeout_ms == 0 {
            return Err(ConfigError::Validation(
                "openclaw.timeout_ms must be > 0".to_string(),
            ));
        }
        if self.snapshot.output.trim().is_empty() {
            return Err(ConfigError::Validation(
                "snapshot.output must not be empty".to_string(),
            ));
        }

        Ok(())
    }

    pub fn example_yaml() -> &'static str {
        include_str!("../config.yaml.example")
    }
}

fn default_public_dir() -> String {
    "./public".to_string()
}

const fn default_system_interval_secs() -> u64 {
    10
}

const fn default_openclaw_interval_secs() -> u64 {
    30
}

const fn default_openclaw_timeout_ms() -> u64 {
    3000
}

fn default_cron_snapshot() -> String {
    "./cron-snapshot.json".to_string()
}

fn default_projects_file() -> String {
    "./public/projects.json".to_string()
}

fn default_snapshot_output() -> String {
    "./public/dashboard-data.json".to_string()
}
