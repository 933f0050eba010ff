//! Layered configuration.
//!
//! Priority (highest first):
//! 1. CLI arguments
//! 2. Environment variables (via clap `env` attribute)
//! 3. TOML config file (`~/.config/tymepace/config.toml`)
//! 4. Compiled defaults

use std::path::{Path, PathBuf};

use crate::days::WindowSpan;
use crate::scheduler::SchedulerSettings;
use crate::storage::default_db_path;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config file: {0}")]
    ParseToml(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

// ---------------------------------------------------------------------------
// TOML file structs
// ---------------------------------------------------------------------------

#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ConfigFile {
    calendar: CalendarFileConfig,
    storage: StorageFileConfig,
}

/// `[calendar]` section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct CalendarFileConfig {
    first_hour: Option<u32>,
    last_hour: Option<u32>,
    granularity_minutes: Option<u32>,
    window_days: Option<u32>,
}

/// `[storage]` section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct StorageFileConfig {
    path: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// CLI arguments
// ---------------------------------------------------------------------------

/// Global options shared by every subcommand.
#[derive(clap::Args, Debug, Default, Clone)]
pub struct GlobalArgs {
    /// Path to config file (default: `~/.config/tymepace/config.toml`).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Path to the task database.
    #[arg(long, global = true, env = "TYMEPACE_DB")]
    pub db: Option<PathBuf>,

    /// Log level filter (trace, debug, info, warn, error).
    #[arg(long, global = true, env = "TYMEPACE_LOG")]
    pub log_level: Option<String>,
}

// ---------------------------------------------------------------------------
// Resolved configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub db_path: PathBuf,
    pub scheduler: SchedulerSettings,
    pub window: WindowSpan,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            scheduler: SchedulerSettings::default(),
            window: WindowSpan::default(),
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration by merging CLI args, env vars, and a TOML file.
    ///
    /// An explicit `--config` that does not exist is an error; a missing
    /// default file is treated as empty.
    pub fn load(cli: &GlobalArgs) -> Result<Self, ConfigError> {
        let file = load_config_file(cli.config.as_deref())?;
        Self::resolve(cli, &file)
    }

    /// Config for a given database with everything else at defaults.
    pub fn with_db(path: impl Into<PathBuf>) -> Self {
        Self { db_path: path.into(), ..Self::default() }
    }

    fn resolve(cli: &GlobalArgs, file: &ConfigFile) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let cal = &file.calendar;

        let first_hour = cal.first_hour.unwrap_or(defaults.scheduler.first_hour);
        let last_hour = cal.last_hour.unwrap_or(defaults.scheduler.last_hour);
        if first_hour > last_hour || last_hour > 24 {
            return Err(ConfigError::Invalid(format!(
                "visible hours {}..={} must satisfy first <= last <= 24",
                first_hour, last_hour
            )));
        }
        let granularity = match cal.granularity_minutes {
            Some(0) => return Err(ConfigError::Invalid("granularity_minutes must be positive".into())),
            Some(m) => f64::from(m) / 60.0,
            None => defaults.scheduler.granularity,
        };
        let window = match cal.window_days {
            Some(n) => WindowSpan::try_from(n).map_err(ConfigError::Invalid)?,
            None => defaults.window,
        };

        Ok(Self {
            db_path: cli
                .db
                .clone()
                .or_else(|| file.storage.path.clone())
                .unwrap_or(defaults.db_path),
            scheduler: SchedulerSettings { granularity, first_hour, last_hour },
            window,
            log_level: cli.log_level.clone().unwrap_or(defaults.log_level),
        })
    }
}

fn load_config_file(explicit_path: Option<&Path>) -> Result<ConfigFile, ConfigError> {
    let path = if let Some(p) = explicit_path {
        let contents = std::fs::read_to_string(p).map_err(|e| ConfigError::ReadFile {
            path: p.to_path_buf(),
            source: e,
        })?;
        return Ok(toml::from_str(&contents)?);
    } else {
        let Some(config_dir) = dirs::config_dir() else {
            return Ok(ConfigFile::default());
        };
        config_dir.join("tymepace").join("config.toml")
    };

    match std::fs::read_to_string(&path) {
        Ok(contents) => Ok(toml::from_str(&contents)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ConfigFile::default()),
        Err(e) => Err(ConfigError::ReadFile { path, source: e }),
    }
}
