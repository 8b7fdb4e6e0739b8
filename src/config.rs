use std::fs;
use std::path::PathBuf;

use dirs_next as dirs;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

pub const DEFAULT_UPDATE_INTERVAL_HOURS: u64 = 12;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Overrides the platform cache directory.
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,

    /// Overrides the directory holding unpacked images.
    #[serde(default)]
    pub image_dir: Option<PathBuf>,

    #[serde(default)]
    pub db: DbConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DbConfig {
    /// JSON advisory feed imported on refresh.
    #[serde(default)]
    pub feed: Option<PathBuf>,

    #[serde(default = "default_update_interval")]
    pub update_interval_hours: u64,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self { feed: None, update_interval_hours: DEFAULT_UPDATE_INTERVAL_HOURS }
    }
}

fn default_update_interval() -> u64 {
    DEFAULT_UPDATE_INTERVAL_HOURS
}

impl Config {
    pub fn load() -> Result<Self, AppError> {
        let path = config_file_path()?;
        if path.exists() {
            let contents = fs::read_to_string(&path)?;
            let config: Config = toml::from_str(&contents)?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }
}

pub fn config_file_path() -> Result<PathBuf, AppError> {
    let config_root = std::env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(dirs::config_dir)
        .ok_or_else(|| {
            AppError::config("Unable to determine configuration directory for this platform")
        })?;
    Ok(config_root.join("imgscan").join("config.toml"))
}
