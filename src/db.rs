//! Local vulnerability database kept under the cache directory.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::DbConfig;
use crate::model::Advisory;
use crate::utils::display_path;

const SCHEMA_VERSION: u32 = 1;
const ADVISORIES_FILE: &str = "advisories.json";
const METADATA_FILE: &str = "metadata.json";

#[derive(Debug, Error)]
pub enum DbError {
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to decode {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode database: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("unsupported database schema version {0}")]
    SchemaVersion(u32),

    #[error("database is not initialized")]
    NotInitialized,
}

/// Initialization and conditional refresh of the advisory store.
pub trait VulnDatabase {
    fn init(&mut self) -> Result<(), DbError>;

    fn update(&mut self) -> Result<(), DbError>;

    fn advisories(&self) -> &[Advisory];
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct Metadata {
    version: u32,
    /// Unix seconds of the last successful refresh, zero when never refreshed.
    updated_at: u64,
}

pub struct LocalDatabase {
    dir: PathBuf,
    feed: Option<PathBuf>,
    update_interval: Duration,
    metadata: Option<Metadata>,
    advisories: Vec<Advisory>,
}

impl LocalDatabase {
    pub fn new(cache_dir: &Path, config: &DbConfig) -> Self {
        Self {
            dir: cache_dir.join("db"),
            feed: config.feed.clone(),
            update_interval: Duration::from_secs(config.update_interval_hours.saturating_mul(3600)),
            metadata: None,
            advisories: Vec::new(),
        }
    }

    fn needs_update(&self, metadata: &Metadata, now: u64) -> bool {
        if metadata.updated_at == 0 {
            return true;
        }
        now.saturating_sub(metadata.updated_at) >= self.update_interval.as_secs()
    }

    fn persist(&self, metadata: &Metadata) -> Result<(), DbError> {
        write_json(&self.dir.join(ADVISORIES_FILE), &self.advisories)?;
        write_json(&self.dir.join(METADATA_FILE), metadata)
    }
}

impl VulnDatabase for LocalDatabase {
    fn init(&mut self) -> Result<(), DbError> {
        fs::create_dir_all(&self.dir)
            .map_err(|source| DbError::Io { path: self.dir.clone(), source })?;

        let metadata_path = self.dir.join(METADATA_FILE);
        let metadata = if metadata_path.exists() {
            let metadata: Metadata = read_json(&metadata_path)?;
            if metadata.version != SCHEMA_VERSION {
                return Err(DbError::SchemaVersion(metadata.version));
            }
            metadata
        } else {
            let metadata = Metadata { version: SCHEMA_VERSION, updated_at: 0 };
            write_json(&metadata_path, &metadata)?;
            metadata
        };

        let advisories_path = self.dir.join(ADVISORIES_FILE);
        self.advisories =
            if advisories_path.exists() { read_json(&advisories_path)? } else { Vec::new() };
        self.metadata = Some(metadata);

        debug!(
            "vulnerability DB at {} holds {} advisories",
            display_path(&self.dir),
            self.advisories.len()
        );
        Ok(())
    }

    fn update(&mut self) -> Result<(), DbError> {
        let metadata = self.metadata.ok_or(DbError::NotInitialized)?;
        let Some(feed) = self.feed.clone() else {
            warn!("No advisory feed configured, keeping the local vulnerability DB");
            return Ok(());
        };

        let now = unix_now();
        if !self.needs_update(&metadata, now) {
            debug!("vulnerability DB is up to date");
            return Ok(());
        }

        info!("Updating vulnerability database from {}...", display_path(&feed));
        let advisories: Vec<Advisory> = read_json(&feed)?;
        self.advisories = advisories;
        let refreshed = Metadata { version: SCHEMA_VERSION, updated_at: now };
        self.persist(&refreshed)?;
        self.metadata = Some(refreshed);
        info!("Loaded {} advisories", self.advisories.len());
        Ok(())
    }

    fn advisories(&self) -> &[Advisory] {
        &self.advisories
    }
}

fn unix_now() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or_default()
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, DbError> {
    let contents =
        fs::read_to_string(path).map_err(|source| DbError::Io { path: path.to_path_buf(), source })?;
    serde_json::from_str(&contents)
        .map_err(|source| DbError::Decode { path: path.to_path_buf(), source })
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), DbError> {
    let contents = serde_json::to_string_pretty(value)?;
    fs::write(path, contents).map_err(|source| DbError::Io { path: path.to_path_buf(), source })
}
