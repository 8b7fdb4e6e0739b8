use std::io;

use thiserror::Error;

use crate::db::DbError;
use crate::scanner::ScanError;

/// Application-wide error type for the imgscan CLI.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("requires at least 1 argument or --input option")]
    Usage,

    #[error("failed to remove cache: {0}")]
    CacheClear(#[source] io::Error),

    #[error("failed to create an output file: {0}")]
    OutputCreate(#[source] io::Error),

    #[error("error in severity option: invalid severity '{0}'")]
    InvalidSeverity(String),

    #[error("error in vulnerability DB initialize: {0}")]
    DbInit(#[source] DbError),

    #[error("error in vulnerability DB update: {0}")]
    DbUpdate(#[source] DbError),

    #[error("error in image scan: {0}")]
    Scan(#[source] ScanError),

    #[error("unknown format '{0}' (expected table or json)")]
    UnknownFormat(String),

    #[error("failed to write results: {0}")]
    Write(#[source] io::Error),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to parse configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Failed to serialize results: {0}")]
    Json(#[from] serde_json::Error),
}

impl AppError {
    pub fn config<S: Into<String>>(msg: S) -> Self {
        AppError::Config(msg.into())
    }

    /// Usage violations are reported with the help text instead of a log line.
    pub fn is_usage(&self) -> bool {
        matches!(self, AppError::Usage)
    }
}
