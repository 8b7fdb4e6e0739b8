//! Library entry point for the imgscan CLI.

pub mod analyzers;
pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod model;
pub mod report;
pub mod runner;
pub mod scanner;
pub mod severity;
pub mod utils;
