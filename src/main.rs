use std::path::PathBuf;

use clap::{ArgAction, CommandFactory, Parser};
use imgscan::cache::{LocalCache, cache_dir, image_dir};
use imgscan::config::Config;
use imgscan::db::LocalDatabase;
use imgscan::error::AppError;
use imgscan::logging::{LogConfig, init_logger};
use imgscan::model::ScanRequest;
use imgscan::runner::{Collaborators, run};
use imgscan::scanner::RootfsScanner;
use tracing::{error, info};

const DEFAULT_SEVERITIES: &str = "UNKNOWN,LOW,MEDIUM,HIGH,CRITICAL";

fn main() {
    let cli = Cli::parse();

    if let Err(err) = init_logger(&LogConfig { debug: cli.debug }) {
        eprintln!("Error: {}", err);
        std::process::exit(1);
    }

    if let Err(err) = execute(cli) {
        if err.is_usage() {
            info!("\"imgscan\" requires at least 1 argument or --input option.");
            if let Err(err) = Cli::command().print_help() {
                eprintln!("Error: {}", err);
            }
            std::process::exit(1);
        }
        error!("{}", err);
        std::process::exit(1);
    }
}

fn execute(cli: Cli) -> Result<(), AppError> {
    let request = ScanRequest {
        image_name: cli.image,
        file_path: cli.input,
        severities: cli.severity,
        skip_update: cli.skip_update,
        clean: cli.clean,
        output: cli.output,
        format: cli.format,
    };
    // Usage problems are reported before configuration is read.
    request.target()?;

    let config = Config::load()?;
    let dir = cache_dir(&config)?;

    let cache = LocalCache::new(dir.clone());
    let mut db = LocalDatabase::new(&dir, &config.db);
    let scanner = RootfsScanner::new(image_dir(&config)?);

    run(&request, Collaborators { cache: &cache, db: &mut db, scanner: &scanner })
}

#[derive(Parser)]
#[command(
    name = "imgscan",
    version,
    about = "Scan container images for known vulnerabilities."
)]
struct Cli {
    /// Image reference to scan (e.g. alpine:3.10).
    #[arg(value_name = "IMAGE_NAME")]
    image: Option<String>,

    /// Unpacked image root filesystem to scan instead of an image reference.
    #[arg(short, long, value_name = "PATH")]
    input: Option<PathBuf>,

    /// Output file (defaults to stdout).
    #[arg(short, long, value_name = "PATH")]
    output: Option<PathBuf>,

    /// Output format (table, json).
    #[arg(short, long, default_value = "table")]
    format: String,

    /// Severities of vulnerabilities to be displayed (comma separated).
    #[arg(short, long, default_value = DEFAULT_SEVERITIES)]
    severity: String,

    /// Skip the vulnerability database update.
    #[arg(long = "skip-update", action = ArgAction::SetTrue)]
    skip_update: bool,

    /// Remove all caches (including the vulnerability DB) before scanning.
    /// Unpacked images in the image store are kept.
    #[arg(short, long, action = ArgAction::SetTrue)]
    clean: bool,

    /// Enable debug logging.
    #[arg(short, long, action = ArgAction::SetTrue)]
    debug: bool,
}
