use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use dirs_next as dirs;
use tracing::{debug, info};

use crate::config::Config;
use crate::error::AppError;
use crate::utils::{display_path, format_bytes, path_size};

/// Resolve the cache directory: configured override, then `$XDG_CACHE_HOME`,
/// then the platform cache directory.
pub fn cache_dir(config: &Config) -> Result<PathBuf, AppError> {
    if let Some(dir) = &config.cache_dir {
        return Ok(dir.clone());
    }
    let cache_root = std::env::var_os("XDG_CACHE_HOME")
        .map(PathBuf::from)
        .or_else(dirs::cache_dir)
        .ok_or_else(|| AppError::config("Unable to determine cache directory for this platform"))?;
    Ok(cache_root.join("imgscan"))
}

/// Resolve the image store: configured override, then `$XDG_DATA_HOME`, then
/// the platform data directory. It lives outside the cache so `--clean` keeps it.
pub fn image_dir(config: &Config) -> Result<PathBuf, AppError> {
    if let Some(dir) = &config.image_dir {
        return Ok(dir.clone());
    }
    let data_root = std::env::var_os("XDG_DATA_HOME")
        .map(PathBuf::from)
        .or_else(dirs::data_dir)
        .ok_or_else(|| AppError::config("Unable to determine data directory for this platform"))?;
    Ok(data_root.join("imgscan").join("images"))
}

/// Removes the on-disk cache tree.
pub trait CacheManager {
    fn cache_dir(&self) -> &Path;

    fn clear(&self) -> io::Result<()>;
}

pub struct LocalCache {
    dir: PathBuf,
}

impl LocalCache {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }
}

impl CacheManager for LocalCache {
    fn cache_dir(&self) -> &Path {
        &self.dir
    }

    fn clear(&self) -> io::Result<()> {
        clear_cache(&self.dir)
    }
}

/// Recursively delete `dir`. A directory that does not exist is already clean.
pub fn clear_cache(dir: &Path) -> io::Result<()> {
    if !dir.exists() {
        debug!("cache dir {} does not exist, nothing to clean", display_path(dir));
        return Ok(());
    }

    let size = path_size(dir);
    match fs::remove_dir_all(dir) {
        Ok(()) => {
            info!("Removed {} from {}", format_bytes(size), display_path(dir));
            Ok(())
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err),
    }
}
