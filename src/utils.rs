use std::path::{Path, PathBuf};

use byte_unit::{Byte, UnitType};
use dirs_next as dirs;
use walkdir::WalkDir;

/// Format bytes into a human-readable string.
pub fn format_bytes(size: u64) -> String {
    if size == 0 {
        "0 B".to_string()
    } else {
        let adjusted = Byte::from_u64(size).get_appropriate_unit(UnitType::Decimal);
        format!("{adjusted:#.2}")
    }
}

/// Replace the home directory prefix with `~` to make output easier to read.
pub fn display_path(path: &Path) -> String {
    if let Some(home) = dirs::home_dir()
        && let Ok(stripped) = path.strip_prefix(&home)
    {
        let mut display = PathBuf::from("~");
        display.push(stripped);
        return display.display().to_string();
    }

    path.display().to_string()
}

/// Total size of the regular files below `path`. Unreadable entries are skipped.
pub fn path_size(path: &Path) -> u64 {
    if path.is_file() {
        return path.metadata().map(|m| m.len()).unwrap_or_default();
    }

    WalkDir::new(path)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(err) => {
                tracing::debug!("Skipping {:?}: {}", err.path(), err);
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| entry.metadata().ok())
        .fold(0u64, |total, metadata| total.saturating_add(metadata.len()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_bytes_is_literal() {
        assert_eq!(format_bytes(0), "0 B");
    }

    #[test]
    fn path_size_sums_nested_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("a/b")).unwrap();
        std::fs::write(dir.path().join("a/one"), b"12345").unwrap();
        std::fs::write(dir.path().join("a/b/two"), b"123").unwrap();
        assert_eq!(path_size(dir.path()), 8);
        assert_eq!(path_size(&dir.path().join("missing")), 0);
    }
}
