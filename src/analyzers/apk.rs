use std::fs;
use std::path::Path;

use super::PackageAnalyzer;
use crate::model::Package;

const INSTALLED_FILE: &str = "lib/apk/db/installed";

pub struct ApkAnalyzer;

impl PackageAnalyzer for ApkAnalyzer {
    fn name(&self) -> &'static str {
        "apk"
    }

    fn analyze(&self, root: &Path) -> std::io::Result<Option<Vec<Package>>> {
        let path = root.join(INSTALLED_FILE);
        if !path.is_file() {
            return Ok(None);
        }
        let contents = fs::read_to_string(path)?;
        Ok(Some(parse_installed(&contents)))
    }
}

fn parse_installed(contents: &str) -> Vec<Package> {
    let mut packages = Vec::new();
    let mut name: Option<&str> = None;
    let mut version: Option<&str> = None;

    // Records are separated by blank lines; a trailing record may lack one.
    for line in contents.lines().chain(std::iter::once("")) {
        if line.trim().is_empty() {
            if let (Some(n), Some(v)) = (name.take(), version.take()) {
                packages.push(Package { name: n.to_string(), version: v.to_string() });
            }
            continue;
        }
        if let Some(value) = line.strip_prefix("P:") {
            name = Some(value.trim());
        } else if let Some(value) = line.strip_prefix("V:") {
            version = Some(value.trim());
        }
    }
    packages
}
