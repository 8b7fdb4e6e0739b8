use std::fs;
use std::path::Path;

use super::PackageAnalyzer;
use crate::model::Package;

const STATUS_FILE: &str = "var/lib/dpkg/status";

pub struct DpkgAnalyzer;

impl PackageAnalyzer for DpkgAnalyzer {
    fn name(&self) -> &'static str {
        "dpkg"
    }

    fn analyze(&self, root: &Path) -> std::io::Result<Option<Vec<Package>>> {
        let path = root.join(STATUS_FILE);
        if !path.is_file() {
            return Ok(None);
        }
        let contents = fs::read_to_string(path)?;
        Ok(Some(parse_status(&contents)))
    }
}

/// Parse the stanzas of a dpkg status file, keeping installed packages only.
fn parse_status(contents: &str) -> Vec<Package> {
    let mut packages = Vec::new();
    for stanza in contents.split("\n\n") {
        let mut name = None;
        let mut version = None;
        let mut installed = false;
        for line in stanza.lines() {
            if let Some(value) = line.strip_prefix("Package:") {
                name = Some(value.trim());
            } else if let Some(value) = line.strip_prefix("Version:") {
                version = Some(value.trim());
            } else if let Some(value) = line.strip_prefix("Status:") {
                installed = value.split_whitespace().last() == Some("installed");
            }
        }
        if let (Some(name), Some(version), true) = (name, version, installed) {
            packages.push(Package { name: name.to_string(), version: version.to_string() });
        }
    }
    packages
}
