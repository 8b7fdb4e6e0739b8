use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::severity::Severity;

/// One invocation's worth of parsed command input.
#[derive(Debug, Clone)]
pub struct ScanRequest {
    pub image_name: Option<String>,
    pub file_path: Option<PathBuf>,
    /// Raw comma separated severity list, parsed during the run.
    pub severities: String,
    pub skip_update: bool,
    pub clean: bool,
    pub output: Option<PathBuf>,
    pub format: String,
}

impl ScanRequest {
    /// The local artifact path takes precedence over the image reference.
    pub fn target(&self) -> Result<ScanTarget, AppError> {
        if let Some(path) = &self.file_path
            && !path.as_os_str().is_empty()
        {
            return Ok(ScanTarget::Artifact(path.clone()));
        }
        match &self.image_name {
            Some(name) if !name.is_empty() => Ok(ScanTarget::Image(name.clone())),
            _ => Err(AppError::Usage),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanTarget {
    Image(String),
    Artifact(PathBuf),
}

impl ScanTarget {
    pub fn name(&self) -> String {
        match self {
            ScanTarget::Image(name) => name.clone(),
            ScanTarget::Artifact(path) => path.display().to_string(),
        }
    }
}

/// An installed package found by an analyzer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Package {
    pub name: String,
    pub version: String,
}

/// A database entry describing which versions of a package are affected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Advisory {
    pub id: String,
    pub package: String,
    #[serde(default)]
    pub affected_versions: Vec<String>,
    #[serde(default)]
    pub fixed_version: Option<String>,
    pub severity: Severity,
    #[serde(default)]
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DetectedVulnerability {
    pub vulnerability_id: String,
    pub pkg_name: String,
    pub installed_version: String,
    pub fixed_version: String,
    pub severity: Severity,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TargetResult {
    pub target: String,
    pub vulnerabilities: Vec<DetectedVulnerability>,
}

impl TargetResult {
    pub fn count(&self, severity: Severity) -> usize {
        self.vulnerabilities.iter().filter(|v| v.severity == severity).count()
    }
}

/// Produced by the scanner and handed to a writer untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ScanResults {
    pub targets: Vec<TargetResult>,
}
