use std::io;
use std::path::PathBuf;

use thiserror::Error;
use tracing::debug;

use crate::analyzers::{PackageAnalyzer, default_analyzers};
use crate::model::{Advisory, DetectedVulnerability, Package, ScanResults, ScanTarget, TargetResult};
use crate::severity::Severity;
use crate::utils::display_path;

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("image '{reference}' not found (looked in {})", .root.display())]
    ImageNotFound { reference: String, root: PathBuf },

    #[error("{} is not a directory", .0.display())]
    NotADirectory(PathBuf),

    #[error("no supported package database found in {}", .0.display())]
    NoPackageDatabase(PathBuf),

    #[error("failed to analyze {analyzer} packages: {source}")]
    Analyze {
        analyzer: &'static str,
        #[source]
        source: io::Error,
    },
}

/// Runs the scan for one target, keeping only the requested severities.
pub trait ImageScanner {
    fn scan(
        &self,
        target: &ScanTarget,
        severities: &[Severity],
        advisories: &[Advisory],
    ) -> Result<ScanResults, ScanError>;
}

/// Scans an unpacked image root filesystem.
///
/// Local artifacts are used as given; remote references are looked up in the
/// image store.
pub struct RootfsScanner {
    images_dir: PathBuf,
    analyzers: Vec<Box<dyn PackageAnalyzer>>,
}

impl RootfsScanner {
    pub fn new(images_dir: PathBuf) -> Self {
        Self { images_dir, analyzers: default_analyzers() }
    }

    fn resolve_root(&self, target: &ScanTarget) -> Result<PathBuf, ScanError> {
        match target {
            ScanTarget::Artifact(path) => {
                if path.is_dir() {
                    Ok(path.clone())
                } else {
                    Err(ScanError::NotADirectory(path.clone()))
                }
            }
            ScanTarget::Image(reference) => {
                let root = self.images_dir.join(image_dir_name(reference));
                if root.is_dir() {
                    Ok(root)
                } else {
                    Err(ScanError::ImageNotFound { reference: reference.clone(), root })
                }
            }
        }
    }
}

impl ImageScanner for RootfsScanner {
    fn scan(
        &self,
        target: &ScanTarget,
        severities: &[Severity],
        advisories: &[Advisory],
    ) -> Result<ScanResults, ScanError> {
        let root = self.resolve_root(target)?;
        debug!("scanning root filesystem {}", display_path(&root));

        let mut results = ScanResults::default();
        for analyzer in &self.analyzers {
            let packages = analyzer
                .analyze(&root)
                .map_err(|source| ScanError::Analyze { analyzer: analyzer.name(), source })?;
            let Some(packages) = packages else {
                continue;
            };
            debug!("{} packages found by {}", packages.len(), analyzer.name());
            results.targets.push(TargetResult {
                target: format!("{} ({})", target.name(), analyzer.name()),
                vulnerabilities: detect(&packages, severities, advisories),
            });
        }

        if results.targets.is_empty() {
            return Err(ScanError::NoPackageDatabase(root));
        }
        Ok(results)
    }
}

/// `library/alpine:3.10` is stored as `library_alpine_3.10`.
pub fn image_dir_name(reference: &str) -> String {
    reference.replace(['/', ':', '@'], "_")
}

fn detect(
    packages: &[Package],
    severities: &[Severity],
    advisories: &[Advisory],
) -> Vec<DetectedVulnerability> {
    let mut detected: Vec<DetectedVulnerability> = packages
        .iter()
        .flat_map(move |package| {
            advisories
                .iter()
                .filter(move |advisory| {
                    advisory.package == package.name
                        && advisory.affected_versions.iter().any(|v| v == &package.version)
                })
                .map(move |advisory| (package, advisory))
        })
        .filter(|(_, advisory)| severities.contains(&advisory.severity))
        .map(|(package, advisory)| DetectedVulnerability {
            vulnerability_id: advisory.id.clone(),
            pkg_name: package.name.clone(),
            installed_version: package.version.clone(),
            fixed_version: advisory.fixed_version.clone().unwrap_or_default(),
            severity: advisory.severity,
            title: advisory.title.clone(),
        })
        .collect();

    detected.sort_by(|a, b| {
        a.pkg_name.cmp(&b.pkg_name).then_with(|| a.vulnerability_id.cmp(&b.vulnerability_id))
    });
    detected
}
