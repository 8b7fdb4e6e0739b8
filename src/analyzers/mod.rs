use std::path::Path;

use crate::model::Package;

pub mod apk;
pub mod dpkg;

pub use apk::ApkAnalyzer;
pub use dpkg::DpkgAnalyzer;

/// Trait that all OS package analyzers must implement
pub trait PackageAnalyzer {
    /// Short name used to label scan targets (e.g. `dpkg`).
    fn name(&self) -> &'static str;

    /// Read the installed packages below `root`, or `None` when this
    /// package manager's database is absent.
    fn analyze(&self, root: &Path) -> std::io::Result<Option<Vec<Package>>>;
}

pub fn default_analyzers() -> Vec<Box<dyn PackageAnalyzer>> {
    vec![Box::new(DpkgAnalyzer), Box::new(ApkAnalyzer)]
}
