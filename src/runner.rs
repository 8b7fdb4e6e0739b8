//! Sequencing of one scan run.
//!
//! Every step is fail-fast: the first error ends the run and is returned
//! with the stage it came from. Nothing is retried here.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use tracing::{debug, info};

use crate::cache::CacheManager;
use crate::db::VulnDatabase;
use crate::error::AppError;
use crate::model::ScanRequest;
use crate::report::{Format, writer_for};
use crate::scanner::ImageScanner;
use crate::severity::parse_severities;
use crate::utils::display_path;

/// Where results are rendered. Owned by the run until the write completes.
pub enum OutputTarget {
    Stdout(io::Stdout),
    File(File),
}

impl OutputTarget {
    /// Create (or truncate) the file at `path`, defaulting to stdout.
    pub fn resolve(path: Option<&Path>) -> Result<Self, AppError> {
        match path {
            Some(path) => File::create(path).map(OutputTarget::File).map_err(AppError::OutputCreate),
            None => Ok(OutputTarget::Stdout(io::stdout())),
        }
    }
}

impl Write for OutputTarget {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            OutputTarget::Stdout(out) => out.write(buf),
            OutputTarget::File(file) => file.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            OutputTarget::Stdout(out) => out.flush(),
            OutputTarget::File(file) => file.flush(),
        }
    }
}

/// External components the run drives.
pub struct Collaborators<'a> {
    pub cache: &'a dyn CacheManager,
    pub db: &'a mut dyn VulnDatabase,
    pub scanner: &'a dyn ImageScanner,
}

pub fn run(request: &ScanRequest, collaborators: Collaborators<'_>) -> Result<(), AppError> {
    let Collaborators { cache, db, scanner } = collaborators;
    debug!("cache dir: {}", display_path(cache.cache_dir()));

    let target = request.target()?;

    if request.clean {
        info!("Cleaning caches...");
        cache.clear().map_err(AppError::CacheClear)?;
    }

    let output = OutputTarget::resolve(request.output.as_deref())?;

    let severities = parse_severities(&request.severities)?;

    db.init().map_err(AppError::DbInit)?;

    if request.skip_update {
        info!("Skipping vulnerability DB update");
    } else {
        db.update().map_err(AppError::DbUpdate)?;
    }

    let results = scanner.scan(&target, &severities, db.advisories()).map_err(AppError::Scan)?;

    let format: Format = request.format.parse()?;
    writer_for(format, output).write(&results)
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::path::PathBuf;
    use std::rc::Rc;

    use super::*;
    use crate::db::DbError;
    use crate::model::{Advisory, DetectedVulnerability, ScanResults, ScanTarget, TargetResult};
    use crate::scanner::ScanError;
    use crate::severity::Severity;

    type Calls = Rc<RefCell<Vec<String>>>;

    struct FakeCache {
        dir: PathBuf,
        fail: bool,
        calls: Calls,
    }

    impl CacheManager for FakeCache {
        fn cache_dir(&self) -> &Path {
            &self.dir
        }

        fn clear(&self) -> io::Result<()> {
            self.calls.borrow_mut().push("clear".into());
            if self.fail { Err(io::Error::other("permission denied")) } else { Ok(()) }
        }
    }

    #[derive(Default)]
    struct FakeDb {
        fail_init: bool,
        fail_update: bool,
        calls: Calls,
    }

    impl VulnDatabase for FakeDb {
        fn init(&mut self) -> Result<(), DbError> {
            self.calls.borrow_mut().push("db_init".into());
            if self.fail_init { Err(DbError::NotInitialized) } else { Ok(()) }
        }

        fn update(&mut self) -> Result<(), DbError> {
            self.calls.borrow_mut().push("db_update".into());
            if self.fail_update { Err(DbError::NotInitialized) } else { Ok(()) }
        }

        fn advisories(&self) -> &[Advisory] {
            &[]
        }
    }

    struct FakeScanner {
        calls: Calls,
    }

    impl ImageScanner for FakeScanner {
        fn scan(
            &self,
            target: &ScanTarget,
            severities: &[Severity],
            _advisories: &[Advisory],
        ) -> Result<ScanResults, ScanError> {
            let names: Vec<&str> = severities.iter().map(Severity::as_str).collect();
            self.calls.borrow_mut().push(format!("scan {} [{}]", target.name(), names.join(",")));
            Ok(sample_results())
        }
    }

    fn sample_results() -> ScanResults {
        ScanResults {
            targets: vec![TargetResult {
                target: "image:tag (apk)".to_string(),
                vulnerabilities: vec![DetectedVulnerability {
                    vulnerability_id: "CVE-2019-14697".to_string(),
                    pkg_name: "musl".to_string(),
                    installed_version: "1.1.22-r2".to_string(),
                    fixed_version: "1.1.22-r3".to_string(),
                    severity: Severity::Critical,
                    title: String::new(),
                }],
            }],
        }
    }

    struct Harness {
        calls: Calls,
        cache: FakeCache,
        db: FakeDb,
        scanner: FakeScanner,
        dir: tempfile::TempDir,
    }

    impl Harness {
        fn new() -> Self {
            let calls: Calls = Rc::default();
            let dir = tempfile::tempdir().unwrap();
            Self {
                cache: FakeCache { dir: dir.path().join("cache"), fail: false, calls: calls.clone() },
                db: FakeDb { calls: calls.clone(), ..FakeDb::default() },
                scanner: FakeScanner { calls: calls.clone() },
                calls,
                dir,
            }
        }

        fn output_path(&self) -> PathBuf {
            self.dir.path().join("report.out")
        }

        fn request(&self) -> ScanRequest {
            ScanRequest {
                image_name: Some("image:tag".to_string()),
                file_path: None,
                severities: "HIGH,CRITICAL".to_string(),
                skip_update: false,
                clean: false,
                output: Some(self.output_path()),
                format: "json".to_string(),
            }
        }

        fn run(&mut self, request: &ScanRequest) -> Result<(), AppError> {
            run(
                request,
                Collaborators { cache: &self.cache, db: &mut self.db, scanner: &self.scanner },
            )
        }

        fn calls(&self) -> Vec<String> {
            self.calls.borrow().clone()
        }
    }

    #[test]
    fn json_run_writes_scan_results_once() {
        let mut harness = Harness::new();
        let request = harness.request();
        harness.run(&request).unwrap();

        assert_eq!(
            harness.calls(),
            vec!["db_init", "db_update", "scan image:tag [HIGH,CRITICAL]"]
        );
        let written = std::fs::read_to_string(harness.output_path()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&written).unwrap();
        assert_eq!(value, serde_json::to_value(sample_results()).unwrap());
    }

    #[test]
    fn table_run_renders_table() {
        let mut harness = Harness::new();
        let request = ScanRequest { format: "table".to_string(), ..harness.request() };
        harness.run(&request).unwrap();

        let written = std::fs::read_to_string(harness.output_path()).unwrap();
        assert!(written.contains("VULNERABILITY ID"));
        assert!(written.contains("CVE-2019-14697"));
    }

    #[test]
    fn missing_target_never_touches_database() {
        let mut harness = Harness::new();
        let request = ScanRequest { image_name: None, clean: true, ..harness.request() };

        assert!(harness.run(&request).unwrap_err().is_usage());
        assert!(harness.calls().is_empty());
    }

    #[test]
    fn failed_cache_clear_stops_the_run() {
        let mut harness = Harness::new();
        harness.cache.fail = true;
        let request = ScanRequest { clean: true, ..harness.request() };

        assert!(matches!(harness.run(&request), Err(AppError::CacheClear(_))));
        assert_eq!(harness.calls(), vec!["clear"]);
        assert!(!harness.output_path().exists());
    }

    #[test]
    fn skip_update_still_initializes() {
        let mut harness = Harness::new();
        let request = ScanRequest { skip_update: true, ..harness.request() };
        harness.run(&request).unwrap();

        assert_eq!(harness.calls(), vec!["db_init", "scan image:tag [HIGH,CRITICAL]"]);
    }

    #[test]
    fn invalid_severity_aborts_before_database() {
        let mut harness = Harness::new();
        let request = ScanRequest { severities: "HIGH,URGENT".to_string(), ..harness.request() };

        assert!(matches!(harness.run(&request), Err(AppError::InvalidSeverity(_))));
        assert!(harness.calls().is_empty());
    }

    #[test]
    fn database_failures_are_tagged_by_stage() {
        let mut harness = Harness::new();
        harness.db.fail_init = true;
        let request = harness.request();
        let err = harness.run(&request).unwrap_err();
        assert!(err.to_string().starts_with("error in vulnerability DB initialize"));
        assert_eq!(harness.calls(), vec!["db_init"]);

        let mut harness = Harness::new();
        harness.db.fail_update = true;
        let request = harness.request();
        let err = harness.run(&request).unwrap_err();
        assert!(err.to_string().starts_with("error in vulnerability DB update"));
        assert_eq!(harness.calls(), vec!["db_init", "db_update"]);
    }

    #[test]
    fn unknown_format_is_surfaced() {
        let mut harness = Harness::new();
        let request = ScanRequest { format: "xml".to_string(), ..harness.request() };

        assert!(matches!(harness.run(&request), Err(AppError::UnknownFormat(f)) if f == "xml"));
        let written = std::fs::read_to_string(harness.output_path()).unwrap();
        assert!(written.is_empty());
    }

    #[test]
    fn artifact_path_is_scanned_instead_of_image() {
        let mut harness = Harness::new();
        let request =
            ScanRequest { file_path: Some(PathBuf::from("rootfs")), ..harness.request() };
        harness.run(&request).unwrap();

        assert!(harness.calls().contains(&"scan rootfs [HIGH,CRITICAL]".to_string()));
    }

    #[test]
    fn output_create_failure_is_reported() {
        let mut harness = Harness::new();
        let request = ScanRequest {
            output: Some(harness.dir.path().join("missing/dir/report.json")),
            ..harness.request()
        };

        assert!(matches!(harness.run(&request), Err(AppError::OutputCreate(_))));
        assert!(harness.calls().is_empty());
    }
}
