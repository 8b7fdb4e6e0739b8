use std::io::Write;

use tabled::settings::Style;
use tabled::{Table, Tabled};

use crate::error::AppError;
use crate::model::{DetectedVulnerability, ScanResults};
use crate::severity::Severity;

/// Output formats, selected by the `--format` token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Table,
    Json,
}

impl std::str::FromStr for Format {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "table" => Ok(Format::Table),
            "json" => Ok(Format::Json),
            other => Err(AppError::UnknownFormat(other.to_string())),
        }
    }
}

/// Renders scan results once to the output bound at construction.
pub trait ResultWriter {
    fn write(&mut self, results: &ScanResults) -> Result<(), AppError>;
}

/// Build the writer for `format` around `output`.
pub fn writer_for<'a, W: Write + 'a>(format: Format, output: W) -> Box<dyn ResultWriter + 'a> {
    match format {
        Format::Table => Box::new(TableWriter::new(output)),
        Format::Json => Box::new(JsonWriter::new(output)),
    }
}

pub struct TableWriter<W: Write> {
    output: W,
}

impl<W: Write> TableWriter<W> {
    pub fn new(output: W) -> Self {
        Self { output }
    }
}

#[derive(Tabled)]
struct VulnerabilityRow {
    #[tabled(rename = "LIBRARY")]
    library: String,
    #[tabled(rename = "VULNERABILITY ID")]
    id: String,
    #[tabled(rename = "SEVERITY")]
    severity: Severity,
    #[tabled(rename = "INSTALLED VERSION")]
    installed: String,
    #[tabled(rename = "FIXED VERSION")]
    fixed: String,
    #[tabled(rename = "TITLE")]
    title: String,
}

impl From<&DetectedVulnerability> for VulnerabilityRow {
    fn from(vuln: &DetectedVulnerability) -> Self {
        Self {
            library: vuln.pkg_name.clone(),
            id: vuln.vulnerability_id.clone(),
            severity: vuln.severity,
            installed: vuln.installed_version.clone(),
            fixed: vuln.fixed_version.clone(),
            title: vuln.title.clone(),
        }
    }
}

impl<W: Write> ResultWriter for TableWriter<W> {
    fn write(&mut self, results: &ScanResults) -> Result<(), AppError> {
        let mut rendered = String::new();
        for target in &results.targets {
            rendered.push_str(&format!("{}\n", target.target));
            rendered.push_str(&format!("{}\n", "=".repeat(target.target.len())));

            let counts: Vec<String> = Severity::ALL
                .iter()
                .rev()
                .map(|severity| format!("{}: {}", severity, target.count(*severity)))
                .collect();
            rendered.push_str(&format!(
                "Total: {} ({})\n\n",
                target.vulnerabilities.len(),
                counts.join(", ")
            ));

            if !target.vulnerabilities.is_empty() {
                let rows: Vec<VulnerabilityRow> =
                    target.vulnerabilities.iter().map(VulnerabilityRow::from).collect();
                let mut table = Table::new(rows);
                table.with(Style::ascii());
                rendered.push_str(&format!("{table}\n\n"));
            }
        }

        self.output.write_all(rendered.as_bytes()).map_err(AppError::Write)?;
        self.output.flush().map_err(AppError::Write)
    }
}

pub struct JsonWriter<W: Write> {
    output: W,
}

impl<W: Write> JsonWriter<W> {
    pub fn new(output: W) -> Self {
        Self { output }
    }
}

impl<W: Write> ResultWriter for JsonWriter<W> {
    fn write(&mut self, results: &ScanResults) -> Result<(), AppError> {
        let mut rendered = serde_json::to_string_pretty(results)?;
        rendered.push('\n');
        self.output.write_all(rendered.as_bytes()).map_err(AppError::Write)?;
        self.output.flush().map_err(AppError::Write)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TargetResult;

    fn results() -> ScanResults {
        ScanResults {
            targets: vec![TargetResult {
                target: "alpine:3.10 (apk)".to_string(),
                vulnerabilities: vec![DetectedVulnerability {
                    vulnerability_id: "CVE-2019-14697".to_string(),
                    pkg_name: "musl".to_string(),
                    installed_version: "1.1.22-r2".to_string(),
                    fixed_version: "1.1.22-r3".to_string(),
                    severity: Severity::High,
                    title: "musl libc x87 stack adjustment".to_string(),
                }],
            }],
        }
    }

    #[test]
    fn unknown_format_is_rejected() {
        match "xml".parse::<Format>() {
            Err(AppError::UnknownFormat(token)) => assert_eq!(token, "xml"),
            other => panic!("unexpected result: {other:?}"),
        }
        assert!("TABLE".parse::<Format>().is_err());
    }

    #[test]
    fn table_lists_vulnerabilities() {
        let mut buffer = Vec::new();
        writer_for(Format::Table, &mut buffer).write(&results()).unwrap();
        let output = String::from_utf8(buffer).unwrap();

        assert!(output.contains("alpine:3.10 (apk)"));
        assert!(output.contains("Total: 1 (CRITICAL: 0, HIGH: 1, MEDIUM: 0, LOW: 0, UNKNOWN: 0)"));
        assert!(output.contains("VULNERABILITY ID"));
        assert!(output.contains("CVE-2019-14697"));
    }

    #[test]
    fn json_is_machine_readable() {
        let mut buffer = Vec::new();
        writer_for(Format::Json, &mut buffer).write(&results()).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&buffer).unwrap();

        assert_eq!(value[0]["target"], "alpine:3.10 (apk)");
        assert_eq!(value[0]["vulnerabilities"][0]["severity"], "HIGH");
    }
}
