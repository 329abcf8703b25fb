use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use crate::error::Result;
use crate::pipeline::MappingReport;
use crate::runner::PreparedRun;
use crate::types::{Cue, MappingIssue};

/// Mapping report as written to disk, with the itemized issue list up front
/// for the retry loop.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct MappingReportFile {
    pub resolved: usize,
    pub failed: usize,
    pub issues: Vec<MappingIssue>,
    #[serde(flatten)]
    pub report: MappingReport,
}

impl From<MappingReport> for MappingReportFile {
    fn from(report: MappingReport) -> Self {
        let resolved = report.resolved_count();
        MappingReportFile {
            resolved,
            failed: report.records.len() - resolved,
            issues: report.issues(),
            report,
        }
    }
}

fn write_json<T: Serialize>(value: &T, file_path: &Path) -> Result<()> {
    let file = File::create(file_path)?;
    serde_json::to_writer_pretty(BufWriter::new(file), value)?;
    Ok(())
}

fn read_json<T: for<'de> Deserialize<'de>>(file_path: &Path) -> Result<T> {
    let file = File::open(file_path)?;
    Ok(serde_json::from_reader(BufReader::new(file))?)
}

/// Reads a JSON array of cues as produced by the subtitle-file reader.
pub fn load_cues(file_path: &Path) -> Result<Vec<Cue>> {
    read_json(file_path)
}

pub fn save_prepared_run(run: &PreparedRun, file_path: &Path) -> Result<()> {
    write_json(run, file_path)
}

pub fn load_prepared_run(file_path: &Path) -> Result<PreparedRun> {
    read_json(file_path)
}

pub fn save_mapping_report(report: &MappingReport, file_path: &Path) -> Result<()> {
    write_json(&MappingReportFile::from(report.clone()), file_path)
}

pub fn load_mapping_report(file_path: &Path) -> Result<MappingReportFile> {
    read_json(file_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::types::{ResolvedRecord, TokenId};
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn cues_load_from_json_array() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cues.json");
        std::fs::write(
            &path,
            r#"[{"order_index": 1, "raw_text": "a", "start_time": 0.5, "end_time": 1.0},
                {"order_index": 2, "raw_text": "b"}]"#,
        )
        .unwrap();
        let cues = load_cues(&path).unwrap();
        assert_eq!(cues.len(), 2);
        assert_eq!(cues[1].end_time, None);
    }

    #[test]
    fn mapping_report_file_summarizes_issues() {
        let report = MappingReport {
            records: vec![ResolvedRecord::Failed {
                issue: MappingIssue::UnknownTokenId(TokenId::from("s8-t0")),
                content: json!({}),
            }],
            unresolved: vec![TokenId::from("s1-t0")],
        };
        let dir = tempdir().unwrap();
        let path = dir.path().join("report.json");
        save_mapping_report(&report, &path).unwrap();

        let loaded = load_mapping_report(&path).unwrap();
        assert_eq!(loaded.resolved, 0);
        assert_eq!(loaded.failed, 1);
        assert_eq!(loaded.issues.len(), 2);
        assert_eq!(loaded.report, report);
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempdir().unwrap();
        assert!(matches!(
            load_prepared_run(&dir.path().join("absent.json")),
            Err(Error::Io(_))
        ));
    }
}
