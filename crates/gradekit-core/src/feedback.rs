//! Feedback templates built from the collected grading logs.

use crate::crosswalk::Crosswalk;
use crate::error::Result;
use crate::io;
use crate::paths;
use crate::repository::student_suffix;
use serde::Serialize;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

pub const PASS_TEMPLATE: &str = "PASS.md";
pub const FAIL_TEMPLATE: &str = "FAIL.md";

#[derive(Debug, Clone, Default, Serialize)]
pub struct FeedbackReport {
    pub written: Vec<PathBuf>,
    pub entries: usize,
    /// Platform ids with no crosswalk row.
    pub unresolved: Vec<String>,
}

/// Writes `PASS.md` and `FAIL.md` into `out_dir` with one block per log in
/// `<output_root>/PASS` and `<output_root>/FAIL`.
pub fn write_templates(
    output_root: &Path,
    project: &str,
    crosswalk: &Crosswalk,
    out_dir: &Path,
) -> Result<FeedbackReport> {
    let mut report = FeedbackReport::default();
    for (bucket, name) in [
        (paths::pass_dir(output_root), PASS_TEMPLATE),
        (paths::fail_dir(output_root), FAIL_TEMPLATE),
    ] {
        let mut doc = String::new();
        for id in log_ids(&bucket, project)? {
            match crosswalk.by_platform_id(&id) {
                Some(record) => {
                    let _ = write!(
                        doc,
                        "### {id}\n - Fill in feedback for SFUID {}\n",
                        record.institution_id
                    );
                    report.entries += 1;
                }
                None => {
                    tracing::warn!(%id, "no crosswalk entry for log");
                    report.unresolved.push(id);
                }
            }
        }
        let path = out_dir.join(name);
        io::atomic_write(&path, doc.as_bytes())?;
        report.written.push(path);
    }
    Ok(report)
}

/// Platform ids for every `*.log` in `dir`, sorted. A missing directory
/// yields nothing.
fn log_ids(dir: &Path, project: &str) -> Result<Vec<String>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut ids = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) != Some("log") {
            continue;
        }
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        ids.push(student_suffix(stem, project).to_string());
    }
    ids.sort();
    Ok(ids)
}
