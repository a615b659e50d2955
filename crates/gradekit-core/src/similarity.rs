//! Staging tree for similarity checking: one folder per student holding
//! copies of the configured files.

use crate::error::Result;
use crate::io;
use crate::paths;
use crate::repository::{student_suffix, Checkout};
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Debug, Clone, Default, Serialize)]
pub struct SimilarityReport {
    pub root: PathBuf,
    pub copied: usize,
    /// `(repo, file name)` pairs with no match anywhere in the checkout.
    pub missing: Vec<(String, String)>,
    /// `(repo, error)` for checkouts that could not be fully staged.
    pub errors: Vec<(String, String)>,
}

/// Wipe `<workdir>/Mossbox` and fill `Mossbox/<student>/` with every file
/// in each checkout whose name is one of `files`. Nested files land flat;
/// on a name clash the last one walked wins.
pub fn stage(
    workdir: &Path,
    project: &str,
    checkouts: &[Checkout],
    files: &[String],
) -> Result<SimilarityReport> {
    let root = workdir.join(paths::SIMILARITY_DIR);
    io::reset_dir(&root)?;
    let mut report = SimilarityReport {
        root: root.clone(),
        ..Default::default()
    };
    for checkout in checkouts {
        let dest = root.join(student_suffix(&checkout.name, project));
        match stage_one(checkout, &dest, files) {
            Ok((copied, found)) => {
                report.copied += copied;
                for file in files.iter().filter(|f| !found.contains(f.as_str())) {
                    tracing::warn!(repo = %checkout.name, %file, "file not found");
                    report.missing.push((checkout.name.clone(), file.clone()));
                }
            }
            Err(e) => {
                tracing::warn!(repo = %checkout.name, error = %e, "staging failed");
                report.errors.push((checkout.name.clone(), e.to_string()));
            }
        }
    }
    Ok(report)
}

fn stage_one(checkout: &Checkout, dest: &Path, files: &[String]) -> Result<(usize, BTreeSet<String>)> {
    io::ensure_dir(dest)?;
    let mut copied = 0;
    let mut found = BTreeSet::new();
    let walker = WalkDir::new(&checkout.dir)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.file_name() != ".git");
    for entry in walker {
        let entry = entry.map_err(std::io::Error::from)?;
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if !files.iter().any(|f| *f == name) {
            continue;
        }
        std::fs::copy(entry.path(), dest.join(&name))?;
        copied += 1;
        found.insert(name);
    }
    Ok((copied, found))
}
