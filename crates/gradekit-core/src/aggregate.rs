//! Roster aggregation: grade fragments in, one import-ready roster out.
//!
//! Every parsed fragment lands in the roster. Identities the crosswalk cannot
//! resolve keep their original value and are reported as misses; files that
//! do not parse are reported as errors. Neither stops the batch.

use crate::config::IdentityConfig;
use crate::crosswalk::Crosswalk;
use crate::error::Result;
use crate::fragment::GradeFragment;
use crate::paths;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// The grade-book import document: `{"marks": [...]}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregatedRoster {
    pub marks: Vec<GradeFragment>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IdentityMiss {
    pub file: PathBuf,
    pub identity: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FragmentError {
    pub file: PathBuf,
    pub reason: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct AggregateReport {
    pub roster: AggregatedRoster,
    pub misses: Vec<IdentityMiss>,
    pub errors: Vec<FragmentError>,
}

// ---------------------------------------------------------------------------
// IdentityNormalizer
// ---------------------------------------------------------------------------

/// Reduces a raw fragment identity such as `GithubID:assignment-1-alice` to
/// the bare platform account `alice`.
pub struct IdentityNormalizer {
    tag: String,
    assignment: Regex,
}

impl IdentityNormalizer {
    pub fn new(config: &IdentityConfig) -> Result<Self> {
        Ok(Self {
            tag: config.tag.clone(),
            assignment: Regex::new(&config.assignment_pattern)?,
        })
    }

    pub fn normalize(&self, raw: &str) -> String {
        let untagged = if self.tag.is_empty() {
            raw.to_string()
        } else {
            raw.replace(&self.tag, "")
        };
        self.assignment.replace_all(&untagged, "").trim().to_string()
    }
}

// ---------------------------------------------------------------------------
// Aggregator
// ---------------------------------------------------------------------------

pub struct Aggregator<'a> {
    crosswalk: &'a Crosswalk,
    normalizer: IdentityNormalizer,
    identity_field: String,
}

impl<'a> Aggregator<'a> {
    pub fn new(crosswalk: &'a Crosswalk, config: &IdentityConfig) -> Result<Self> {
        Ok(Self {
            crosswalk,
            normalizer: IdentityNormalizer::new(config)?,
            identity_field: config.field.clone(),
        })
    }

    /// Build a fresh roster from `files`.
    pub fn aggregate(&self, files: &[PathBuf]) -> AggregateReport {
        let mut report = AggregateReport::default();
        for file in files {
            let mut fragment = match GradeFragment::load(file, &self.identity_field) {
                Ok(f) => f,
                Err(e) => {
                    tracing::warn!(file = %file.display(), error = %e, "skipping unreadable grade fragment");
                    report.errors.push(FragmentError {
                        file: file.clone(),
                        reason: e.to_string(),
                    });
                    continue;
                }
            };
            let raw = fragment
                .identity(&self.identity_field)
                .unwrap_or_default()
                .to_string();
            let platform_id = self.normalizer.normalize(&raw);
            match self.crosswalk.by_platform_id(&platform_id) {
                Some(record) => fragment.set_identity(&self.identity_field, &record.institution_id),
                None => {
                    tracing::warn!(identity = %raw, "not found in identity table, grade book will ignore entry");
                    report.misses.push(IdentityMiss {
                        file: file.clone(),
                        identity: raw,
                    });
                }
            }
            report.roster.marks.push(fragment);
        }
        report
    }
}

/// Grade fragments under `dir`: `PASS/*.json` and `FAIL/*.json` when `dir`
/// is a grading output root, otherwise `dir/*.json`. Sorted by path.
pub fn collect_fragment_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let pass = paths::pass_dir(dir);
    let fail = paths::fail_dir(dir);
    let sources: Vec<PathBuf> = if pass.is_dir() || fail.is_dir() {
        vec![pass, fail].into_iter().filter(|d| d.is_dir()).collect()
    } else {
        vec![dir.to_path_buf()]
    };

    let mut files = Vec::new();
    for source in sources {
        for entry in std::fs::read_dir(&source)? {
            let path = entry?.path();
            if path.is_file() && path.extension().is_some_and(|e| e == "json") {
                files.push(path);
            }
        }
    }
    files.sort();
    Ok(files)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CrosswalkConfig;
    use serde_json::json;
    use tempfile::TempDir;

    fn crosswalk() -> Crosswalk {
        Crosswalk::from_reader(
            "GithubID,SFUID\nalice,301123456\nbob,301999999\n".as_bytes(),
            &CrosswalkConfig::default(),
        )
        .unwrap()
    }

    fn write(dir: &Path, name: &str, value: serde_json::Value) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, serde_json::to_string(&value).unwrap()).unwrap();
        path
    }

    #[test]
    fn normalizer_strips_tag_and_assignment() {
        let n = IdentityNormalizer::new(&IdentityConfig::default()).unwrap();
        assert_eq!(n.normalize("GithubID:assignment-1-alice"), "alice");
        assert_eq!(n.normalize("GithubID:bob"), "bob");
        assert_eq!(n.normalize("assignment-12--carol"), "carol");
    }

    #[test]
    fn resolvable_and_unresolvable_both_kept() {
        let dir = TempDir::new().unwrap();
        let files = vec![
            write(dir.path(), "a.json", json!({"userid": "GithubID:assignment-1-alice", "q1": {"mark": 5}})),
            write(dir.path(), "b.json", json!({"userid": "GithubID:mallory", "q1": {"mark": 2}})),
        ];
        let walk = crosswalk();
        let agg = Aggregator::new(&walk, &IdentityConfig::default()).unwrap();
        let report = agg.aggregate(&files);

        assert_eq!(report.roster.marks.len(), 2);
        assert_eq!(report.roster.marks[0].identity("userid"), Some("301123456"));
        assert_eq!(report.roster.marks[1].identity("userid"), Some("GithubID:mallory"));
        assert_eq!(report.misses.len(), 1);
        assert_eq!(report.misses[0].identity, "GithubID:mallory");
        assert!(report.errors.is_empty());
    }

    #[test]
    fn aggregation_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let files = vec![
            write(dir.path(), "a.json", json!({"userid": "GithubID:alice", "q1": {"mark": 5}})),
            write(dir.path(), "b.json", json!({"userid": "GithubID:bob", "q1": {"mark": 1}})),
        ];
        let walk = crosswalk();
        let agg = Aggregator::new(&walk, &IdentityConfig::default()).unwrap();
        let first = agg.aggregate(&files);
        let mut reversed = files.clone();
        reversed.reverse();
        let second = agg.aggregate(&reversed);

        let key = |r: &AggregateReport| {
            let mut v: Vec<String> = r
                .roster
                .marks
                .iter()
                .map(|f| serde_json::to_string(f).unwrap())
                .collect();
            v.sort();
            v
        };
        assert_eq!(key(&first), key(&second));
    }

    #[test]
    fn malformed_file_is_reported_not_fatal() {
        let dir = TempDir::new().unwrap();
        let bad = dir.path().join("bad.json");
        std::fs::write(&bad, "{not json").unwrap();
        let good = write(dir.path(), "good.json", json!({"userid": "GithubID:bob", "q1": {"mark": 1}}));

        let walk = crosswalk();
        let agg = Aggregator::new(&walk, &IdentityConfig::default()).unwrap();
        let report = agg.aggregate(&[bad, good]);
        assert_eq!(report.roster.marks.len(), 1);
        assert_eq!(report.errors.len(), 1);
    }

    #[test]
    fn roster_serializes_under_marks() {
        let roster = AggregatedRoster {
            marks: vec![GradeFragment::from_value(json!({"userid": "301"})).unwrap()],
        };
        let out = serde_json::to_value(&roster).unwrap();
        assert_eq!(out, json!({"marks": [{"userid": "301"}]}));
    }

    #[test]
    fn collect_prefers_pass_fail_tree() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("PASS")).unwrap();
        std::fs::create_dir_all(dir.path().join("FAIL")).unwrap();
        write(&dir.path().join("PASS"), "a_Grade.json", json!({}));
        write(&dir.path().join("FAIL"), "b_Grade.json", json!({}));
        std::fs::write(dir.path().join("PASS/a.log"), "log").unwrap();
        write(dir.path(), "stray.json", json!({}));

        let files = collect_fragment_files(dir.path()).unwrap();
        assert_eq!(files.len(), 2);
        assert!(files.iter().all(|f| !f.ends_with("stray.json")));
    }

    #[test]
    fn collect_flat_folder() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "x.json", json!({}));
        std::fs::write(dir.path().join("x.txt"), "").unwrap();
        assert_eq!(collect_fragment_files(dir.path()).unwrap().len(), 1);
    }
}
