//! Static diagnostics over student source trees.
//!
//! Each matching source file is fed to the compiler; diagnostic lines that
//! contain the pattern of interest become findings with a permalink to the
//! offending line. Repositories scoring below the threshold are not scanned.

use crate::compiler::CompilerInvoker;
use crate::config::Settings;
use crate::error::Result;
use crate::fragment::GradeFragment;
use crate::io;
use crate::paths;
use crate::repository::Checkout;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

// ---------------------------------------------------------------------------
// Score lookup
// ---------------------------------------------------------------------------

pub trait ScoreLookup {
    fn score(&self, repo: &str) -> Option<f64>;
}

impl ScoreLookup for HashMap<String, f64> {
    fn score(&self, repo: &str) -> Option<f64> {
        self.get(repo).copied()
    }
}

/// Scores read from a grading output root (`PASS/` and `FAIL/`).
pub struct GradeDirScores {
    root: PathBuf,
    identity_field: String,
}

impl GradeDirScores {
    pub fn new(root: impl Into<PathBuf>, identity_field: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            identity_field: identity_field.into(),
        }
    }
}

impl ScoreLookup for GradeDirScores {
    fn score(&self, repo: &str) -> Option<f64> {
        let name = paths::grade_fragment_name(repo);
        [paths::pass_dir(&self.root), paths::fail_dir(&self.root)]
            .iter()
            .map(|d| d.join(&name))
            .find(|p| p.is_file())
            .and_then(|p| match GradeFragment::load(&p, &self.identity_field) {
                Ok(f) => Some(f.sum_marks(&self.identity_field)),
                Err(e) => {
                    tracing::warn!(repo, error = %e, "unreadable grade fragment, score unknown");
                    None
                }
            })
    }
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiagnosticFinding {
    pub repo: String,
    /// Path relative to the checkout root, `/`-separated.
    pub file: String,
    pub line: u32,
    pub message: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RepoFindings {
    pub repo: String,
    pub score: f64,
    pub findings: Vec<DiagnosticFinding>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ScanReport {
    /// Only repositories with at least one finding.
    pub repos: Vec<RepoFindings>,
    /// Repositories skipped because their score is under the threshold.
    pub gated: Vec<String>,
    pub errors: Vec<(String, String)>,
}

#[derive(Debug, Clone)]
pub struct ScanOptions {
    pub file_names: Vec<String>,
    pub pattern: String,
    pub include_paths: Vec<String>,
    pub min_score: f64,
    pub web_url: String,
    pub organization: String,
    pub branch: String,
}

impl ScanOptions {
    pub fn from_settings(settings: &Settings, organization: &str) -> Self {
        Self {
            file_names: settings.similarity_files.clone(),
            pattern: settings.scan.pattern.clone(),
            include_paths: settings.scan.include_paths.clone(),
            min_score: settings.scan.min_score,
            web_url: settings.web_url.trim_end_matches('/').to_string(),
            organization: organization.to_string(),
            branch: settings.scan.branch.clone(),
        }
    }

    fn permalink(&self, repo: &str, rel: &str, line: u32) -> String {
        format!(
            "{}/{}/{repo}/blob/{}/{rel}?plain=1#L{line}",
            self.web_url, self.organization, self.branch
        )
    }
}

// ---------------------------------------------------------------------------
// StaticCheckScanner
// ---------------------------------------------------------------------------

pub struct StaticCheckScanner<'a> {
    compiler: &'a dyn CompilerInvoker,
    options: ScanOptions,
}

impl<'a> StaticCheckScanner<'a> {
    pub fn new(compiler: &'a dyn CompilerInvoker, options: ScanOptions) -> Self {
        Self { compiler, options }
    }

    pub fn scan(&self, checkouts: &[Checkout], scores: &dyn ScoreLookup) -> ScanReport {
        let mut report = ScanReport::default();
        for checkout in checkouts {
            // Ungraded repositories count as 0 and stay eligible at the default threshold.
            let score = scores.score(&checkout.name).unwrap_or(0.0);
            if score < self.options.min_score {
                tracing::debug!(repo = %checkout.name, score, "below score threshold, not scanned");
                report.gated.push(checkout.name.clone());
                continue;
            }
            match self.scan_one(checkout) {
                Ok(findings) if findings.is_empty() => {}
                Ok(findings) => report.repos.push(RepoFindings {
                    repo: checkout.name.clone(),
                    score,
                    findings,
                }),
                Err(e) => {
                    tracing::warn!(repo = %checkout.name, error = %e, "scan failed");
                    report.errors.push((checkout.name.clone(), e.to_string()));
                }
            }
        }
        report
    }

    fn scan_one(&self, checkout: &Checkout) -> Result<Vec<DiagnosticFinding>> {
        let mut findings = Vec::new();
        let walker = WalkDir::new(&checkout.dir)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.file_name() != ".git");
        for entry in walker {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    tracing::debug!(repo = %checkout.name, error = %e, "walk error");
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let file_name = entry.file_name().to_string_lossy().into_owned();
            if !self.options.file_names.iter().any(|n| *n == file_name) {
                continue;
            }
            let parent = entry.path().parent().unwrap_or(&checkout.dir);
            let text = self.compiler.diagnostics(
                Path::new(entry.file_name()),
                &self.options.include_paths,
                parent,
            )?;
            let rel = relative_posix(entry.path(), &checkout.dir);
            for line in text.lines().filter(|l| l.contains(&self.options.pattern)) {
                let Some(line_no) = parse_line_number(line) else {
                    tracing::debug!(line, "diagnostic without a line number");
                    continue;
                };
                findings.push(DiagnosticFinding {
                    repo: checkout.name.clone(),
                    file: rel.clone(),
                    line: line_no,
                    message: line.to_string(),
                    url: self.options.permalink(&checkout.name, &rel, line_no),
                });
            }
        }
        Ok(findings)
    }
}

/// `main.c:12:5: warning: ...` yields 12.
pub fn parse_line_number(diagnostic: &str) -> Option<u32> {
    diagnostic.split(':').nth(1)?.trim().parse().ok()
}

fn relative_posix(path: &Path, root: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/")
}

/// Render the flat batch report: one block per repository with findings.
pub fn render_report(report: &ScanReport) -> String {
    let mut out = String::new();
    for repo in &report.repos {
        let _ = writeln!(out, "############### {} {} ###############", repo.repo, repo.score);
        for f in &repo.findings {
            let _ = writeln!(out, "{}", f.url);
        }
        let _ = writeln!(out, "############### END ###############\n");
    }
    out
}

pub fn write_report(report: &ScanReport, path: &Path) -> Result<()> {
    io::atomic_write(path, render_report(report).as_bytes())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use tempfile::TempDir;

    /// Answers every file with a canned diagnostic stream and records calls.
    struct CannedCompiler {
        output: String,
        calls: RefCell<Vec<(PathBuf, PathBuf)>>,
    }

    impl CompilerInvoker for CannedCompiler {
        fn diagnostics(&self, source: &Path, _inc: &[String], cwd: &Path) -> Result<String> {
            self.calls
                .borrow_mut()
                .push((source.to_path_buf(), cwd.to_path_buf()));
            Ok(self.output.clone())
        }
    }

    fn options(min_score: f64) -> ScanOptions {
        ScanOptions {
            file_names: vec!["main.c".to_string()],
            pattern: "non-void function does not return a value".to_string(),
            include_paths: vec![],
            min_score,
            web_url: "https://github.com".to_string(),
            organization: "CMPT-295".to_string(),
            branch: "master".to_string(),
        }
    }

    fn checkout(root: &Path, name: &str) -> Checkout {
        let dir = root.join(name);
        std::fs::create_dir_all(dir.join("src")).unwrap();
        std::fs::write(dir.join("src/main.c"), "int f() {}").unwrap();
        std::fs::write(dir.join("src/other.c"), "").unwrap();
        Checkout::new(dir)
    }

    fn compiler() -> CannedCompiler {
        CannedCompiler {
            output: "main.c:1:11: warning: non-void function does not return a value [-Wreturn-type]\n\
                     main.c:3:1: warning: unused variable 'x'\n"
                .to_string(),
            calls: RefCell::new(vec![]),
        }
    }

    #[test]
    fn findings_carry_permalinks() {
        let dir = TempDir::new().unwrap();
        let c = checkout(dir.path(), "assignment-1-alice");
        let cc = compiler();
        let scanner = StaticCheckScanner::new(&cc, options(0.0));
        let report = scanner.scan(&[c.clone()], &HashMap::new());

        assert_eq!(report.repos.len(), 1);
        let f = &report.repos[0].findings;
        assert_eq!(f.len(), 1);
        assert_eq!(f[0].line, 1);
        assert_eq!(f[0].file, "src/main.c");
        assert_eq!(
            f[0].url,
            "https://github.com/CMPT-295/assignment-1-alice/blob/master/src/main.c?plain=1#L1"
        );
        let calls = cc.calls.borrow();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, PathBuf::from("main.c"));
        assert_eq!(calls[0].1, c.dir.join("src"));
    }

    #[test]
    fn threshold_gates_low_scores() {
        let dir = TempDir::new().unwrap();
        let low = checkout(dir.path(), "p-low");
        let high = checkout(dir.path(), "p-high");
        let scores: HashMap<String, f64> =
            [("p-low".to_string(), 3.0), ("p-high".to_string(), 9.0)].into_iter().collect();
        let cc = compiler();
        let report = StaticCheckScanner::new(&cc, options(5.0)).scan(&[low, high], &scores);
        assert_eq!(report.gated, vec!["p-low"]);
        assert_eq!(report.repos.len(), 1);
        assert_eq!(report.repos[0].repo, "p-high");
        assert_eq!(report.repos[0].score, 9.0);
    }

    #[test]
    fn ungraded_defaults_to_zero_and_passes_zero_threshold() {
        let dir = TempDir::new().unwrap();
        let c = checkout(dir.path(), "p-new");
        let cc = compiler();
        let report = StaticCheckScanner::new(&cc, options(0.0)).scan(&[c], &HashMap::new());
        assert_eq!(report.repos[0].score, 0.0);
        assert!(report.gated.is_empty());
    }

    #[test]
    fn repos_without_findings_are_omitted() {
        let dir = TempDir::new().unwrap();
        let c = checkout(dir.path(), "p-clean");
        let cc = CannedCompiler {
            output: String::new(),
            calls: RefCell::new(vec![]),
        };
        let report = StaticCheckScanner::new(&cc, options(0.0)).scan(&[c], &HashMap::new());
        assert!(report.repos.is_empty());
        assert_eq!(render_report(&report), "");
    }

    #[test]
    fn grade_dir_scores_sum_marks() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("FAIL")).unwrap();
        std::fs::write(
            dir.path().join("FAIL/p-a_Grade.json"),
            r#"{"userid":"x","q1":{"mark":2},"q2":{"mark":"3"}}"#,
        )
        .unwrap();
        let scores = GradeDirScores::new(dir.path(), "userid");
        assert_eq!(scores.score("p-a"), Some(5.0));
        assert_eq!(scores.score("p-b"), None);
    }

    #[test]
    fn report_blocks() {
        let report = ScanReport {
            repos: vec![RepoFindings {
                repo: "p-a".to_string(),
                score: 7.0,
                findings: vec![DiagnosticFinding {
                    repo: "p-a".to_string(),
                    file: "main.c".to_string(),
                    line: 4,
                    message: String::new(),
                    url: "https://x/L4".to_string(),
                }],
            }],
            ..Default::default()
        };
        let text = render_report(&report);
        assert!(text.starts_with("############### p-a 7 ###############\n"));
        assert!(text.contains("https://x/L4\n"));
        assert!(text.contains("############### END ###############"));
    }

    #[test]
    fn line_numbers() {
        assert_eq!(parse_line_number("a.c:42:1: warning: x"), Some(42));
        assert_eq!(parse_line_number("fatal error: no file"), None);
    }
}
