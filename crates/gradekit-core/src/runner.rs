//! Local grading across every checkout of an assignment.
//!
//! The grading script is opaque. It signals its verdict by leaving a
//! `SUCCESS` or `FAILED` sentinel in the checkout, next to a log and a grade
//! fragment named after the checkout. That filesystem contract is read once
//! per checkout and turned into a [`GradingOutcome`]; nothing downstream looks
//! at sentinels again.

use crate::config::GradingConfig;
use crate::error::Result;
use crate::io;
use crate::paths;
use crate::repository::Checkout;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GradingOutcome {
    Pass,
    Fail,
}

impl GradingOutcome {
    /// Read the sentinels in `dir`. FAILED wins when both are present.
    pub fn detect(dir: &Path) -> Option<Self> {
        if dir.join(paths::FAILED_SENTINEL).is_file() {
            Some(GradingOutcome::Fail)
        } else if dir.join(paths::SUCCESS_SENTINEL).is_file() {
            Some(GradingOutcome::Pass)
        } else {
            None
        }
    }
}

impl fmt::Display for GradingOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GradingOutcome::Pass => write!(f, "PASS"),
            GradingOutcome::Fail => write!(f, "FAIL"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RepoResult {
    pub name: String,
    pub outcome: GradingOutcome,
    /// Collected log inside PASS/ or FAIL/.
    pub log: PathBuf,
    /// Collected grade fragment inside PASS/ or FAIL/.
    pub grade: PathBuf,
    pub exit_code: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum IncompleteReason {
    ScriptMissing,
    SpawnFailed(String),
    NoSentinel,
    ArtifactMissing(PathBuf),
    CopyFailed(String),
}

impl fmt::Display for IncompleteReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IncompleteReason::ScriptMissing => write!(f, "script missing"),
            IncompleteReason::SpawnFailed(e) => write!(f, "script failed to start: {e}"),
            IncompleteReason::NoSentinel => write!(f, "grading did not complete (no sentinel)"),
            IncompleteReason::ArtifactMissing(p) => write!(f, "artifact missing: {}", p.display()),
            IncompleteReason::CopyFailed(e) => write!(f, "could not collect artifacts: {e}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Incomplete {
    pub name: String,
    pub reason: IncompleteReason,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct GradingBatch {
    pub pass: Vec<RepoResult>,
    pub fail: Vec<RepoResult>,
    pub incomplete: Vec<Incomplete>,
}

// ---------------------------------------------------------------------------
// LocalGradingRunner
// ---------------------------------------------------------------------------

pub struct LocalGradingRunner {
    script: PathBuf,
    interpreter: String,
    output_root: PathBuf,
}

impl LocalGradingRunner {
    pub fn new(config: &GradingConfig, workdir: &Path) -> Self {
        Self {
            script: config.script.clone(),
            interpreter: config.interpreter.clone(),
            output_root: workdir.join(&config.output_root),
        }
    }

    pub fn output_root(&self) -> &Path {
        &self.output_root
    }

    /// Grade every checkout in order. Only failing to prepare the output
    /// tree is an error; everything per-checkout ends up in the batch.
    pub fn run_all(&self, checkouts: &[Checkout]) -> Result<GradingBatch> {
        io::reset_dir(&self.output_root)?;
        let pass_dir = paths::pass_dir(&self.output_root);
        let fail_dir = paths::fail_dir(&self.output_root);
        io::ensure_dir(&pass_dir)?;
        io::ensure_dir(&fail_dir)?;

        let mut batch = GradingBatch::default();
        for checkout in checkouts {
            match self.grade_one(checkout, &pass_dir, &fail_dir) {
                Ok(result) => {
                    tracing::info!(repo = %result.name, outcome = %result.outcome, "graded");
                    match result.outcome {
                        GradingOutcome::Pass => batch.pass.push(result),
                        GradingOutcome::Fail => batch.fail.push(result),
                    }
                }
                Err(reason) => {
                    tracing::warn!(repo = %checkout.name, %reason, "grading incomplete");
                    batch.incomplete.push(Incomplete {
                        name: checkout.name.clone(),
                        reason,
                    });
                }
            }
        }
        Ok(batch)
    }

    fn grade_one(
        &self,
        checkout: &Checkout,
        pass_dir: &Path,
        fail_dir: &Path,
    ) -> std::result::Result<RepoResult, IncompleteReason> {
        let script = checkout.dir.join(&self.script);
        if !script.is_file() {
            return Err(IncompleteReason::ScriptMissing);
        }

        clear_sentinels(&checkout.dir).map_err(|e| IncompleteReason::CopyFailed(e.to_string()))?;

        let status = self
            .command(&script, &checkout.dir)
            .status()
            .map_err(|e| IncompleteReason::SpawnFailed(e.to_string()))?;
        if !status.success() {
            tracing::debug!(repo = %checkout.name, code = ?status.code(), "grading script exited non-zero");
        }

        let outcome = GradingOutcome::detect(&checkout.dir).ok_or(IncompleteReason::NoSentinel)?;
        let base = paths::basename(&checkout.dir);
        let (log_name, dest_dir) = match outcome {
            GradingOutcome::Pass => (paths::success_log_name(&base), pass_dir),
            GradingOutcome::Fail => (paths::failed_log_name(&base), fail_dir),
        };

        let log = collect(
            &checkout.dir.join(log_name),
            &dest_dir.join(paths::collected_log_name(&base)),
        )?;
        let grade_name = paths::grade_fragment_name(&base);
        let grade = collect(&checkout.dir.join(&grade_name), &dest_dir.join(&grade_name))?;

        Ok(RepoResult {
            name: checkout.name.clone(),
            outcome,
            log,
            grade,
            exit_code: status.code(),
        })
    }

    fn command(&self, script: &Path, cwd: &Path) -> Command {
        let mut cmd = if self.interpreter.trim().is_empty() {
            Command::new(script)
        } else {
            let mut c = Command::new(&self.interpreter);
            c.arg(script);
            c
        };
        // Script chatter goes to stderr; stdout carries the batch result.
        cmd.current_dir(cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::from(std::io::stderr()));
        cmd
    }
}

/// Sentinels left by an earlier run must not decide this run's outcome.
fn clear_sentinels(dir: &Path) -> Result<()> {
    io::remove_if_exists(&dir.join(paths::SUCCESS_SENTINEL))?;
    io::remove_if_exists(&dir.join(paths::FAILED_SENTINEL))?;
    Ok(())
}

fn collect(src: &Path, dest: &Path) -> std::result::Result<PathBuf, IncompleteReason> {
    if !src.is_file() {
        return Err(IncompleteReason::ArtifactMissing(src.to_path_buf()));
    }
    std::fs::copy(src, dest).map_err(|e| IncompleteReason::CopyFailed(e.to_string()))?;
    Ok(dest.to_path_buf())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn checkout_with_script(project: &Path, name: &str, body: &str) -> Checkout {
        let dir = project.join(name);
        std::fs::create_dir_all(dir.join("scripts")).unwrap();
        std::fs::write(dir.join("scripts/localci.sh"), body).unwrap();
        Checkout::new(dir)
    }

    fn runner(workdir: &Path) -> LocalGradingRunner {
        LocalGradingRunner::new(&GradingConfig::default(), workdir)
    }

    fn names(dir: &Path) -> Vec<String> {
        let mut v: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        v.sort();
        v
    }

    #[test]
    fn failed_sentinel_routes_to_fail_and_missing_script_is_incomplete() {
        let work = TempDir::new().unwrap();
        let project = work.path().join("assignment-1");
        let failing = checkout_with_script(
            &project,
            "assignment-1-alice",
            "touch FAILED\n\
             echo 'test 3 failed' > assignment-1-alice.log.failed\n\
             echo '{\"userid\":\"GithubID:alice\",\"q1\":{\"mark\":2}}' > assignment-1-alice_Grade.json\n",
        );
        let no_script = Checkout::new(project.join("assignment-1-bob"));
        std::fs::create_dir_all(&no_script.dir).unwrap();

        let r = runner(work.path());
        let batch = r.run_all(&[failing, no_script]).unwrap();

        assert_eq!(batch.fail.len(), 1);
        assert!(batch.pass.is_empty());
        assert_eq!(
            batch.incomplete,
            vec![Incomplete {
                name: "assignment-1-bob".to_string(),
                reason: IncompleteReason::ScriptMissing,
            }]
        );
        let fail_dir = paths::fail_dir(r.output_root());
        assert_eq!(
            names(&fail_dir),
            vec!["assignment-1-alice.log", "assignment-1-alice_Grade.json"]
        );
        assert!(names(&paths::pass_dir(r.output_root())).is_empty());
        assert_eq!(
            std::fs::read_to_string(fail_dir.join("assignment-1-alice.log")).unwrap(),
            "test 3 failed\n"
        );
    }

    #[test]
    fn success_sentinel_routes_to_pass() {
        let work = TempDir::new().unwrap();
        let project = work.path().join("p");
        let ok = checkout_with_script(
            &project,
            "p-carol",
            "touch SUCCESS\necho ok > p-carol.log.success\necho '{}' > p-carol_Grade.json\n",
        );
        let batch = runner(work.path()).run_all(&[ok]).unwrap();
        assert_eq!(batch.pass.len(), 1);
        assert_eq!(batch.pass[0].outcome, GradingOutcome::Pass);
        assert_eq!(batch.pass[0].exit_code, Some(0));
        assert!(batch.pass[0].log.ends_with("PASS/p-carol.log"));
    }

    #[test]
    fn no_sentinel_is_incomplete() {
        let work = TempDir::new().unwrap();
        let c = checkout_with_script(&work.path().join("p"), "p-dan", "exit 3\n");
        let batch = runner(work.path()).run_all(&[c]).unwrap();
        assert_eq!(batch.incomplete.len(), 1);
        assert_eq!(batch.incomplete[0].reason, IncompleteReason::NoSentinel);
    }

    #[test]
    fn stale_sentinel_is_cleared_before_run() {
        let work = TempDir::new().unwrap();
        let c = checkout_with_script(&work.path().join("p"), "p-erin", "true\n");
        std::fs::write(c.dir.join("SUCCESS"), "").unwrap();
        let batch = runner(work.path()).run_all(&[c]).unwrap();
        assert!(batch.pass.is_empty());
        assert_eq!(batch.incomplete[0].reason, IncompleteReason::NoSentinel);
    }

    #[test]
    fn missing_grade_fragment_is_incomplete() {
        let work = TempDir::new().unwrap();
        let c = checkout_with_script(
            &work.path().join("p"),
            "p-finn",
            "touch SUCCESS\necho ok > p-finn.log.success\n",
        );
        let batch = runner(work.path()).run_all(&[c]).unwrap();
        assert!(matches!(
            batch.incomplete[0].reason,
            IncompleteReason::ArtifactMissing(_)
        ));
    }

    #[test]
    fn output_root_is_recreated() {
        let work = TempDir::new().unwrap();
        let r = runner(work.path());
        std::fs::create_dir_all(paths::pass_dir(r.output_root())).unwrap();
        std::fs::write(paths::pass_dir(r.output_root()).join("old.log"), "").unwrap();
        r.run_all(&[]).unwrap();
        assert!(names(&paths::pass_dir(r.output_root())).is_empty());
        assert!(paths::fail_dir(r.output_root()).is_dir());
    }

    #[test]
    fn failed_wins_over_success() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("SUCCESS"), "").unwrap();
        std::fs::write(dir.path().join("FAILED"), "").unwrap();
        assert_eq!(GradingOutcome::detect(dir.path()), Some(GradingOutcome::Fail));
    }
}
