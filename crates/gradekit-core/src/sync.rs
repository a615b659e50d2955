//! Write-back to student remotes.
//!
//! Every operation walks the checkouts in order and runs its git steps per
//! checkout. A failing step is recorded against that checkout and the batch
//! moves on; nothing is rolled back and nothing is retried.

use crate::git::{GitInvoker, GitOutput};
use crate::io;
use crate::repository::Checkout;
use serde::Serialize;
use std::fmt;

pub const GRADED_COMMIT_TEMPLATE: &str = "Graded project, see the {file}-file in the root directory";
pub const COMMIT_ALL_MESSAGE: &str = "Added everything. Typically after a local run.";
pub const PARENT_COMMIT_MESSAGE: &str = "Pulling changes from forked master";

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStep {
    Write,
    RemoteAdd,
    Fetch,
    Merge,
    Pull,
    Add,
    Commit,
    Push,
}

impl fmt::Display for SyncStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SyncStep::Write => "write",
            SyncStep::RemoteAdd => "remote add",
            SyncStep::Fetch => "fetch",
            SyncStep::Merge => "merge",
            SyncStep::Pull => "pull",
            SyncStep::Add => "add",
            SyncStep::Commit => "commit",
            SyncStep::Push => "push",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncFailure {
    pub name: String,
    /// First step that failed; later steps still ran.
    pub step: SyncStep,
    pub detail: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncReport {
    pub succeeded: Vec<String>,
    pub failed: Vec<SyncFailure>,
    pub skipped: Vec<String>,
}

/// Verdict typed by the grader in pass/fail marker mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Pass,
    Fail,
    Skip,
}

impl Verdict {
    /// `fail` and `skip` are explicit; anything else, including an empty
    /// answer, means pass.
    pub fn parse(input: &str) -> Self {
        match input.trim() {
            "fail" => Verdict::Fail,
            "skip" => Verdict::Skip,
            _ => Verdict::Pass,
        }
    }
}

/// Where starter-code updates come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParentKind {
    /// Student repositories were generated from a template repository.
    Template,
    /// Student repositories are forks of the starter repository.
    Fork,
}

pub fn commit_message(template: &str, artifact: &str) -> String {
    template.replace("{file}", artifact)
}

// ---------------------------------------------------------------------------
// RemoteSyncWriter
// ---------------------------------------------------------------------------

pub struct RemoteSyncWriter<'a> {
    git: &'a dyn GitInvoker,
}

/// Collects step outcomes for one checkout.
struct Steps<'a> {
    git: &'a dyn GitInvoker,
    checkout: &'a Checkout,
    failure: Option<(SyncStep, String)>,
}

impl<'a> Steps<'a> {
    fn new(git: &'a dyn GitInvoker, checkout: &'a Checkout) -> Self {
        Self {
            git,
            checkout,
            failure: None,
        }
    }

    fn fail(&mut self, step: SyncStep, detail: String) {
        tracing::warn!(repo = %self.checkout.name, %step, %detail, "sync step failed");
        if self.failure.is_none() {
            self.failure = Some((step, detail));
        }
    }

    /// Run one git step; returns whether it succeeded.
    fn git(&mut self, step: SyncStep, args: &[&str]) -> bool {
        match self.git.run(args, &self.checkout.dir) {
            Ok(out) if out.success() => true,
            Ok(out) => {
                self.fail(step, describe(&out));
                false
            }
            Err(e) => {
                self.fail(step, e.to_string());
                false
            }
        }
    }

    fn finish(self, report: &mut SyncReport) {
        match self.failure {
            None => report.succeeded.push(self.checkout.name.clone()),
            Some((step, detail)) => report.failed.push(SyncFailure {
                name: self.checkout.name.clone(),
                step,
                detail,
            }),
        }
    }
}

fn describe(out: &GitOutput) -> String {
    match out.code {
        Some(code) => format!("exit {code}: {}", out.summary()),
        None => format!("killed: {}", out.summary()),
    }
}

impl<'a> RemoteSyncWriter<'a> {
    pub fn new(git: &'a dyn GitInvoker) -> Self {
        Self { git }
    }

    /// Write the same `content` into every checkout, then add/commit/push.
    pub fn publish(
        &self,
        checkouts: &[Checkout],
        artifact: &str,
        content: &str,
        commit_template: &str,
    ) -> SyncReport {
        self.publish_with(checkouts, artifact, commit_template, |_| {
            Some(content.to_string())
        })
    }

    /// Like [`publish`](Self::publish) with per-checkout content. `None`
    /// from `content_for` skips the checkout without touching it.
    pub fn publish_with<F>(
        &self,
        checkouts: &[Checkout],
        artifact: &str,
        commit_template: &str,
        mut content_for: F,
    ) -> SyncReport
    where
        F: FnMut(&Checkout) -> Option<String>,
    {
        let message = commit_message(commit_template, artifact);
        let mut report = SyncReport::default();
        for checkout in checkouts {
            let Some(content) = content_for(checkout) else {
                tracing::info!(repo = %checkout.name, "skipped");
                report.skipped.push(checkout.name.clone());
                continue;
            };
            let mut steps = Steps::new(self.git, checkout);
            if let Err(e) = io::atomic_write(&checkout.dir.join(artifact), content.as_bytes()) {
                steps.fail(SyncStep::Write, e.to_string());
                steps.finish(&mut report);
                continue;
            }
            steps.git(SyncStep::Add, &["add", artifact]);
            steps.git(SyncStep::Commit, &["commit", "-m", &message]);
            steps.git(SyncStep::Push, &["push"]);
            steps.finish(&mut report);
        }
        report
    }

    /// Stage everything in each checkout, commit and push.
    pub fn commit_all(&self, checkouts: &[Checkout], message: &str) -> SyncReport {
        let mut report = SyncReport::default();
        for checkout in checkouts {
            let mut steps = Steps::new(self.git, checkout);
            steps.git(SyncStep::Add, &["add", "-A"]);
            steps.git(SyncStep::Commit, &["commit", "-m", message]);
            steps.git(SyncStep::Push, &["push"]);
            steps.finish(&mut report);
        }
        report
    }

    /// Merge starter-repository changes into each checkout and push.
    /// Only clean merges work; a conflicting checkout is reported as failed
    /// at the merge/pull step.
    pub fn update_from_parent(
        &self,
        checkouts: &[Checkout],
        parent: &str,
        kind: ParentKind,
    ) -> SyncReport {
        let mut report = SyncReport::default();
        for checkout in checkouts {
            let mut steps = Steps::new(self.git, checkout);
            let merged = match kind {
                ParentKind::Template => {
                    // An existing `template` remote from an earlier run is fine.
                    if let Ok(out) = self.git.run(&["remote", "add", "template", parent], &checkout.dir) {
                        if !out.success() {
                            tracing::debug!(repo = %checkout.name, "template remote already present");
                        }
                    }
                    steps.git(SyncStep::Fetch, &["fetch", "--all"])
                        && steps.git(
                            SyncStep::Merge,
                            &["merge", "template/master", "--allow-unrelated-histories"],
                        )
                }
                ParentKind::Fork => steps.git(SyncStep::Pull, &["pull", parent, "master"]),
            };
            if merged {
                steps.git(SyncStep::Add, &["add", "."]);
                steps.git(SyncStep::Commit, &["commit", "-am", PARENT_COMMIT_MESSAGE]);
                steps.git(SyncStep::Push, &["push"]);
            }
            steps.finish(&mut report);
        }
        report
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use std::cell::RefCell;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    /// Scripted git: fails any command whose (dir name, subcommand) is listed.
    #[derive(Default)]
    struct ScriptedGit {
        fail: Vec<(String, String)>,
        calls: RefCell<Vec<(String, Vec<String>)>>,
    }

    impl GitInvoker for ScriptedGit {
        fn run(&self, args: &[&str], cwd: &Path) -> Result<GitOutput> {
            let dir = crate::paths::basename(cwd);
            let sub = args.first().copied().unwrap_or("").to_string();
            self.calls
                .borrow_mut()
                .push((dir.clone(), args.iter().map(|s| s.to_string()).collect()));
            let failed = self.fail.iter().any(|(d, s)| *d == dir && *s == sub);
            Ok(GitOutput {
                code: Some(if failed { 1 } else { 0 }),
                stdout: String::new(),
                stderr: if failed { format!("{sub} refused") } else { String::new() },
            })
        }
    }

    fn checkouts(root: &Path, names: &[&str]) -> Vec<Checkout> {
        names
            .iter()
            .map(|n| {
                let dir: PathBuf = root.join(n);
                std::fs::create_dir_all(&dir).unwrap();
                Checkout::new(dir)
            })
            .collect()
    }

    #[test]
    fn commit_failure_is_isolated_and_file_is_written_everywhere() {
        let dir = TempDir::new().unwrap();
        let cs = checkouts(dir.path(), &["r1", "r2", "r3"]);
        let git = ScriptedGit {
            fail: vec![("r2".to_string(), "commit".to_string())],
            ..Default::default()
        };
        let report = RemoteSyncWriter::new(&git).publish(
            &cs,
            "RESULT.md",
            "Result: PASS",
            GRADED_COMMIT_TEMPLATE,
        );

        assert_eq!(report.succeeded, vec!["r1", "r3"]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].name, "r2");
        assert_eq!(report.failed[0].step, SyncStep::Commit);
        assert!(report.failed[0].detail.contains("commit refused"));
        for c in &cs {
            assert_eq!(
                std::fs::read_to_string(c.dir.join("RESULT.md")).unwrap(),
                "Result: PASS"
            );
        }
        // push still attempted for r2
        let calls = git.calls.borrow();
        assert!(calls.iter().any(|(d, a)| d == "r2" && a[0] == "push"));
    }

    #[test]
    fn commit_message_names_artifact() {
        let dir = TempDir::new().unwrap();
        let cs = checkouts(dir.path(), &["r1"]);
        let git = ScriptedGit::default();
        RemoteSyncWriter::new(&git).publish(&cs, "GRADING.md", "x", GRADED_COMMIT_TEMPLATE);
        let calls = git.calls.borrow();
        assert_eq!(calls[0].1, vec!["add", "GRADING.md"]);
        assert_eq!(
            calls[1].1,
            vec![
                "commit",
                "-m",
                "Graded project, see the GRADING.md-file in the root directory"
            ]
        );
        assert_eq!(calls[2].1, vec!["push"]);
    }

    #[test]
    fn publish_with_skips_unmatched() {
        let dir = TempDir::new().unwrap();
        let cs = checkouts(dir.path(), &["p-alice", "p-zed"]);
        let git = ScriptedGit::default();
        let report = RemoteSyncWriter::new(&git).publish_with(
            &cs,
            "GRADING.md",
            GRADED_COMMIT_TEMPLATE,
            |c| c.name.ends_with("alice").then(|| "### alice\n".to_string()),
        );
        assert_eq!(report.succeeded, vec!["p-alice"]);
        assert_eq!(report.skipped, vec!["p-zed"]);
        assert!(!cs[1].dir.join("GRADING.md").exists());
    }

    #[test]
    fn fork_update_stops_after_failed_pull() {
        let dir = TempDir::new().unwrap();
        let cs = checkouts(dir.path(), &["r1", "r2"]);
        let git = ScriptedGit {
            fail: vec![("r1".to_string(), "pull".to_string())],
            ..Default::default()
        };
        let report = RemoteSyncWriter::new(&git).update_from_parent(
            &cs,
            "https://github.com/org/starter",
            ParentKind::Fork,
        );
        assert_eq!(report.succeeded, vec!["r2"]);
        assert_eq!(report.failed[0].step, SyncStep::Pull);
        let calls = git.calls.borrow();
        assert_eq!(calls.iter().filter(|(d, _)| d == "r1").count(), 1);
    }

    #[test]
    fn template_update_tolerates_existing_remote() {
        let dir = TempDir::new().unwrap();
        let cs = checkouts(dir.path(), &["r1"]);
        let git = ScriptedGit {
            fail: vec![("r1".to_string(), "remote".to_string())],
            ..Default::default()
        };
        let report = RemoteSyncWriter::new(&git).update_from_parent(
            &cs,
            "https://github.com/org/starter",
            ParentKind::Template,
        );
        assert_eq!(report.succeeded, vec!["r1"]);
        let subs: Vec<String> = git.calls.borrow().iter().map(|(_, a)| a[0].clone()).collect();
        assert_eq!(subs, vec!["remote", "fetch", "merge", "add", "commit", "push"]);
    }

    #[test]
    fn commit_all_stages_everything() {
        let dir = TempDir::new().unwrap();
        let cs = checkouts(dir.path(), &["r1"]);
        let git = ScriptedGit::default();
        let report = RemoteSyncWriter::new(&git).commit_all(&cs, COMMIT_ALL_MESSAGE);
        assert_eq!(report.succeeded, vec!["r1"]);
        assert_eq!(git.calls.borrow()[0].1, vec!["add", "-A"]);
    }

    #[test]
    fn verdict_parsing() {
        assert_eq!(Verdict::parse("fail\n"), Verdict::Fail);
        assert_eq!(Verdict::parse("skip"), Verdict::Skip);
        assert_eq!(Verdict::parse(""), Verdict::Pass);
        assert_eq!(Verdict::parse("pass"), Verdict::Pass);
    }
}
