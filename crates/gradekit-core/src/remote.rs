//! Batches against the hosting platform over a resolved repository set.
//!
//! Like the local batches, a refused call is recorded against its repository
//! and the loop continues.

use crate::config::Settings;
use crate::error::{GradeError, Result};
use crate::git::{run_checked, GitInvoker};
use crate::io;
use crate::platform::{authenticated_clone_url, HostingPlatform, Permission, WorkflowRun};
use crate::repository::Repository;
use serde::Serialize;
use std::path::Path;

pub const GRADING_EVENT: &str = "grading";

#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    /// One entry per successful unit of work (`repo` or `repo/login`).
    pub succeeded: Vec<String>,
    pub failed: Vec<(String, String)>,
}

impl BatchReport {
    fn record(&mut self, unit: String, outcome: Result<()>) {
        match outcome {
            Ok(()) => self.succeeded.push(unit),
            Err(e) => {
                tracing::warn!(%unit, error = %e, "platform call failed");
                self.failed.push((unit, e.to_string()));
            }
        }
    }
}

/// What to do with non-owner collaborators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Set(Permission),
    Remove,
}

pub fn change_access(
    platform: &dyn HostingPlatform,
    repos: &[Repository],
    settings: &Settings,
    access: Access,
) -> BatchReport {
    let mut report = BatchReport::default();
    for repo in repos {
        let accounts = match platform.collaborators(repo) {
            Ok(a) => a,
            Err(e) => {
                report.record(repo.name.clone(), Err(e));
                continue;
            }
        };
        for account in accounts.iter().filter(|a| !settings.is_owner(&a.login)) {
            let outcome = match access {
                Access::Set(level) => platform.set_permission(repo, &account.login, level),
                Access::Remove => platform.remove_collaborator(repo, &account.login),
            };
            report.record(format!("{}/{}", repo.name, account.login), outcome);
        }
    }
    report
}

pub fn dispatch_grading(
    platform: &dyn HostingPlatform,
    repos: &[Repository],
    password: &str,
) -> BatchReport {
    let payload = serde_json::json!({ "password": password });
    let mut report = BatchReport::default();
    for repo in repos {
        report.record(
            repo.name.clone(),
            platform.dispatch_event(repo, GRADING_EVENT, &payload),
        );
    }
    report
}

/// Cancel every run that has not completed. A run the platform refuses to
/// cancel is not a failure.
pub fn cancel_pending(platform: &dyn HostingPlatform, repos: &[Repository]) -> BatchReport {
    let mut report = BatchReport::default();
    for repo in repos {
        let runs = match platform.workflow_runs(repo) {
            Ok(r) => r,
            Err(e) => {
                report.record(repo.name.clone(), Err(e));
                continue;
            }
        };
        for run in runs.iter().filter(|r| !r.is_completed()) {
            let unit = format!("{}/{}", repo.name, run.id);
            match platform.cancel_run(repo, run) {
                Ok(true) => report.succeeded.push(unit),
                Ok(false) => tracing::info!(%unit, "run not cancellable"),
                Err(e) => report.record(unit, Err(e)),
            }
        }
    }
    report
}

#[derive(Debug, Clone, Serialize)]
pub struct RunStatus {
    pub repo: String,
    pub latest_push: Option<WorkflowRun>,
    pub latest_dispatch: Option<WorkflowRun>,
    pub pending: usize,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct StatusReport {
    pub repos: Vec<RunStatus>,
    pub total_pending: usize,
    pub errors: Vec<(String, String)>,
}

fn latest<'r>(runs: &'r [WorkflowRun], event: &str) -> Option<&'r WorkflowRun> {
    runs.iter()
        .filter(|r| r.event == event)
        .max_by_key(|r| r.created_at)
}

pub fn run_status(platform: &dyn HostingPlatform, repos: &[Repository]) -> StatusReport {
    let mut report = StatusReport::default();
    for repo in repos {
        let runs = match platform.workflow_runs(repo) {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(repo = %repo.name, error = %e, "could not list runs");
                report.errors.push((repo.name.clone(), e.to_string()));
                continue;
            }
        };
        let pending = runs.iter().filter(|r| !r.is_completed()).count();
        report.total_pending += pending;
        report.repos.push(RunStatus {
            repo: repo.name.clone(),
            latest_push: latest(&runs, "push").cloned(),
            latest_dispatch: latest(&runs, "repository_dispatch").cloned(),
            pending,
        });
    }
    report
}

pub fn remove_runners(platform: &dyn HostingPlatform, organization: &str) -> Result<BatchReport> {
    let mut report = BatchReport::default();
    for runner in platform.list_runners(organization)? {
        let outcome = platform.remove_runner(organization, &runner);
        report.record(runner.name.clone(), outcome);
    }
    Ok(report)
}

/// Shallow-clone each repository into `dest`. An existing checkout with the
/// same name makes git fail for that repository only.
pub fn clone_all(
    git: &dyn GitInvoker,
    repos: &[Repository],
    token: &str,
    dest: &Path,
) -> Result<BatchReport> {
    io::ensure_dir(dest)?;
    let mut report = BatchReport::default();
    for repo in repos {
        let url = authenticated_clone_url(&repo.clone_url, token);
        tracing::info!(repo = %repo.name, "cloning");
        // The error would carry the token-bearing URL.
        let outcome = run_checked(git, &["clone", "--depth", "1", &url], dest)
            .map(|_| ())
            .map_err(|_| GradeError::Git(format!("clone of {} failed", repo.full_name())));
        report.record(repo.name.clone(), outcome);
    }
    Ok(report)
}
