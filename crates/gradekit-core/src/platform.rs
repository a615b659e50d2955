//! Hosting-platform client.
//!
//! [`HostingPlatform`] is the narrow surface the orchestrator needs from the
//! platform. [`GitHubClient`] implements it over the GitHub REST API with a
//! blocking `reqwest` client; [`DryRun`] wraps any implementation and turns
//! mutating calls into log lines.

use crate::error::{GradeError, Result};
use crate::repository::Repository;
use chrono::{DateTime, Utc};
use reqwest::blocking::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

const PAGE_SIZE: usize = 100;
const USER_AGENT: &str = concat!("gradekit/", env!("CARGO_PKG_VERSION"));

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub login: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    Pull,
    Push,
}

impl Permission {
    pub fn as_str(self) -> &'static str {
        match self {
            Permission::Pull => "pull",
            Permission::Push => "push",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowRun {
    pub id: u64,
    pub event: String,
    pub status: String,
    #[serde(default)]
    pub conclusion: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl WorkflowRun {
    pub fn is_completed(&self) -> bool {
        self.status == "completed"
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Runner {
    pub id: u64,
    pub name: String,
}

// ---------------------------------------------------------------------------
// HostingPlatform
// ---------------------------------------------------------------------------

pub trait HostingPlatform {
    /// Every repository the authenticated user can see.
    fn list_repositories(&self) -> Result<Vec<Repository>>;
    fn collaborators(&self, repo: &Repository) -> Result<Vec<Account>>;
    fn set_permission(&self, repo: &Repository, login: &str, level: Permission) -> Result<()>;
    fn remove_collaborator(&self, repo: &Repository, login: &str) -> Result<()>;
    fn dispatch_event(
        &self,
        repo: &Repository,
        event_type: &str,
        payload: &serde_json::Value,
    ) -> Result<()>;
    fn workflow_runs(&self, repo: &Repository) -> Result<Vec<WorkflowRun>>;
    /// Returns false when the platform refuses (e.g. the run already finished).
    fn cancel_run(&self, repo: &Repository, run: &WorkflowRun) -> Result<bool>;
    fn list_runners(&self, organization: &str) -> Result<Vec<Runner>>;
    fn remove_runner(&self, organization: &str, runner: &Runner) -> Result<()>;
    fn commit_count(&self, repo: &Repository) -> Result<usize>;
}

/// Embed `token` into an HTTPS clone URL so `git clone` authenticates.
pub fn authenticated_clone_url(clone_url: &str, token: &str) -> String {
    match clone_url.split_once("://") {
        Some((scheme, rest)) => format!("{scheme}://{token}@{rest}"),
        None => clone_url.to_string(),
    }
}

// ---------------------------------------------------------------------------
// GitHubClient
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct WireOwner {
    login: String,
}

#[derive(Deserialize)]
struct WireRepository {
    name: String,
    owner: WireOwner,
    clone_url: String,
    #[serde(default)]
    html_url: String,
}

impl From<WireRepository> for Repository {
    fn from(w: WireRepository) -> Self {
        Repository {
            name: w.name,
            owner: w.owner.login,
            clone_url: w.clone_url,
            html_url: w.html_url,
        }
    }
}

#[derive(Deserialize)]
struct WireRuns {
    workflow_runs: Vec<WorkflowRun>,
}

#[derive(Deserialize)]
struct WireRunners {
    runners: Vec<Runner>,
}

pub struct GitHubClient {
    http: Client,
    base_url: String,
    token: String,
}

impl GitHubClient {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Result<Self> {
        let http = Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        })
    }

    fn request(&self, method: reqwest::Method, path: &str) -> RequestBuilder {
        self.http
            .request(method, format!("{}{}", self.base_url, path))
            .bearer_auth(&self.token)
            .header("Accept", "application/vnd.github+json")
    }

    fn send(&self, req: RequestBuilder) -> Result<Response> {
        let resp = req.send()?;
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let message = resp.text().unwrap_or_default();
        Err(GradeError::Api {
            status: status.as_u16(),
            message: message.chars().take(500).collect(),
        })
    }

    fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        Ok(self.send(self.request(reqwest::Method::GET, path))?.json()?)
    }

    /// Follow `page=N` until a short page comes back.
    fn paginate<W, T, F>(&self, path: &str, extract: F) -> Result<Vec<T>>
    where
        W: DeserializeOwned,
        F: Fn(W) -> Vec<T>,
    {
        let sep = if path.contains('?') { '&' } else { '?' };
        let mut out = Vec::new();
        let mut page = 1;
        loop {
            let wire: W = self.get_json(&format!("{path}{sep}per_page={PAGE_SIZE}&page={page}"))?;
            let items = extract(wire);
            let n = items.len();
            out.extend(items);
            if n < PAGE_SIZE {
                return Ok(out);
            }
            page += 1;
        }
    }
}

impl HostingPlatform for GitHubClient {
    fn list_repositories(&self) -> Result<Vec<Repository>> {
        self.paginate("/user/repos", |page: Vec<WireRepository>| {
            page.into_iter().map(Repository::from).collect()
        })
    }

    fn collaborators(&self, repo: &Repository) -> Result<Vec<Account>> {
        self.paginate(
            &format!("/repos/{}/collaborators", repo.full_name()),
            |page: Vec<Account>| page,
        )
    }

    fn set_permission(&self, repo: &Repository, login: &str, level: Permission) -> Result<()> {
        let path = format!("/repos/{}/collaborators/{login}", repo.full_name());
        let body = serde_json::json!({ "permission": level.as_str() });
        self.send(self.request(reqwest::Method::PUT, &path).json(&body))?;
        Ok(())
    }

    fn remove_collaborator(&self, repo: &Repository, login: &str) -> Result<()> {
        let path = format!("/repos/{}/collaborators/{login}", repo.full_name());
        self.send(self.request(reqwest::Method::DELETE, &path))?;
        Ok(())
    }

    fn dispatch_event(
        &self,
        repo: &Repository,
        event_type: &str,
        payload: &serde_json::Value,
    ) -> Result<()> {
        let path = format!("/repos/{}/dispatches", repo.full_name());
        let body = serde_json::json!({ "event_type": event_type, "client_payload": payload });
        self.send(self.request(reqwest::Method::POST, &path).json(&body))?;
        Ok(())
    }

    fn workflow_runs(&self, repo: &Repository) -> Result<Vec<WorkflowRun>> {
        self.paginate(
            &format!("/repos/{}/actions/runs", repo.full_name()),
            |page: WireRuns| page.workflow_runs,
        )
    }

    fn cancel_run(&self, repo: &Repository, run: &WorkflowRun) -> Result<bool> {
        let path = format!("/repos/{}/actions/runs/{}/cancel", repo.full_name(), run.id);
        match self.send(self.request(reqwest::Method::POST, &path)) {
            Ok(_) => Ok(true),
            Err(GradeError::Api { status: 409, .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    fn list_runners(&self, organization: &str) -> Result<Vec<Runner>> {
        self.paginate(
            &format!("/orgs/{organization}/actions/runners"),
            |page: WireRunners| page.runners,
        )
    }

    fn remove_runner(&self, organization: &str, runner: &Runner) -> Result<()> {
        let path = format!("/orgs/{organization}/actions/runners/{}", runner.id);
        self.send(self.request(reqwest::Method::DELETE, &path))?;
        Ok(())
    }

    fn commit_count(&self, repo: &Repository) -> Result<usize> {
        let commits = self.paginate(
            &format!("/repos/{}/commits", repo.full_name()),
            |page: Vec<serde_json::Value>| page,
        )?;
        Ok(commits.len())
    }
}

// ---------------------------------------------------------------------------
// DryRun
// ---------------------------------------------------------------------------

/// Forwards reads to `inner`; logs mutations instead of sending them.
pub struct DryRun<'a> {
    inner: &'a dyn HostingPlatform,
}

impl<'a> DryRun<'a> {
    pub fn new(inner: &'a dyn HostingPlatform) -> Self {
        Self { inner }
    }
}

impl HostingPlatform for DryRun<'_> {
    fn list_repositories(&self) -> Result<Vec<Repository>> {
        self.inner.list_repositories()
    }

    fn collaborators(&self, repo: &Repository) -> Result<Vec<Account>> {
        self.inner.collaborators(repo)
    }

    fn set_permission(&self, repo: &Repository, login: &str, level: Permission) -> Result<()> {
        tracing::info!(repo = %repo.name, login, level = level.as_str(), "dry run: would set permission");
        Ok(())
    }

    fn remove_collaborator(&self, repo: &Repository, login: &str) -> Result<()> {
        tracing::info!(repo = %repo.name, login, "dry run: would remove collaborator");
        Ok(())
    }

    fn dispatch_event(
        &self,
        repo: &Repository,
        event_type: &str,
        _payload: &serde_json::Value,
    ) -> Result<()> {
        tracing::info!(repo = %repo.name, event_type, "dry run: would dispatch event");
        Ok(())
    }

    fn workflow_runs(&self, repo: &Repository) -> Result<Vec<WorkflowRun>> {
        self.inner.workflow_runs(repo)
    }

    fn cancel_run(&self, repo: &Repository, run: &WorkflowRun) -> Result<bool> {
        tracing::info!(repo = %repo.name, run = run.id, "dry run: would cancel run");
        Ok(false)
    }

    fn list_runners(&self, organization: &str) -> Result<Vec<Runner>> {
        self.inner.list_runners(organization)
    }

    fn remove_runner(&self, organization: &str, runner: &Runner) -> Result<()> {
        tracing::info!(organization, runner = %runner.name, "dry run: would remove runner");
        Ok(())
    }

    fn commit_count(&self, repo: &Repository) -> Result<usize> {
        self.inner.commit_count(repo)
    }
}

// ---------------------------------------------------------------------------
// Test double
// ---------------------------------------------------------------------------


// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
