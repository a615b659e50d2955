//! Repository models and assignment-set resolution.
//!
//! A [`Repository`] is what the hosting platform knows about; a [`Checkout`]
//! is a cloned working copy on disk. Both are rediscovered on every run.

use crate::error::{GradeError, Result};
use crate::platform::HostingPlatform;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    pub name: String,
    /// Login of the owning account (user or organization).
    pub owner: String,
    pub clone_url: String,
    #[serde(default)]
    pub html_url: String,
}

impl Repository {
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }
}

/// A local working copy of one student repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkout {
    pub name: String,
    pub dir: PathBuf,
}

impl Checkout {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        Self {
            name: crate::paths::basename(&dir),
            dir,
        }
    }
}

// ---------------------------------------------------------------------------
// Matching
// ---------------------------------------------------------------------------

/// Decides whether a repository name belongs to a project.
pub trait MatchPolicy {
    fn matches(&self, name: &str, project: &str) -> bool;
}

/// Built-in matching strategies.
///
/// `Substring` is unanchored: project `assignment-1` also matches
/// `assignment-10-bob`. Callers pass a specific prefix such as
/// `assignment-1-` to avoid that.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStrategy {
    #[default]
    Substring,
    Prefix,
}

impl MatchPolicy for MatchStrategy {
    fn matches(&self, name: &str, project: &str) -> bool {
        match self {
            MatchStrategy::Substring => name.contains(project),
            MatchStrategy::Prefix => name.starts_with(project),
        }
    }
}

impl FromStr for MatchStrategy {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "substring" => Ok(MatchStrategy::Substring),
            "prefix" => Ok(MatchStrategy::Prefix),
            other => Err(format!("unknown match strategy '{other}' (substring|prefix)")),
        }
    }
}

/// True when `repo` belongs to `project` under `policy` and, if given, is
/// owned by `organization`.
pub fn is_matching(
    repo: &Repository,
    project: &str,
    organization: Option<&str>,
    policy: &dyn MatchPolicy,
) -> bool {
    if !policy.matches(&repo.name, project) {
        return false;
    }
    match organization {
        Some(org) => repo.owner == org,
        None => true,
    }
}

// ---------------------------------------------------------------------------
// RepositorySetResolver
// ---------------------------------------------------------------------------

pub struct RepositorySetResolver<'a> {
    platform: &'a dyn HostingPlatform,
    policy: &'a dyn MatchPolicy,
}

impl<'a> RepositorySetResolver<'a> {
    pub fn new(platform: &'a dyn HostingPlatform, policy: &'a dyn MatchPolicy) -> Self {
        Self { platform, policy }
    }

    /// Every repository visible to the authenticated user that matches.
    /// An empty result is not an error.
    pub fn resolve(&self, project: &str, organization: Option<&str>) -> Result<Vec<Repository>> {
        let all = self.platform.list_repositories()?;
        let total = all.len();
        let matched: Vec<Repository> = all
            .into_iter()
            .filter(|r| is_matching(r, project, organization, self.policy))
            .collect();
        tracing::debug!(total, matched = matched.len(), project, "resolved repository set");
        Ok(matched)
    }
}

// ---------------------------------------------------------------------------
// Local checkouts
// ---------------------------------------------------------------------------

/// List the checkouts under `project_dir`, sorted by name. Plain files are
/// skipped with a warning.
pub fn discover_checkouts(project_dir: &Path) -> Result<Vec<Checkout>> {
    if !project_dir.is_dir() {
        return Err(GradeError::NotADirectory(project_dir.to_path_buf()));
    }
    let mut checkouts = Vec::new();
    for entry in std::fs::read_dir(project_dir)? {
        let path = entry?.path();
        if path.is_dir() {
            checkouts.push(Checkout::new(path));
        } else {
            tracing::warn!(path = %path.display(), "not a directory, and can't be a repo");
        }
    }
    checkouts.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(checkouts)
}

/// The student part of a repository name: `project` removed, then any
/// leading `-`. `assignment-1-alice` under `assignment-1` gives `alice`.
pub fn student_suffix<'n>(name: &'n str, project: &str) -> &'n str {
    let rest = name.strip_prefix(project).unwrap_or(name);
    rest.trim_start_matches('-')
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::testing::FakePlatform;
    use tempfile::TempDir;

    fn repo(name: &str, owner: &str) -> Repository {
        Repository {
            name: name.to_string(),
            owner: owner.to_string(),
            clone_url: format!("https://github.com/{owner}/{name}.git"),
            html_url: format!("https://github.com/{owner}/{name}"),
        }
    }

    #[test]
    fn substring_match_is_unanchored() {
        let policy = MatchStrategy::Substring;
        assert!(is_matching(&repo("assignment-1-alice", "cmpt"), "assignment-1", None, &policy));
        assert!(is_matching(&repo("assignment-10-bob", "cmpt"), "assignment-1", None, &policy));
        assert!(is_matching(&repo("fork-assignment-1-x", "cmpt"), "assignment-1", None, &policy));
        assert!(!is_matching(&repo("lab-1-alice", "cmpt"), "assignment-1", None, &policy));
    }

    #[test]
    fn specific_prefix_avoids_cross_match() {
        let policy = MatchStrategy::Substring;
        assert!(!is_matching(&repo("assignment-10-bob", "cmpt"), "assignment-1-", None, &policy));
    }

    #[test]
    fn prefix_strategy_is_anchored() {
        let policy = MatchStrategy::Prefix;
        assert!(is_matching(&repo("assignment-1-alice", "o"), "assignment-1", None, &policy));
        assert!(!is_matching(&repo("fork-assignment-1-x", "o"), "assignment-1", None, &policy));
    }

    #[test]
    fn organization_filter_requires_owner_equality() {
        let policy = MatchStrategy::Substring;
        let r = repo("assignment-1-alice", "CMPT-295");
        assert!(is_matching(&r, "assignment-1", Some("CMPT-295"), &policy));
        assert!(!is_matching(&r, "assignment-1", Some("CMPT-300"), &policy));
    }

    #[test]
    fn match_strategy_from_str() {
        assert_eq!("prefix".parse::<MatchStrategy>().unwrap(), MatchStrategy::Prefix);
        assert!("fuzzy".parse::<MatchStrategy>().is_err());
    }

    #[test]
    fn resolver_filters_listing() {
        let platform = FakePlatform::with_repos(vec![
            repo("assignment-1-alice", "cmpt"),
            repo("assignment-1-bob", "other"),
            repo("assignment-2-carol", "cmpt"),
        ]);
        let policy = MatchStrategy::Substring;
        let resolver = RepositorySetResolver::new(&platform, &policy);
        let names: Vec<String> = resolver
            .resolve("assignment-1", Some("cmpt"))
            .unwrap()
            .into_iter()
            .map(|r| r.name)
            .collect();
        assert_eq!(names, vec!["assignment-1-alice"]);
    }

    #[test]
    fn resolver_returns_empty_when_nothing_matches() {
        let platform = FakePlatform::with_repos(vec![repo("lab-1", "cmpt")]);
        let policy = MatchStrategy::Substring;
        let resolver = RepositorySetResolver::new(&platform, &policy);
        assert!(resolver.resolve("assignment-9", None).unwrap().is_empty());
    }

    #[test]
    fn discover_skips_plain_files() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("assignment-1-bob")).unwrap();
        std::fs::create_dir(dir.path().join("assignment-1-alice")).unwrap();
        std::fs::write(dir.path().join("notes.txt"), "x").unwrap();

        let checkouts = discover_checkouts(dir.path()).unwrap();
        let names: Vec<&str> = checkouts.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["assignment-1-alice", "assignment-1-bob"]);
    }

    #[test]
    fn discover_rejects_missing_project_dir() {
        let dir = TempDir::new().unwrap();
        let err = discover_checkouts(&dir.path().join("missing")).unwrap_err();
        assert!(matches!(err, GradeError::NotADirectory(_)));
    }

    #[test]
    fn student_suffix_strips_project_and_dash() {
        assert_eq!(student_suffix("assignment-1-alice", "assignment-1"), "alice");
        assert_eq!(student_suffix("assignment-1-alice", "assignment-1-"), "alice");
        assert_eq!(student_suffix("unrelated", "assignment-1"), "unrelated");
    }
}
