//! Commit-activity tracking.

use crate::crosswalk::Crosswalk;
use crate::platform::HostingPlatform;
use crate::repository::{student_suffix, Repository};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActiveStudent {
    pub platform_id: String,
    pub institution_id: String,
    pub commits: usize,
}

impl ActiveStudent {
    /// `<institution-id>@<domain>,<platform-id>`
    pub fn line(&self, email_domain: &str) -> String {
        format!("{}@{},{}", self.institution_id, email_domain, self.platform_id)
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ProgressReport {
    pub active: Vec<ActiveStudent>,
    /// Active repositories with no crosswalk row.
    pub unresolved: Vec<String>,
    pub errors: Vec<(String, String)>,
}

/// Students whose repository has at least `min_commits` commits.
pub fn track_commits(
    platform: &dyn HostingPlatform,
    repos: &[Repository],
    project: &str,
    crosswalk: &Crosswalk,
    min_commits: usize,
) -> ProgressReport {
    let mut report = ProgressReport::default();
    for repo in repos {
        let commits = match platform.commit_count(repo) {
            Ok(n) => n,
            Err(e) => {
                tracing::warn!(repo = %repo.name, error = %e, "could not count commits");
                report.errors.push((repo.name.clone(), e.to_string()));
                continue;
            }
        };
        if commits < min_commits {
            continue;
        }
        let platform_id = student_suffix(&repo.name, project).to_string();
        match crosswalk.by_platform_id(&platform_id) {
            Some(record) => report.active.push(ActiveStudent {
                platform_id,
                institution_id: record.institution_id.clone(),
                commits,
            }),
            None => {
                tracing::warn!(repo = %repo.name, %platform_id, "no crosswalk entry");
                report.unresolved.push(repo.name.clone());
            }
        }
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CrosswalkConfig;
    use crate::platform::testing::FakePlatform;

    fn repo(name: &str) -> Repository {
        Repository {
            name: name.to_string(),
            owner: "cmpt".to_string(),
            clone_url: String::new(),
            html_url: String::new(),
        }
    }

    #[test]
    fn reports_students_over_threshold() {
        let mut platform =
            FakePlatform::with_repos(vec![repo("a1-alice"), repo("a1-bob"), repo("a1-zed")]);
        platform.commits.insert("a1-alice".to_string(), 7);
        platform.commits.insert("a1-bob".to_string(), 2);
        platform.commits.insert("a1-zed".to_string(), 9);
        let crosswalk = Crosswalk::from_reader(
            "GithubID,SFUID\nalice,301\nbob,302\n".as_bytes(),
            &CrosswalkConfig::default(),
        )
        .unwrap();

        let report = track_commits(&platform, &platform.repos, "a1", &crosswalk, 5);
        assert_eq!(report.active.len(), 1);
        assert_eq!(report.active[0].line("sfu.ca"), "301@sfu.ca,alice");
        assert_eq!(report.unresolved, vec!["a1-zed"]);
    }
}
