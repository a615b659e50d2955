use crate::prompt;
use crate::Target;
use anyhow::Context as _;
use gradekit_core::config::Settings;
use gradekit_core::crosswalk::Crosswalk;
use gradekit_core::paths;
use gradekit_core::platform::{DryRun, GitHubClient, HostingPlatform};
use gradekit_core::repository::{
    discover_checkouts, Checkout, MatchStrategy, Repository, RepositorySetResolver,
};
use std::path::{Path, PathBuf};

/// Everything a command needs, resolved once before it runs.
pub struct Context {
    pub workdir: PathBuf,
    pub settings: Settings,
    pub json: bool,
    pub dry_run: bool,
    pub matching: MatchStrategy,
    dir: Option<PathBuf>,
}

impl Context {
    pub fn resolve(
        config: Option<&Path>,
        json: bool,
        dry_run: bool,
        matching: MatchStrategy,
        dir: Option<PathBuf>,
    ) -> anyhow::Result<Self> {
        let workdir = std::env::current_dir().context("cannot determine working directory")?;
        let settings =
            Settings::resolve(config, &workdir).context("failed to load configuration")?;
        Ok(Self {
            workdir,
            settings,
            json,
            dry_run,
            matching,
            dir,
        })
    }

    pub fn organization<'a>(&'a self, target: &'a Target) -> Option<&'a str> {
        target
            .organization
            .as_deref()
            .or(self.settings.organization.as_deref())
    }

    /// Build the platform client (wrapped for `--dry-run`) and hand it to `f`.
    pub fn with_platform<T>(
        &self,
        f: impl FnOnce(&dyn HostingPlatform) -> anyhow::Result<T>,
    ) -> anyhow::Result<T> {
        let token = self.settings.require_token()?;
        let client = GitHubClient::new(self.settings.api_url.clone(), token)?;
        if self.dry_run {
            f(&DryRun::new(&client))
        } else {
            f(&client)
        }
    }

    pub fn resolve_repositories(
        &self,
        platform: &dyn HostingPlatform,
        target: &Target,
    ) -> anyhow::Result<Vec<Repository>> {
        RepositorySetResolver::new(platform, &self.matching)
            .resolve(&target.project, self.organization(target))
            .context("failed to list repositories")
    }

    pub fn project_dir(&self, project: &str) -> PathBuf {
        self.dir
            .clone()
            .unwrap_or_else(|| paths::project_dir(&self.workdir, project))
    }

    pub fn checkouts(&self, project: &str) -> anyhow::Result<Vec<Checkout>> {
        let dir = self.project_dir(project);
        discover_checkouts(&dir).with_context(|| format!("no checkouts for '{project}'"))
    }

    pub fn grading_root(&self) -> PathBuf {
        self.workdir.join(&self.settings.grading.output_root)
    }

    pub fn crosswalk(&self, students: Option<&Path>) -> anyhow::Result<Crosswalk> {
        let path = students
            .map(Path::to_path_buf)
            .or_else(|| self.settings.crosswalk.path.clone())
            .context("no student table: pass --students or set crosswalk.path")?;
        Crosswalk::load(&path, &self.settings.crosswalk)
            .with_context(|| format!("failed to load student table {}", path.display()))
    }

    /// Typed confirmation before an irreversible batch. Skipped under
    /// `--dry-run` since nothing is sent.
    pub fn confirm(&self, action: &str) -> anyhow::Result<()> {
        if self.dry_run {
            tracing::info!(action, "dry run: confirmation skipped");
            return Ok(());
        }
        let stdin = std::io::stdin();
        let confirmed = prompt::confirm(action, &mut stdin.lock(), &mut std::io::stderr())?;
        if !confirmed {
            anyhow::bail!("aborted: confirmation not given");
        }
        Ok(())
    }
}
