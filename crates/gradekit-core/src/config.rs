use crate::error::{GradeError, Result};
use crate::paths;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

pub const TOKEN_ENV: &str = "GIT_TOKEN";
pub const PARENT_REPO_ENV: &str = "PARENT_REPO";
pub const ORGANIZATION_ENV: &str = "GRADEKIT_ORG";

// ---------------------------------------------------------------------------
// GradingConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradingConfig {
    /// Grading script, relative to each checkout.
    #[serde(default = "default_script")]
    pub script: PathBuf,
    #[serde(default = "default_interpreter")]
    pub interpreter: String,
    /// Root of the PASS/ and FAIL/ tree, relative to the working directory.
    #[serde(default = "default_output_root")]
    pub output_root: PathBuf,
}

fn default_script() -> PathBuf {
    PathBuf::from("scripts/localci.sh")
}

fn default_interpreter() -> String {
    "bash".to_string()
}

fn default_output_root() -> PathBuf {
    PathBuf::from("ASS_ROOT")
}

impl Default for GradingConfig {
    fn default() -> Self {
        Self {
            script: default_script(),
            interpreter: default_interpreter(),
            output_root: default_output_root(),
        }
    }
}

// ---------------------------------------------------------------------------
// ScanConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    #[serde(default = "default_compiler")]
    pub compiler: String,
    #[serde(default = "default_include_paths")]
    pub include_paths: Vec<String>,
    #[serde(default = "default_pattern")]
    pub pattern: String,
    /// Findings are only reported for repositories scoring at least this much.
    #[serde(default)]
    pub min_score: f64,
    #[serde(default = "default_branch")]
    pub branch: String,
    #[serde(default = "default_report")]
    pub report: PathBuf,
}

fn default_compiler() -> String {
    "clang".to_string()
}

fn default_include_paths() -> Vec<String> {
    vec!["include/".to_string(), "../include".to_string()]
}

fn default_pattern() -> String {
    "non-void function does not return a value".to_string()
}

fn default_branch() -> String {
    "master".to_string()
}

fn default_report() -> PathBuf {
    PathBuf::from("compile_check.txt")
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            compiler: default_compiler(),
            include_paths: default_include_paths(),
            pattern: default_pattern(),
            min_score: 0.0,
            branch: default_branch(),
            report: default_report(),
        }
    }
}

// ---------------------------------------------------------------------------
// CrosswalkConfig / IdentityConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrosswalkConfig {
    /// Student identity table (CSV with a header row).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    #[serde(default = "default_platform_column")]
    pub platform_column: String,
    #[serde(default = "default_institution_column")]
    pub institution_column: String,
}

fn default_platform_column() -> String {
    "GithubID".to_string()
}

fn default_institution_column() -> String {
    "SFUID".to_string()
}

impl Default for CrosswalkConfig {
    fn default() -> Self {
        Self {
            path: None,
            platform_column: default_platform_column(),
            institution_column: default_institution_column(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityConfig {
    /// Key of the identity field inside each grade fragment.
    #[serde(default = "default_identity_field")]
    pub field: String,
    /// Platform tag prepended to the account name by the grading script.
    #[serde(default = "default_identity_tag")]
    pub tag: String,
    /// Assignment prefix embedded in identities taken from repository names.
    #[serde(default = "default_assignment_pattern")]
    pub assignment_pattern: String,
}

fn default_identity_field() -> String {
    "userid".to_string()
}

fn default_identity_tag() -> String {
    "GithubID:".to_string()
}

fn default_assignment_pattern() -> String {
    r"assignment-\d*-*".to_string()
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            field: default_identity_field(),
            tag: default_identity_tag(),
            assignment_pattern: default_assignment_pattern(),
        }
    }
}

// ---------------------------------------------------------------------------
// Settings (top-level)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization: Option<String>,
    /// Instructor and TA accounts; permission changes never touch these.
    #[serde(default)]
    pub owners: BTreeSet<String>,
    #[serde(default = "default_grading_file")]
    pub grading_file: String,
    #[serde(default = "default_result_file")]
    pub result_file: String,
    #[serde(default = "default_passed")]
    pub passed: String,
    #[serde(default = "default_failed")]
    pub failed: String,
    #[serde(default)]
    pub similarity_files: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_repo: Option<String>,
    #[serde(default)]
    pub run_remote_password: String,
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default = "default_web_url")]
    pub web_url: String,
    #[serde(default = "default_email_domain")]
    pub email_domain: String,
    #[serde(default = "default_min_commits")]
    pub min_commits: usize,
    #[serde(default)]
    pub grading: GradingConfig,
    #[serde(default)]
    pub scan: ScanConfig,
    #[serde(default)]
    pub crosswalk: CrosswalkConfig,
    #[serde(default)]
    pub identity: IdentityConfig,
}

fn default_grading_file() -> String {
    "GRADING.md".to_string()
}

fn default_result_file() -> String {
    "RESULT.md".to_string()
}

fn default_passed() -> String {
    "Result: PASS".to_string()
}

fn default_failed() -> String {
    "Result: FAIL".to_string()
}

fn default_api_url() -> String {
    "https://api.github.com".to_string()
}

fn default_web_url() -> String {
    "https://github.com".to_string()
}

fn default_email_domain() -> String {
    "sfu.ca".to_string()
}

fn default_min_commits() -> usize {
    5
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            token: None,
            organization: None,
            owners: BTreeSet::new(),
            grading_file: default_grading_file(),
            result_file: default_result_file(),
            passed: default_passed(),
            failed: default_failed(),
            similarity_files: Vec::new(),
            parent_repo: None,
            run_remote_password: String::new(),
            api_url: default_api_url(),
            web_url: default_web_url(),
            email_domain: default_email_domain(),
            min_commits: default_min_commits(),
            grading: GradingConfig::default(),
            scan: ScanConfig::default(),
            crosswalk: CrosswalkConfig::default(),
            identity: IdentityConfig::default(),
        }
    }
}

impl Settings {
    /// Resolve settings once at startup.
    ///
    /// File lookup order:
    /// 1. `explicit` (`--config` / `GRADEKIT_CONFIG`), which must exist
    /// 2. `<workdir>/gradekit.yaml`
    /// 3. `~/.gradekit/config.yaml`
    /// 4. built-in defaults
    ///
    /// Environment values then override whatever the file provided.
    pub fn resolve(explicit: Option<&Path>, workdir: &Path) -> Result<Self> {
        let mut settings = match locate_config(explicit, workdir)? {
            Some(path) => {
                tracing::debug!(path = %path.display(), "loading config");
                Self::load(&path)?
            }
            None => Self::default(),
        };
        settings.apply_env(|key| std::env::var(key).ok());
        Ok(settings)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&data)?)
    }

    /// Overlay environment values on top of file values.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(token) = non_empty(TOKEN_ENV) {
            self.token = Some(token);
        }
        if let Some(parent) = non_empty(PARENT_REPO_ENV) {
            self.parent_repo = Some(parent);
        }
        if let Some(org) = non_empty(ORGANIZATION_ENV) {
            self.organization = Some(org);
        }
    }

    /// The platform token, or `MissingToken` if no source provided one.
    pub fn require_token(&self) -> Result<&str> {
        self.token
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .ok_or(GradeError::MissingToken)
    }

    pub fn is_owner(&self, login: &str) -> bool {
        self.owners.contains(login)
    }
}

fn locate_config(explicit: Option<&Path>, workdir: &Path) -> Result<Option<PathBuf>> {
    if let Some(path) = explicit {
        if !path.is_file() {
            return Err(GradeError::ConfigNotFound(path.to_path_buf()));
        }
        return Ok(Some(path.to_path_buf()));
    }
    let local = workdir.join(paths::CONFIG_FILE);
    if local.is_file() {
        return Ok(Some(local));
    }
    let global = home::home_dir()
        .map(|h| h.join(paths::HOME_CONFIG_DIR).join(paths::HOME_CONFIG_FILE))
        .filter(|p| p.is_file());
    Ok(global)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
