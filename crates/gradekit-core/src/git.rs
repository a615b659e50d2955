//! Git process invocation.

use crate::error::{GradeError, Result};
use std::borrow::Cow;
use std::path::Path;
use std::process::{Command, Stdio};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitOutput {
    /// `None` when the process was killed by a signal.
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl GitOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// First non-empty line of stderr, else stdout, for one-line reporting.
    pub fn summary(&self) -> String {
        self.stderr
            .lines()
            .chain(self.stdout.lines())
            .map(str::trim)
            .find(|l| !l.is_empty())
            .unwrap_or("")
            .to_string()
    }
}

/// Runs one git command in a working directory. A non-zero exit is a normal
/// `Ok` outcome; only failing to start git is an `Err`.
pub trait GitInvoker {
    fn run(&self, args: &[&str], cwd: &Path) -> Result<GitOutput>;
}

#[derive(Debug, Clone, Default)]
pub struct ProcessGit;

impl GitInvoker for ProcessGit {
    fn run(&self, args: &[&str], cwd: &Path) -> Result<GitOutput> {
        let shown: Vec<Cow<'_, str>> = args.iter().map(|a| redact_credentials(a)).collect();
        tracing::debug!(args = ?shown, cwd = %cwd.display(), "git");
        let output = Command::new("git")
            .args(args)
            .current_dir(cwd)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| GradeError::Spawn(format!("git: {e}")))?;
        Ok(GitOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Run and turn a non-zero exit into `GradeError::Git`.
pub fn run_checked(git: &dyn GitInvoker, args: &[&str], cwd: &Path) -> Result<GitOutput> {
    let out = git.run(args, cwd)?;
    if !out.success() {
        return Err(GradeError::Git(format!(
            "git {} exited {:?}: {}",
            args.first().copied().unwrap_or(""),
            out.code,
            out.summary()
        )));
    }
    Ok(out)
}

/// Mask the userinfo of a `scheme://user@host/...` argument so a token never
/// reaches the logs.
pub fn redact_credentials(arg: &str) -> Cow<'_, str> {
    let Some(scheme_end) = arg.find("://").map(|i| i + 3) else {
        return Cow::Borrowed(arg);
    };
    let authority_end = arg[scheme_end..]
        .find('/')
        .map_or(arg.len(), |i| scheme_end + i);
    match arg[scheme_end..authority_end].rfind('@') {
        Some(at) => Cow::Owned(format!(
            "{}***{}",
            &arg[..scheme_end],
            &arg[scheme_end + at..]
        )),
        None => Cow::Borrowed(arg),
    }
}
