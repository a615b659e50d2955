use crate::context::Context;
use crate::output::{print_json, print_summary};
use crate::Target;
use gradekit_core::git::ProcessGit;
use gradekit_core::remote;

pub fn run(ctx: &Context, target: &Target) -> anyhow::Result<()> {
    let repos = ctx.with_platform(|platform| ctx.resolve_repositories(platform, target))?;
    let token = ctx.settings.require_token()?;
    let dest = ctx.project_dir(&target.project);
    let report = remote::clone_all(&ProcessGit, &repos, token, &dest)?;
    if ctx.json {
        return print_json(&report);
    }
    print_summary(report.succeeded.len(), &report.failed, "cloned");
    Ok(())
}
