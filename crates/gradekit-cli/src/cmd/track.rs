use crate::context::Context;
use crate::output::print_json;
use crate::Target;
use gradekit_core::progress;
use std::path::Path;

pub fn run(ctx: &Context, target: &Target, students: Option<&Path>) -> anyhow::Result<()> {
    let crosswalk = ctx.crosswalk(students)?;
    let report = ctx.with_platform(|platform| {
        let repos = ctx.resolve_repositories(platform, target)?;
        Ok(progress::track_commits(
            platform,
            &repos,
            &target.project,
            &crosswalk,
            ctx.settings.min_commits,
        ))
    })?;
    if ctx.json {
        return print_json(&report);
    }
    for student in &report.active {
        println!("{}", student.line(&ctx.settings.email_domain));
    }
    Ok(())
}
