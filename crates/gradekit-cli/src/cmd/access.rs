use crate::context::Context;
use crate::output::{print_json, print_summary};
use crate::Target;
use gradekit_core::platform::Permission;
use gradekit_core::remote::{self, Access};

pub fn run(ctx: &Context, target: &Target, access: Access) -> anyhow::Result<()> {
    ctx.settings.require_token()?;
    let action = match access {
        Access::Set(Permission::Pull) => "make every student collaborator read-only",
        Access::Set(Permission::Push) => "give every student collaborator push access",
        Access::Remove => "remove every student collaborator",
    };
    ctx.confirm(&format!("{action} on repositories matching '{}'", target.project))?;

    let report = ctx.with_platform(|platform| {
        let repos = ctx.resolve_repositories(platform, target)?;
        Ok(remote::change_access(platform, &repos, &ctx.settings, access))
    })?;
    if ctx.json {
        return print_json(&report);
    }
    for unit in &report.succeeded {
        println!("{unit}");
    }
    print_summary(report.succeeded.len(), &report.failed, "changed");
    Ok(())
}
