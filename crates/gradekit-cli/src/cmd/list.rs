use crate::context::Context;
use crate::output::print_json;
use crate::Target;

pub fn run(ctx: &Context, target: &Target) -> anyhow::Result<()> {
    let repos = ctx.with_platform(|platform| ctx.resolve_repositories(platform, target))?;
    if ctx.json {
        return print_json(&repos);
    }
    for repo in &repos {
        println!("{}", repo.name);
    }
    Ok(())
}
