use crate::context::Context;
use crate::output::print_json;
use crate::Target;
use gradekit_core::similarity;

pub fn run(ctx: &Context, target: &Target) -> anyhow::Result<()> {
    if ctx.settings.similarity_files.is_empty() {
        anyhow::bail!("no files to stage: set `similarity_files`");
    }
    let checkouts = ctx.checkouts(&target.project)?;
    let report = similarity::stage(
        &ctx.workdir,
        &target.project,
        &checkouts,
        &ctx.settings.similarity_files,
    )?;
    if ctx.json {
        return print_json(&report);
    }
    println!(
        "{} files from {} checkouts staged in {}",
        report.copied,
        checkouts.len(),
        report.root.display()
    );
    if !report.missing.is_empty() {
        println!("{} expected files were missing", report.missing.len());
    }
    for (repo, error) in &report.errors {
        println!("  FAILED {repo}: {error}");
    }
    Ok(())
}
