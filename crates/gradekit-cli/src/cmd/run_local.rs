use crate::context::Context;
use crate::output::{print_json, print_table};
use crate::Target;
use anyhow::Context as _;
use gradekit_core::runner::LocalGradingRunner;

pub fn run(ctx: &Context, target: &Target) -> anyhow::Result<()> {
    let checkouts = ctx.checkouts(&target.project)?;
    let runner = LocalGradingRunner::new(&ctx.settings.grading, &ctx.workdir);
    let batch = runner
        .run_all(&checkouts)
        .context("failed to prepare grading output")?;

    if ctx.json {
        return print_json(&batch);
    }
    let rows: Vec<Vec<String>> = batch
        .pass
        .iter()
        .chain(&batch.fail)
        .map(|r| vec![r.name.clone(), r.outcome.to_string()])
        .chain(
            batch
                .incomplete
                .iter()
                .map(|i| vec![i.name.clone(), format!("INCOMPLETE ({})", i.reason)]),
        )
        .collect();
    print_table(&["REPO", "RESULT"], &rows);
    println!(
        "\n{} passed, {} failed, {} incomplete; results in {}",
        batch.pass.len(),
        batch.fail.len(),
        batch.incomplete.len(),
        runner.output_root().display()
    );
    Ok(())
}
