use crate::context::Context;
use crate::output::print_json;
use anyhow::Context as _;
use gradekit_core::aggregate::{collect_fragment_files, Aggregator};
use std::path::Path;

/// Prints only the roster on stdout; misses and errors go to stderr so the
/// output can be redirected straight into the grade-book import.
pub fn run(ctx: &Context, folder: &Path, students: Option<&Path>) -> anyhow::Result<()> {
    let crosswalk = ctx.crosswalk(students)?;
    let files = collect_fragment_files(folder)
        .with_context(|| format!("cannot read {}", folder.display()))?;
    let report = Aggregator::new(&crosswalk, &ctx.settings.identity)?.aggregate(&files);

    for miss in &report.misses {
        eprintln!(
            "warning: {} not in student table, import will skip it ({})",
            miss.identity,
            miss.file.display()
        );
    }
    for err in &report.errors {
        eprintln!("error: {}: {}", err.file.display(), err.reason);
    }
    print_json(&report.roster)
}
