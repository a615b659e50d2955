use crate::context::Context;
use crate::output::print_json;
use crate::Target;
use gradekit_core::feedback;
use std::path::Path;

pub fn run(ctx: &Context, target: &Target, students: Option<&Path>) -> anyhow::Result<()> {
    let crosswalk = ctx.crosswalk(students)?;
    let report =
        feedback::write_templates(&ctx.grading_root(), &target.project, &crosswalk, &ctx.workdir)?;
    if ctx.json {
        return print_json(&report);
    }
    for path in &report.written {
        println!("wrote {}", path.display());
    }
    if !report.unresolved.is_empty() {
        println!("not in student table: {}", report.unresolved.join(", "));
    }
    Ok(())
}
