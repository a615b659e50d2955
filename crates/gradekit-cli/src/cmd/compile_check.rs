use crate::context::Context;
use crate::output::print_json;
use crate::Target;
use anyhow::Context as _;
use gradekit_core::compiler::ProcessCompiler;
use gradekit_core::scanner::{self, GradeDirScores, ScanOptions, StaticCheckScanner};

pub fn run(ctx: &Context, target: &Target, min_score: Option<f64>) -> anyhow::Result<()> {
    let org = ctx
        .organization(target)
        .context("permalinks need an organization: pass -o or set `organization`")?;
    let mut options = ScanOptions::from_settings(&ctx.settings, org);
    if let Some(min) = min_score {
        options.min_score = min;
    }
    if options.min_score <= 0.0 {
        tracing::warn!("score threshold is 0, every repository is scanned including ungraded ones");
    }
    if options.file_names.is_empty() {
        anyhow::bail!("no files to check: set `similarity_files`");
    }

    let checkouts = ctx.checkouts(&target.project)?;
    let compiler = ProcessCompiler::detect(&ctx.settings.scan.compiler)?;
    let scores = GradeDirScores::new(ctx.grading_root(), ctx.settings.identity.field.clone());
    let report = StaticCheckScanner::new(&compiler, options).scan(&checkouts, &scores);

    let path = ctx.workdir.join(&ctx.settings.scan.report);
    scanner::write_report(&report, &path)
        .with_context(|| format!("failed to write {}", path.display()))?;

    if ctx.json {
        return print_json(&report);
    }
    let findings: usize = report.repos.iter().map(|r| r.findings.len()).sum();
    println!(
        "{findings} findings in {} repositories ({} below threshold); report in {}",
        report.repos.len(),
        report.gated.len(),
        path.display()
    );
    for (repo, reason) in &report.errors {
        println!("  FAILED {repo}: {reason}");
    }
    Ok(())
}
