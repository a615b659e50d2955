use crate::context::Context;
use crate::output::{print_json, print_summary};
use crate::prompt;
use crate::Target;
use anyhow::Context as _;
use gradekit_core::git::ProcessGit;
use gradekit_core::grading_sheet::GradingSheet;
use gradekit_core::repository::Checkout;
use gradekit_core::sync::{
    RemoteSyncWriter, SyncReport, Verdict, COMMIT_ALL_MESSAGE, GRADED_COMMIT_TEMPLATE,
};
use std::io;
use std::path::Path;

fn local_checkouts(ctx: &Context, target: &Target) -> anyhow::Result<Vec<Checkout>> {
    if target.organization.is_some() {
        tracing::warn!("organization does not affect pushing");
    }
    ctx.checkouts(&target.project)
}

pub fn report(ctx: &Context, report: &SyncReport) -> anyhow::Result<()> {
    if ctx.json {
        return print_json(report);
    }
    if !report.skipped.is_empty() {
        println!("skipped: {}", report.skipped.join(", "));
    }
    let failed: Vec<(String, String)> = report
        .failed
        .iter()
        .map(|f| (f.name.clone(), format!("{} ({})", f.step, f.detail)))
        .collect();
    print_summary(report.succeeded.len(), &failed, "pushed");
    Ok(())
}

// ---------------------------------------------------------------------------
// push-pass-fail
// ---------------------------------------------------------------------------

pub fn pass_fail(ctx: &Context, target: &Target) -> anyhow::Result<()> {
    let checkouts = local_checkouts(ctx, target)?;
    let settings = &ctx.settings;
    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut out = io::stderr();

    let result = RemoteSyncWriter::new(&ProcessGit).publish_with(
        &checkouts,
        &settings.result_file,
        GRADED_COMMIT_TEMPLATE,
        |checkout| {
            let question = format!("Did {} 'pass' or 'fail'? [Default: pass]: ", checkout.name);
            let answer = match prompt::ask(&question, &mut input, &mut out) {
                Ok(Some(answer)) => answer,
                Ok(None) => return None,
                Err(e) => {
                    tracing::warn!(repo = %checkout.name, error = %e, "could not read verdict");
                    return None;
                }
            };
            match Verdict::parse(&answer) {
                Verdict::Pass => Some(settings.passed.clone()),
                Verdict::Fail => Some(settings.failed.clone()),
                Verdict::Skip => None,
            }
        },
    );
    report(ctx, &result)
}

// ---------------------------------------------------------------------------
// push-comment
// ---------------------------------------------------------------------------

pub fn comment(ctx: &Context, target: &Target) -> anyhow::Result<()> {
    let checkouts = local_checkouts(ctx, target)?;
    let stdin = io::stdin();
    let mut input = stdin.lock();

    let result = RemoteSyncWriter::new(&ProcessGit).publish_with(
        &checkouts,
        &ctx.settings.grading_file,
        GRADED_COMMIT_TEMPLATE,
        |checkout| {
            eprintln!(
                "\nGrading {} - enter grading comment, end with a line containing only '{}':",
                checkout.name,
                prompt::COMMENT_TERMINATOR
            );
            match prompt::read_comment(&mut input) {
                Ok(text) => text,
                Err(e) => {
                    tracing::warn!(repo = %checkout.name, error = %e, "could not read comment");
                    None
                }
            }
        },
    );
    report(ctx, &result)
}

// ---------------------------------------------------------------------------
// push-grade-sheet
// ---------------------------------------------------------------------------

pub fn grade_sheet(ctx: &Context, target: &Target, sheet: &Path) -> anyhow::Result<()> {
    let sheet = GradingSheet::load(sheet)
        .with_context(|| format!("failed to read grading sheet {}", sheet.display()))?;
    let checkouts = local_checkouts(ctx, target)?;

    let result = RemoteSyncWriter::new(&ProcessGit).publish_with(
        &checkouts,
        &ctx.settings.grading_file,
        GRADED_COMMIT_TEMPLATE,
        |checkout| {
            let block = sheet.match_repo(&checkout.name);
            if block.is_none() {
                tracing::info!(repo = %checkout.name, "no block in grading sheet");
            }
            block.map(|b| b.content.clone())
        },
    );
    report(ctx, &result)
}

// ---------------------------------------------------------------------------
// add-commit
// ---------------------------------------------------------------------------

pub fn add_commit(ctx: &Context, target: &Target) -> anyhow::Result<()> {
    let checkouts = local_checkouts(ctx, target)?;
    let result = RemoteSyncWriter::new(&ProcessGit).commit_all(&checkouts, COMMIT_ALL_MESSAGE);
    report(ctx, &result)
}
