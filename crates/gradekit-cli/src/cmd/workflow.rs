use crate::context::Context;
use crate::output::{print_json, print_summary, print_table};
use crate::Target;
use anyhow::Context as _;
use gradekit_core::platform::WorkflowRun;
use gradekit_core::remote;

// ---------------------------------------------------------------------------
// run-remote
// ---------------------------------------------------------------------------

pub fn dispatch(ctx: &Context, target: &Target) -> anyhow::Result<()> {
    ctx.settings.require_token()?;
    ctx.confirm(&format!(
        "start remote grading on every repository matching '{}'",
        target.project
    ))?;
    let report = ctx.with_platform(|platform| {
        let repos = ctx.resolve_repositories(platform, target)?;
        Ok(remote::dispatch_grading(
            platform,
            &repos,
            &ctx.settings.run_remote_password,
        ))
    })?;
    if ctx.json {
        return print_json(&report);
    }
    print_summary(report.succeeded.len(), &report.failed, "triggered");
    Ok(())
}

// ---------------------------------------------------------------------------
// cancel-remote
// ---------------------------------------------------------------------------

pub fn cancel(ctx: &Context, target: &Target) -> anyhow::Result<()> {
    ctx.settings.require_token()?;
    ctx.confirm(&format!(
        "cancel every unfinished run on repositories matching '{}'",
        target.project
    ))?;
    let report = ctx.with_platform(|platform| {
        let repos = ctx.resolve_repositories(platform, target)?;
        Ok(remote::cancel_pending(platform, &repos))
    })?;
    if ctx.json {
        return print_json(&report);
    }
    print_summary(report.succeeded.len(), &report.failed, "cancelled");
    Ok(())
}

// ---------------------------------------------------------------------------
// run-remote-status
// ---------------------------------------------------------------------------

fn describe(run: Option<&WorkflowRun>) -> [String; 3] {
    match run {
        Some(r) => [
            r.created_at.format("%Y-%m-%d %H:%M").to_string(),
            r.conclusion.clone().unwrap_or_else(|| "-".to_string()),
            r.status.clone(),
        ],
        None => ["-".to_string(), "-".to_string(), "-".to_string()],
    }
}

pub fn status(ctx: &Context, target: &Target) -> anyhow::Result<()> {
    let report = ctx.with_platform(|platform| {
        let repos = ctx.resolve_repositories(platform, target)?;
        Ok(remote::run_status(platform, &repos))
    })?;
    if ctx.json {
        return print_json(&report);
    }
    let rows: Vec<Vec<String>> = report
        .repos
        .iter()
        .map(|s| {
            let mut row = vec![s.repo.clone()];
            row.extend(describe(s.latest_push.as_ref()));
            row.extend(describe(s.latest_dispatch.as_ref()));
            row.push(s.pending.to_string());
            row
        })
        .collect();
    print_table(
        &[
            "REPO",
            "PUSH AT",
            "PUSH RESULT",
            "PUSH STATUS",
            "GRADING AT",
            "GRADING RESULT",
            "GRADING STATUS",
            "PENDING",
        ],
        &rows,
    );
    println!("\nTotal pending runs: {}", report.total_pending);
    for (repo, reason) in &report.errors {
        println!("  FAILED {repo}: {reason}");
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// force-remove-runners
// ---------------------------------------------------------------------------

pub fn remove_runners(ctx: &Context, organization: Option<&str>) -> anyhow::Result<()> {
    ctx.settings.require_token()?;
    let org = organization
        .or(ctx.settings.organization.as_deref())
        .context("no organization: pass -o or set `organization`")?;
    ctx.confirm(&format!("delete every self-hosted runner of {org}"))?;
    let report = ctx.with_platform(|platform| {
        remote::remove_runners(platform, org).context("failed to list runners")
    })?;
    if ctx.json {
        return print_json(&report);
    }
    print_summary(report.succeeded.len(), &report.failed, "removed");
    Ok(())
}
