use crate::context::Context;
use crate::Target;
use anyhow::Context as _;
use gradekit_core::config::PARENT_REPO_ENV;
use gradekit_core::git::ProcessGit;
use gradekit_core::sync::{ParentKind, RemoteSyncWriter};

pub fn run(ctx: &Context, target: &Target, kind: ParentKind) -> anyhow::Result<()> {
    let parent = ctx
        .settings
        .parent_repo
        .as_deref()
        .with_context(|| format!("no starter repository: set {PARENT_REPO_ENV} or `parent_repo`"))?;
    let checkouts = ctx.checkouts(&target.project)?;
    let result = RemoteSyncWriter::new(&ProcessGit).update_from_parent(&checkouts, parent, kind);
    super::push::report(ctx, &result)
}
