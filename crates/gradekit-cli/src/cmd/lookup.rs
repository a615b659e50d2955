use crate::context::Context;
use crate::Target;
use anyhow::Context as _;
use gradekit_core::crosswalk::Crosswalk;
use std::io::BufRead;
use std::path::Path;

pub const NOT_FOUND: &str = "Not found";

/// Workflow page of the student's repository, or `Not found`.
pub fn workflow_page(
    crosswalk: &Crosswalk,
    web_url: &str,
    organization: &str,
    project: &str,
    institution_id: &str,
) -> String {
    match crosswalk.by_institution_id(institution_id.trim()) {
        Some(record) => format!(
            "{}/{organization}/{}-{}/actions/",
            web_url.trim_end_matches('/'),
            project.trim_end_matches('-'),
            record.platform_id
        ),
        None => NOT_FOUND.to_string(),
    }
}

pub fn run(
    ctx: &Context,
    target: &Target,
    students: Option<&Path>,
    ids: Vec<String>,
) -> anyhow::Result<()> {
    let crosswalk = ctx.crosswalk(students)?;
    let org = ctx
        .organization(target)
        .context("no organization: pass -o or set `organization`")?;
    let ids = if ids.is_empty() {
        std::io::stdin()
            .lock()
            .lines()
            .collect::<std::io::Result<Vec<_>>>()?
    } else {
        ids
    };
    for id in ids.iter().filter(|id| !id.trim().is_empty()) {
        println!(
            "{}",
            workflow_page(&crosswalk, &ctx.settings.web_url, org, &target.project, id)
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use gradekit_core::config::CrosswalkConfig;

    #[test]
    fn builds_actions_url_or_not_found() {
        let crosswalk = Crosswalk::from_reader(
            "GithubID,SFUID\nalice,301\n".as_bytes(),
            &CrosswalkConfig::default(),
        )
        .unwrap();
        assert_eq!(
            workflow_page(&crosswalk, "https://github.com/", "CMPT-295", "assignment-1-", "301"),
            "https://github.com/CMPT-295/assignment-1-alice/actions/"
        );
        assert_eq!(
            workflow_page(&crosswalk, "https://github.com", "CMPT-295", "assignment-1", "999"),
            NOT_FOUND
        );
    }
}
