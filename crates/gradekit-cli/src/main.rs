mod cmd;
mod context;
mod output;
mod prompt;

use clap::{Args, Parser, Subcommand};
use context::Context;
use gradekit_core::platform::Permission;
use gradekit_core::remote::Access;
use gradekit_core::repository::MatchStrategy;
use gradekit_core::sync::ParentKind;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "gradekit",
    about = "Bulk grading for one-repository-per-student assignments",
    version,
    propagate_version = true
)]
struct Cli {
    /// Config file (default: ./gradekit.yaml, then ~/.gradekit/config.yaml)
    #[arg(long, global = true, env = "GRADEKIT_CONFIG")]
    config: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    /// Log mutating platform calls instead of sending them
    #[arg(long, global = true)]
    dry_run: bool,

    /// How the project name is matched against repository names (substring|prefix)
    #[arg(long = "match", global = true, default_value = "substring")]
    matching: MatchStrategy,

    /// Directory holding the checkouts (default: ./<project>)
    #[arg(long, global = true)]
    dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Assignment selector shared by every batch action.
#[derive(Args, Debug, Clone)]
pub struct Target {
    /// Assignment prefix matched against repository names (e.g. assignment-3-)
    pub project: String,

    /// Only repositories owned by this organization (default: config `organization`)
    #[arg(short = 'o', long = "organization")]
    pub organization: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// List matching repositories
    Ls(Target),

    /// Shallow-clone every matching repository into ./<project>/
    Clone(Target),

    /// Make every non-owner collaborator read-only
    SetReadonly(Target),

    /// Give every non-owner collaborator push access
    SetWrite(Target),

    /// Remove every non-owner collaborator
    SetRemove(Target),

    /// Trigger the remote grading workflow
    RunRemote(Target),

    /// Cancel every unfinished workflow run
    CancelRemote(Target),

    /// Show the latest push and grading runs per repository
    RunRemoteStatus(Target),

    /// Delete every self-hosted runner of the organization
    ForceRemoveRunners {
        /// Organization (default: config `organization`)
        #[arg(short = 'o', long = "organization")]
        organization: Option<String>,
    },

    /// List students with enough commits as <id>@<domain>,<account>
    TrackCommits {
        #[command(flatten)]
        target: Target,
        /// Student identity CSV (default: config `crosswalk.path`)
        #[arg(long)]
        students: Option<PathBuf>,
    },

    /// Run the grading script in every checkout and sort results into PASS/FAIL
    RunLocal(Target),

    /// Merge grade fragments into one roster on stdout
    Aggregate {
        /// Folder of *_Grade.json files, or a grading output root with PASS/ and FAIL/
        folder: PathBuf,
        /// Student identity CSV (default: config `crosswalk.path`)
        #[arg(long)]
        students: Option<PathBuf>,
    },

    /// Compile checked files and report permalinks to matching diagnostics
    CompileCheck {
        #[command(flatten)]
        target: Target,
        /// Only report repositories scoring at least this (default: config `scan.min_score`)
        #[arg(long)]
        min_score: Option<f64>,
    },

    /// Stage files for the similarity detector under ./Mossbox/
    Moss(Target),

    /// Push a PASS/FAIL marker, asking for the verdict per repository
    PushPassFail(Target),

    /// Push a grading comment typed in per repository
    PushComment(Target),

    /// Push each student's block of a markdown grading sheet
    PushGradeSheet {
        #[command(flatten)]
        target: Target,
        /// Markdown sheet with one `### <student>` block per student
        sheet: PathBuf,
    },

    /// Stage, commit and push everything in every checkout
    AddCommit(Target),

    /// Merge the starter template into every checkout
    UpdateFromTemplate(Target),

    /// Pull the starter fork into every checkout
    UpdateFromFork(Target),

    /// Write PASS.md and FAIL.md feedback skeletons from the grading logs
    FeedbackTemplate {
        #[command(flatten)]
        target: Target,
        /// Student identity CSV (default: config `crosswalk.path`)
        #[arg(long)]
        students: Option<PathBuf>,
    },

    /// Print the workflow page for institution ids (arguments or stdin lines)
    Lookup {
        #[command(flatten)]
        target: Target,
        /// Student identity CSV (default: config `crosswalk.path`)
        #[arg(long)]
        students: Option<PathBuf>,
        /// Institution ids; read from stdin when omitted
        ids: Vec<String>,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = match &cli.command {
        Commands::Ls(_) | Commands::RunRemoteStatus(_) | Commands::Aggregate { .. } => {
            tracing::Level::WARN
        }
        _ => tracing::Level::INFO,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let result = Context::resolve(
        cli.config.as_deref(),
        cli.json,
        cli.dry_run,
        cli.matching,
        cli.dir,
    )
    .and_then(|ctx| dispatch(&ctx, cli.command));

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

fn dispatch(ctx: &Context, command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Ls(t) => cmd::list::run(ctx, &t),
        Commands::Clone(t) => cmd::clone::run(ctx, &t),
        Commands::SetReadonly(t) => cmd::access::run(ctx, &t, Access::Set(Permission::Pull)),
        Commands::SetWrite(t) => cmd::access::run(ctx, &t, Access::Set(Permission::Push)),
        Commands::SetRemove(t) => cmd::access::run(ctx, &t, Access::Remove),
        Commands::RunRemote(t) => cmd::workflow::dispatch(ctx, &t),
        Commands::CancelRemote(t) => cmd::workflow::cancel(ctx, &t),
        Commands::RunRemoteStatus(t) => cmd::workflow::status(ctx, &t),
        Commands::ForceRemoveRunners { organization } => {
            cmd::workflow::remove_runners(ctx, organization.as_deref())
        }
        Commands::TrackCommits { target, students } => {
            cmd::track::run(ctx, &target, students.as_deref())
        }
        Commands::RunLocal(t) => cmd::run_local::run(ctx, &t),
        Commands::Aggregate { folder, students } => {
            cmd::aggregate::run(ctx, &folder, students.as_deref())
        }
        Commands::CompileCheck { target, min_score } => {
            cmd::compile_check::run(ctx, &target, min_score)
        }
        Commands::Moss(t) => cmd::moss::run(ctx, &t),
        Commands::PushPassFail(t) => cmd::push::pass_fail(ctx, &t),
        Commands::PushComment(t) => cmd::push::comment(ctx, &t),
        Commands::PushGradeSheet { target, sheet } => cmd::push::grade_sheet(ctx, &target, &sheet),
        Commands::AddCommit(t) => cmd::push::add_commit(ctx, &t),
        Commands::UpdateFromTemplate(t) => cmd::update::run(ctx, &t, ParentKind::Template),
        Commands::UpdateFromFork(t) => cmd::update::run(ctx, &t, ParentKind::Fork),
        Commands::FeedbackTemplate { target, students } => {
            cmd::feedback::run(ctx, &target, students.as_deref())
        }
        Commands::Lookup {
            target,
            students,
            ids,
        } => cmd::lookup::run(ctx, &target, students.as_deref(), ids),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn organization_flag_parses() {
        let cli = Cli::try_parse_from(["gradekit", "ls", "assignment-1-", "-o", "CMPT-295"]).unwrap();
        match cli.command {
            Commands::Ls(t) => {
                assert_eq!(t.project, "assignment-1-");
                assert_eq!(t.organization.as_deref(), Some("CMPT-295"));
            }
            _ => panic!("expected ls"),
        }
    }

    #[test]
    fn unknown_action_is_rejected() {
        assert!(Cli::try_parse_from(["gradekit", "set_everything", "a1"]).is_err());
    }
}
