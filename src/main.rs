use crate::audit::{AuditSink, TracingAudit};
use crate::config::{Config, DEFAULT_FILE};
use crate::display::*;
use crate::error::PlanError;
use crate::export::ResultRow;
use crate::ledger::Capacity;
use crate::model::{ProfessorId, ProjectId, StudentId, TermId, TimeWindow};
use crate::service::Planner;
use crate::store::{
    FacultyFilter, FacultyRepository, MemoryStore, ProjectFilter, ProjectRepository, SqlStore,
    TermRepository,
};
use clap::{ArgAction, Parser, Subcommand};
use eyre::{Result, WrapErr};
use std::path::PathBuf;
use tracing::{Level, info};

mod algos;
mod audit;
mod checks;
mod config;
mod display;
mod error;
mod export;
mod ledger;
mod model;
mod service;
mod stats;
mod store;

#[derive(Parser, Debug)]
#[command(name = "rplanner", version)]
#[command(about = "Allocate capstone projects, committees and defense times")]
struct Cli {
    /// Use FILE instead of rplanner.toml
    #[arg(short, long, value_name = "FILE", default_value = DEFAULT_FILE)]
    config: PathBuf,

    /// Work on a copy of the active term and write nothing back
    #[arg(short = 'n', long)]
    dry_run: bool,

    /// Set verbosity level
    #[arg(short, action = ArgAction::Count)]
    verbose: u8,

    /// Export the result rows of a batch operation to FILE
    #[arg(long, value_name = "FILE")]
    csv: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Open a new term and make it the active one
    CreateTerm {
        name: String,
        /// Capacities as MAJOR=MAX
        #[arg(value_parser = parse_capacity)]
        capacities: Vec<Capacity>,
    },
    /// Set the maximum number of approved projects of a major
    SetCapacity {
        major: String,
        max: u32,
        /// Term id, the active term if omitted
        #[arg(long)]
        term: Option<i64>,
    },
    /// Set or lift (when MAX is omitted) the examiner limit of a professor
    SetExaminerLimit { professor: i64, max: Option<u32> },
    /// Request a project for a student in the active term
    Request { student: i64, major: String },
    /// List the projects waiting for approval
    Pending {
        #[arg(long)]
        term: Option<i64>,
    },
    /// Approve a pending project within its major capacity
    Approve { project: i64 },
    /// Reject a pending project
    Reject { project: i64 },
    /// Give a supervisor to every approved project
    AssignSupervisors {
        #[arg(long)]
        term: Option<i64>,
    },
    /// Give an examiner to every project whose topic is approved
    AssignExaminers {
        #[arg(long)]
        term: Option<i64>,
    },
    /// Pick a conflict-free defense time for every project with candidates
    ScheduleDefenses {
        #[arg(long)]
        term: Option<i64>,
    },
    /// Add a topic proposal to a project
    ProposeTopic { project: i64, topic: String },
    /// Retain one of the proposed topics (supervisor only)
    ApproveTopic {
        project: i64,
        professor: i64,
        /// Position of the topic among the proposals, starting at 0
        index: usize,
    },
    /// Submit candidate defense times as DATE'T'START-END (committee only)
    SubmitDefenseTimes {
        project: i64,
        professor: i64,
        #[arg(required = true)]
        windows: Vec<TimeWindow>,
    },
    /// Grade a defended project (examiner only)
    SubmitGrade {
        project: i64,
        professor: i64,
        grade: f64,
    },
    /// Show one project
    Show { project: i64 },
    /// List the faculty and their loads
    Faculty,
    /// Show the statistics of a term
    Stats {
        #[arg(long)]
        term: Option<i64>,
    },
}

fn parse_capacity(s: &str) -> Result<Capacity, String> {
    let (major, max) = s
        .split_once('=')
        .ok_or_else(|| format!("expected MAJOR=MAX, got {s}"))?;
    let max = max
        .parse()
        .map_err(|e| format!("invalid maximum in {s}: {e}"))?;
    Ok(Capacity::new(major, max))
}

async fn resolve_term<S: TermRepository>(store: &S, term: Option<i64>) -> Result<TermId> {
    match term {
        Some(id) => Ok(TermId(id)),
        None => Ok(store.active_term().await?.ok_or(PlanError::NoActiveTerm)?.id),
    }
}

async fn check_term<S>(store: &S, term: TermId) -> Result<()>
where
    S: ProjectRepository + FacultyRepository + TermRepository,
{
    let term = store.term(term).await?.ok_or(PlanError::TermNotFound(term))?;
    let projects = store.find_projects(&ProjectFilter::term(term.id)).await?;
    let faculty = store.find_faculty(&FacultyFilter::default()).await?;
    checks::ensure_consistent(&term, &projects, &faculty)
        .wrap_err_with(|| format!("term {} is inconsistent", term.name))
}

async fn run<S, A>(planner: &Planner<S, A>, command: Command) -> Result<Vec<ResultRow>>
where
    S: ProjectRepository + FacultyRepository + TermRepository,
    A: AuditSink,
{
    let store = planner.store();
    let mut rows = Vec::new();
    match command {
        Command::CreateTerm { name, capacities } => {
            let term = planner
                .create_term(&name, capacities.into_iter().collect())
                .await?;
            display_term(&term);
        }
        Command::SetCapacity { major, max, term } => {
            let term = resolve_term(store, term).await?;
            display_term(&planner.set_capacity(term, &major, max).await?);
        }
        Command::SetExaminerLimit { professor, max } => {
            display_professor(&planner.set_examiner_limit(ProfessorId(professor), max).await?);
        }
        Command::Request { student, major } => {
            display_project(&planner.request_project(StudentId(student), &major).await?);
        }
        Command::Pending { term } => {
            let term = resolve_term(store, term).await?;
            display_pending(&planner.pending_projects(term).await?);
        }
        Command::Approve { project } => {
            display_project(&planner.approve_project(ProjectId(project)).await?);
        }
        Command::Reject { project } => {
            display_project(&planner.reject_project(ProjectId(project)).await?);
        }
        Command::AssignSupervisors { term } => {
            let term = resolve_term(store, term).await?;
            let assignments = planner.assign_supervisors(term).await?;
            display_supervisors(&assignments);
            rows = export::supervisor_rows(&assignments);
            check_term(store, term).await?;
        }
        Command::AssignExaminers { term } => {
            let term = resolve_term(store, term).await?;
            let run = planner.assign_examiners(term).await?;
            display_examiners(&run);
            rows = export::examiner_rows(&run);
            check_term(store, term).await?;
        }
        Command::ScheduleDefenses { term } => {
            let term = resolve_term(store, term).await?;
            let run = planner.schedule_defenses(term).await?;
            display_defenses(&run);
            rows = export::defense_rows(&run);
            check_term(store, term).await?;
        }
        Command::ProposeTopic { project, topic } => {
            display_project(&planner.propose_topic(ProjectId(project), &topic).await?);
        }
        Command::ApproveTopic {
            project,
            professor,
            index,
        } => {
            let project = planner
                .approve_topic(ProjectId(project), ProfessorId(professor), index)
                .await?;
            display_project(&project);
        }
        Command::SubmitDefenseTimes {
            project,
            professor,
            windows,
        } => {
            let project = planner
                .submit_defense_times(ProjectId(project), ProfessorId(professor), &windows)
                .await?;
            display_project(&project);
        }
        Command::SubmitGrade {
            project,
            professor,
            grade,
        } => {
            let project = planner
                .submit_grade(ProjectId(project), ProfessorId(professor), grade)
                .await?;
            display_project(&project);
        }
        Command::Show { project } => {
            let project = store
                .project(ProjectId(project))
                .await?
                .ok_or(PlanError::ProjectNotFound(ProjectId(project)))?;
            display_project(&project);
        }
        Command::Faculty => {
            for professor in store.find_faculty(&FacultyFilter::default()).await? {
                display_professor(&professor);
            }
        }
        Command::Stats { term } => {
            let term = resolve_term(store, term).await?;
            display_stats(&planner.statistics(term).await?);
        }
    }
    Ok(rows)
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    let level = match cli.verbose {
        0 => Level::ERROR,
        1 => Level::WARN,
        2 => Level::INFO,
        3 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
    let config = Config::load(&cli.config)?;
    let store = SqlStore::connect(&config.database.url)
        .await
        .wrap_err("cannot connect to database")?;
    let rows = if cli.dry_run {
        info!("Dry run, nothing will be written back");
        let snapshot = MemoryStore::snapshot(&store)
            .await
            .wrap_err("cannot copy the active term")?;
        let planner = Planner::new(snapshot, TracingAudit, config.planner_config());
        run(&planner, cli.command).await?
    } else {
        let planner = Planner::new(store.clone(), store, config.planner_config());
        run(&planner, cli.command).await?
    };
    if let Some(path) = &cli.csv {
        export::write_file(path, &rows)?;
        info!(rows = %rows.len(), path = %path.display(), "Results exported");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_defense_windows() {
        let cli = Cli::try_parse_from([
            "rplanner",
            "-n",
            "-vv",
            "submit-defense-times",
            "3",
            "1",
            "2025-06-14T09:00-09:30",
            "2025-06-14T09:30-10:00",
        ])
        .unwrap();
        assert!(cli.dry_run);
        assert_eq!(cli.verbose, 2);
        let Command::SubmitDefenseTimes { windows, .. } = cli.command else {
            panic!("wrong command");
        };
        assert_eq!(windows.len(), 2);
        assert!(
            Cli::try_parse_from(["rplanner", "submit-defense-times", "3", "1", "2025-06-14T10:00-09:30"])
                .is_err()
        );
    }

    #[test]
    fn pending_defaults_to_the_active_term() {
        let cli = Cli::try_parse_from(["rplanner", "pending"]).unwrap();
        assert!(matches!(cli.command, Command::Pending { term: None }));
        let cli = Cli::try_parse_from(["rplanner", "pending", "--term", "4"]).unwrap();
        assert!(matches!(cli.command, Command::Pending { term: Some(4) }));
    }

    #[test]
    fn parses_capacities() {
        let cli = Cli::try_parse_from(["rplanner", "create-term", "2025", "CS=2", "EE=3"]).unwrap();
        let Command::CreateTerm { capacities, .. } = cli.command else {
            panic!("wrong command");
        };
        assert_eq!(capacities, vec![Capacity::new("CS", 2), Capacity::new("EE", 3)]);
        assert!(parse_capacity("CS").is_err());
        assert!(parse_capacity("CS=many").is_err());
    }
}
