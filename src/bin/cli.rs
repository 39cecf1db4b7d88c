use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand, ValueEnum};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use wp_scheduler::logging::{LogLevel, init_logging};
use wp_scheduler::{
    ChangeSet, ProjectGraph, ProjectSnapshot, Scheduler, SchedulingError, TaskId, WorkCalendar,
    load_change_request_from_json, load_project_from_json, save_project_to_json,
    write_change_set_csv,
};

#[derive(Debug, Parser)]
#[command(name = "wp-schedule", version, about = "Propagate date changes through a work-package graph")]
struct Cli {
    /// Log level; overrides WP_SCHEDULER_LOG
    #[arg(long, value_enum, global = true)]
    log_level: Option<LogLevel>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Apply a change request to a project and print the tasks that moved
    Apply {
        #[arg(long)]
        project: PathBuf,
        #[arg(long)]
        changes: PathBuf,
        #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,
        /// Write the result back into the project file
        #[arg(long)]
        write: bool,
    },
    /// Recompute tasks without editing them, e.g. after a calendar change
    Reschedule {
        #[arg(long)]
        project: PathBuf,
        /// Tasks to recompute; all tasks when omitted
        #[arg(long = "task")]
        tasks: Vec<i32>,
        #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,
        #[arg(long)]
        write: bool,
    },
    /// Exit non-zero if rescheduling would change any task
    Check {
        #[arg(long)]
        project: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Json,
    Csv,
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(cli.log_level)?;

    match cli.command {
        Command::Apply {
            project,
            changes,
            format,
            write,
        } => {
            let request = load_change_request_from_json(&changes)
                .with_context(|| format!("failed to read change request {}", changes.display()))?;
            run(&project, format, write, |scheduler| scheduler.schedule(&request))?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Reschedule {
            project,
            tasks,
            format,
            write,
        } => {
            run(&project, format, write, |scheduler| {
                if tasks.is_empty() {
                    scheduler.reschedule(scheduler.reader().ids())
                } else {
                    scheduler.reschedule(tasks.iter().copied().map(TaskId))
                }
            })?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Check { project } => check(&project),
    }
}

fn run<F>(project: &Path, format: OutputFormat, write: bool, schedule: F) -> Result<()>
where
    F: FnOnce(&Scheduler<WorkCalendar, &ProjectGraph>) -> Result<ChangeSet, SchedulingError>,
{
    let snapshot = load_project_from_json(project)
        .with_context(|| format!("failed to read project {}", project.display()))?;
    let calendar = snapshot.calendar()?;
    let mut graph = snapshot.graph()?;

    let changes = {
        let scheduler = Scheduler::new(calendar.clone(), &graph);
        schedule(&scheduler).map_err(describe)?
    };

    print_changes(&changes, format)?;

    if write {
        graph.apply(&changes);
        let updated = ProjectSnapshot::new(snapshot.name.clone(), &calendar, &graph);
        save_project_to_json(&updated, project)
            .with_context(|| format!("failed to write project {}", project.display()))?;
    }
    Ok(())
}

fn check(project: &Path) -> Result<ExitCode> {
    let snapshot = load_project_from_json(project)
        .with_context(|| format!("failed to read project {}", project.display()))?;
    let calendar = snapshot.calendar()?;
    let graph = snapshot.graph()?;

    let scheduler = Scheduler::new(calendar, &graph);
    let changes = scheduler.reschedule(graph.ids()).map_err(describe)?;

    let mut stdout = io::stdout().lock();
    if changes.is_empty() {
        writeln!(stdout, "consistent: {} tasks", graph.len())?;
        return Ok(ExitCode::SUCCESS);
    }
    for update in &changes {
        let changed: Vec<&str> = update.changed.iter().map(|attr| attr.as_str()).collect();
        writeln!(stdout, "{}: {}", update.task.id, changed.join(", "))?;
    }
    Ok(ExitCode::FAILURE)
}

fn print_changes(changes: &ChangeSet, format: OutputFormat) -> Result<()> {
    let stdout = io::stdout().lock();
    match format {
        OutputFormat::Json => {
            let mut stdout = stdout;
            serde_json::to_writer_pretty(&mut stdout, changes)?;
            writeln!(stdout)?;
        }
        OutputFormat::Csv => write_change_set_csv(stdout, changes)?,
    }
    Ok(())
}

fn describe(err: SchedulingError) -> anyhow::Error {
    if let Some(validation) = err.validation() {
        return anyhow!(
            "{validation} (attribute: {}, code: {})",
            validation.attribute(),
            validation.code()
        );
    }
    err.into()
}
