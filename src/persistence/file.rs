use super::memory::ProjectGraph;
use super::{PersistenceError, PersistenceResult};
use crate::calendar::{DayCounting, WorkCalendar, WorkCalendarConfig};
use crate::change::ChangeRequest;
use crate::change_set::{ChangeSet, TaskUpdate};
use crate::task::{Relation, SchedulingMode, Task, TaskId};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// A project as stored on disk: its calendar and every task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectSnapshot {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub calendar: WorkCalendarConfig,
    #[serde(default)]
    pub tasks: Vec<Task>,
}

impl ProjectSnapshot {
    pub fn new(name: impl Into<String>, calendar: &WorkCalendar, graph: &ProjectGraph) -> Self {
        Self {
            name: name.into(),
            calendar: calendar.to_config(),
            tasks: graph.tasks().cloned().collect(),
        }
    }

    pub fn calendar(&self) -> PersistenceResult<WorkCalendar> {
        Ok(WorkCalendar::from_config(&self.calendar)?)
    }

    pub fn graph(&self) -> PersistenceResult<ProjectGraph> {
        ProjectGraph::from_tasks(self.tasks.iter().cloned())
    }
}

pub fn save_project_to_json<P: AsRef<Path>>(
    snapshot: &ProjectSnapshot,
    path: P,
) -> PersistenceResult<()> {
    super::validate_tasks(&snapshot.tasks)?;
    let file = File::create(path)?;
    serde_json::to_writer_pretty(file, snapshot)?;
    Ok(())
}

/// Reads a project file; the calendar and the task collection are both
/// validated before the snapshot is returned.
pub fn load_project_from_json<P: AsRef<Path>>(path: P) -> PersistenceResult<ProjectSnapshot> {
    let file = File::open(path)?;
    let snapshot: ProjectSnapshot = serde_json::from_reader(file)?;
    WorkCalendar::from_config(&snapshot.calendar)?;
    super::validate_tasks(&snapshot.tasks)?;
    Ok(snapshot)
}

pub fn load_change_request_from_json<P: AsRef<Path>>(path: P) -> PersistenceResult<ChangeRequest> {
    let file = File::open(path)?;
    Ok(serde_json::from_reader(file)?)
}

#[derive(Default, Serialize, Deserialize)]
struct TaskCsvRecord {
    id: i32,
    subject: String,
    start_date: String,
    due_date: String,
    duration: String,
    scheduling_mode: String,
    day_counting: String,
    milestone: String,
    parent: String,
    predecessors: String,
    #[serde(default)]
    created: String,
    #[serde(default)]
    changed: String,
}

impl From<&Task> for TaskCsvRecord {
    fn from(task: &Task) -> Self {
        TaskCsvRecord {
            id: task.id.0,
            subject: task.subject.clone(),
            start_date: format_date(task.start_date),
            due_date: format_date(task.due_date),
            duration: task.duration.map(|days| days.to_string()).unwrap_or_default(),
            scheduling_mode: match task.scheduling_mode {
                SchedulingMode::Manual => "manual".to_string(),
                SchedulingMode::Automatic => "automatic".to_string(),
            },
            day_counting: task.day_counting.as_str().to_string(),
            milestone: task.milestone.to_string(),
            parent: task.parent.map(|id| id.0.to_string()).unwrap_or_default(),
            predecessors: join_relations(&task.predecessors),
            created: String::new(),
            changed: String::new(),
        }
    }
}

impl From<&TaskUpdate> for TaskCsvRecord {
    fn from(update: &TaskUpdate) -> Self {
        let mut record = TaskCsvRecord::from(&update.task);
        record.created = update.created.to_string();
        record.changed = update
            .changed
            .iter()
            .map(|attribute| attribute.as_str())
            .collect::<Vec<_>>()
            .join(";");
        record
    }
}

impl TaskCsvRecord {
    fn into_task(self) -> PersistenceResult<Task> {
        let mut task = Task::new(self.id, self.subject);
        task.start_date = parse_date(&self.start_date)?;
        task.due_date = parse_date(&self.due_date)?;
        task.duration = parse_optional(&self.duration, "duration")?;
        task.scheduling_mode = match self.scheduling_mode.trim() {
            "" | "manual" => SchedulingMode::Manual,
            "automatic" => SchedulingMode::Automatic,
            other => {
                return Err(PersistenceError::InvalidData(format!(
                    "invalid scheduling_mode '{other}'"
                )));
            }
        };
        task.day_counting = match self.day_counting.trim() {
            "" | "working_days_only" => DayCounting::WorkingDaysOnly,
            "all_days" => DayCounting::AllDays,
            other => {
                return Err(PersistenceError::InvalidData(format!(
                    "invalid day_counting '{other}'"
                )));
            }
        };
        task.milestone = parse_optional::<bool>(&self.milestone, "milestone")?.unwrap_or(false);
        task.parent = parse_optional::<i32>(&self.parent, "parent")?.map(TaskId);
        task.predecessors = split_relations(&self.predecessors)?;
        Ok(task)
    }
}

pub fn save_tasks_to_csv<'t, I, P>(tasks: I, path: P) -> PersistenceResult<()>
where
    I: IntoIterator<Item = &'t Task>,
    P: AsRef<Path>,
{
    let mut writer = csv::Writer::from_path(path)?;
    for task in tasks {
        writer.serialize(TaskCsvRecord::from(task))?;
    }
    writer.flush()?;
    Ok(())
}

pub fn load_tasks_from_csv<P: AsRef<Path>>(path: P) -> PersistenceResult<Vec<Task>> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut tasks = Vec::new();
    for record in reader.deserialize::<TaskCsvRecord>() {
        tasks.push(record?.into_task()?);
    }
    super::validate_tasks(&tasks)?;
    Ok(tasks)
}

/// One row per changed task, with its final state and the attributes that
/// changed.
pub fn write_change_set_csv<W: Write>(writer: W, changes: &ChangeSet) -> PersistenceResult<()> {
    let mut writer = csv::Writer::from_writer(writer);
    for update in changes {
        writer.serialize(TaskCsvRecord::from(update))?;
    }
    writer.flush()?;
    Ok(())
}

fn format_date(date: Option<NaiveDate>) -> String {
    date.map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

fn parse_date(value: &str) -> PersistenceResult<Option<NaiveDate>> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map(Some)
        .map_err(|err| PersistenceError::InvalidData(format!("invalid date '{value}': {err}")))
}

fn parse_optional<T: std::str::FromStr>(value: &str, field: &str) -> PersistenceResult<Option<T>> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    value
        .parse()
        .map(Some)
        .map_err(|_| PersistenceError::InvalidData(format!("invalid {field} '{value}'")))
}

/// `pred:lag` pairs separated by `;`, lag optional.
fn join_relations(relations: &[Relation]) -> String {
    relations
        .iter()
        .map(|rel| format!("{}:{}", rel.predecessor.0, rel.lag))
        .collect::<Vec<_>>()
        .join(";")
}

fn split_relations(value: &str) -> PersistenceResult<Vec<Relation>> {
    value
        .split(';')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(|item| {
            let (predecessor, lag) = item.split_once(':').unwrap_or((item, "0"));
            let predecessor = parse_optional::<i32>(predecessor, "predecessor")?;
            let lag = parse_optional::<u32>(lag, "lag")?.unwrap_or(0);
            predecessor
                .map(|id| Relation::new(TaskId(id), lag))
                .ok_or_else(|| PersistenceError::InvalidData(format!("invalid relation '{item}'")))
        })
        .collect()
}
