use crate::calendar::DayCounting;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub i32);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<i32> for TaskId {
    fn from(value: i32) -> Self {
        Self(value)
    }
}

/// Who owns a task's dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulingMode {
    /// Dates are set by the caller and never recomputed.
    #[default]
    Manual,
    /// Dates are derived from predecessors and children.
    Automatic,
}

/// A "follows" edge: the owning task starts after `predecessor` finishes,
/// plus `lag` days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Relation {
    pub predecessor: TaskId,
    #[serde(default)]
    pub lag: u32,
}

impl Relation {
    pub fn new(predecessor: TaskId, lag: u32) -> Self {
        Self { predecessor, lag }
    }
}

/// Persisted task attributes, used to report what a scheduling run changed
/// and to attribute validation errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskAttribute {
    Subject,
    StartDate,
    DueDate,
    Duration,
    SchedulingMode,
    DayCounting,
    #[serde(rename = "type")]
    Milestone,
    Parent,
    Relations,
}

impl TaskAttribute {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskAttribute::Subject => "subject",
            TaskAttribute::StartDate => "start_date",
            TaskAttribute::DueDate => "due_date",
            TaskAttribute::Duration => "duration",
            TaskAttribute::SchedulingMode => "scheduling_mode",
            TaskAttribute::DayCounting => "day_counting",
            TaskAttribute::Milestone => "type",
            TaskAttribute::Parent => "parent",
            TaskAttribute::Relations => "relations",
        }
    }
}

impl fmt::Display for TaskAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub duration: Option<u32>,
    #[serde(default)]
    pub scheduling_mode: SchedulingMode,
    #[serde(default)]
    pub day_counting: DayCounting,
    #[serde(default)]
    pub milestone: bool,
    #[serde(default)]
    pub parent: Option<TaskId>,
    #[serde(default)]
    pub predecessors: Vec<Relation>,
}

impl Task {
    pub fn new(id: impl Into<TaskId>, subject: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            subject: subject.into(),
            start_date: None,
            due_date: None,
            duration: None,
            scheduling_mode: SchedulingMode::Manual,
            day_counting: DayCounting::WorkingDaysOnly,
            milestone: false,
            parent: None,
            predecessors: Vec::new(),
        }
    }

    pub fn with_dates(mut self, start: Option<NaiveDate>, due: Option<NaiveDate>) -> Self {
        self.start_date = start;
        self.due_date = due;
        self
    }

    pub fn with_duration(mut self, duration: Option<u32>) -> Self {
        self.duration = duration;
        self
    }

    pub fn automatic(mut self) -> Self {
        self.scheduling_mode = SchedulingMode::Automatic;
        self
    }

    pub fn manual(mut self) -> Self {
        self.scheduling_mode = SchedulingMode::Manual;
        self
    }

    pub fn all_days(mut self) -> Self {
        self.day_counting = DayCounting::AllDays;
        self
    }

    pub fn as_milestone(mut self) -> Self {
        self.milestone = true;
        self
    }

    pub fn child_of(mut self, parent: impl Into<TaskId>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn follows(mut self, predecessor: impl Into<TaskId>, lag: u32) -> Self {
        self.add_predecessor(Relation::new(predecessor.into(), lag));
        self
    }

    /// Adds a follows relation, replacing the lag of an existing one.
    pub fn add_predecessor(&mut self, relation: Relation) {
        match self
            .predecessors
            .iter_mut()
            .find(|existing| existing.predecessor == relation.predecessor)
        {
            Some(existing) => existing.lag = relation.lag,
            None => self.predecessors.push(relation),
        }
    }

    pub fn remove_predecessor(&mut self, predecessor: TaskId) -> bool {
        let before = self.predecessors.len();
        self.predecessors.retain(|rel| rel.predecessor != predecessor);
        before != self.predecessors.len()
    }

    pub fn follows_task(&self, predecessor: TaskId) -> bool {
        self.predecessors
            .iter()
            .any(|rel| rel.predecessor == predecessor)
    }

    pub fn is_automatic(&self) -> bool {
        self.scheduling_mode == SchedulingMode::Automatic
    }

    pub fn has_predecessors(&self) -> bool {
        !self.predecessors.is_empty()
    }

    /// Whether the task carries at least one date.
    pub fn is_dated(&self) -> bool {
        self.start_date.is_some() || self.due_date.is_some()
    }

    /// Start date, falling back to the due date for single-date tasks.
    pub fn effective_start(&self) -> Option<NaiveDate> {
        self.start_date.or(self.due_date)
    }

    /// Due date, falling back to the start date for single-date tasks.
    pub fn effective_due(&self) -> Option<NaiveDate> {
        self.due_date.or(self.start_date)
    }

    /// Attributes whose values differ between `self` and `other`.
    pub fn changed_attributes(&self, other: &Task) -> Vec<TaskAttribute> {
        let mut changed = Vec::new();
        if self.subject != other.subject {
            changed.push(TaskAttribute::Subject);
        }
        if self.start_date != other.start_date {
            changed.push(TaskAttribute::StartDate);
        }
        if self.due_date != other.due_date {
            changed.push(TaskAttribute::DueDate);
        }
        if self.duration != other.duration {
            changed.push(TaskAttribute::Duration);
        }
        if self.scheduling_mode != other.scheduling_mode {
            changed.push(TaskAttribute::SchedulingMode);
        }
        if self.day_counting != other.day_counting {
            changed.push(TaskAttribute::DayCounting);
        }
        if self.milestone != other.milestone {
            changed.push(TaskAttribute::Milestone);
        }
        if self.parent != other.parent {
            changed.push(TaskAttribute::Parent);
        }
        if self.predecessors != other.predecessors {
            changed.push(TaskAttribute::Relations);
        }
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_predecessor_replaces_lag() {
        let mut task = Task::new(2, "B").follows(1, 0);
        task.add_predecessor(Relation::new(TaskId(1), 3));
        assert_eq!(task.predecessors, vec![Relation::new(TaskId(1), 3)]);
    }

    #[test]
    fn serde_defaults_fill_missing_fields() {
        let task: Task = serde_json::from_str(r#"{"id": 7}"#).unwrap();
        assert_eq!(task.id, TaskId(7));
        assert_eq!(task.scheduling_mode, SchedulingMode::Manual);
        assert_eq!(task.day_counting, DayCounting::WorkingDaysOnly);
        assert!(task.predecessors.is_empty());
    }

    #[test]
    fn changed_attributes_lists_differences() {
        let before = Task::new(1, "A");
        let after = before.clone().automatic().child_of(9);
        assert_eq!(
            after.changed_attributes(&before),
            vec![TaskAttribute::SchedulingMode, TaskAttribute::Parent]
        );
    }
}
