//! Change requests: what a caller wants to do to the task graph.

use crate::calendar::DayCounting;
use crate::date_span::SpanChange;
use crate::task::{Relation, SchedulingMode, Task, TaskId};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Proposed edits to one task. Absent fields are left alone; for the
/// nullable ones, `Some(None)` (JSON `null`) clears the value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskChange {
    pub id: TaskId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    pub start_date: Option<Option<NaiveDate>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    pub due_date: Option<Option<NaiveDate>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    pub duration: Option<Option<u32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day_counting: Option<DayCounting>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduling_mode: Option<SchedulingMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub milestone: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    pub parent: Option<Option<TaskId>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub add_predecessors: Vec<Relation>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub remove_predecessors: Vec<TaskId>,
}

impl TaskChange {
    pub fn new(id: impl Into<TaskId>) -> Self {
        Self {
            id: id.into(),
            subject: None,
            start_date: None,
            due_date: None,
            duration: None,
            day_counting: None,
            scheduling_mode: None,
            milestone: None,
            parent: None,
            add_predecessors: Vec::new(),
            remove_predecessors: Vec::new(),
        }
    }

    /// The edits that create `task` from a blank record.
    pub(crate) fn from_created(task: &Task) -> Self {
        Self {
            id: task.id,
            subject: Some(task.subject.clone()),
            start_date: task.start_date.map(Some),
            due_date: task.due_date.map(Some),
            duration: task.duration.map(Some),
            day_counting: Some(task.day_counting),
            scheduling_mode: Some(task.scheduling_mode),
            milestone: Some(task.milestone),
            parent: task.parent.map(Some),
            add_predecessors: task.predecessors.clone(),
            remove_predecessors: Vec::new(),
        }
    }

    pub fn start_date(mut self, date: Option<NaiveDate>) -> Self {
        self.start_date = Some(date);
        self
    }

    pub fn due_date(mut self, date: Option<NaiveDate>) -> Self {
        self.due_date = Some(date);
        self
    }

    pub fn duration(mut self, duration: Option<u32>) -> Self {
        self.duration = Some(duration);
        self
    }

    pub fn day_counting(mut self, mode: DayCounting) -> Self {
        self.day_counting = Some(mode);
        self
    }

    pub fn scheduling_mode(mut self, mode: SchedulingMode) -> Self {
        self.scheduling_mode = Some(mode);
        self
    }

    pub fn milestone(mut self, milestone: bool) -> Self {
        self.milestone = Some(milestone);
        self
    }

    pub fn parent(mut self, parent: Option<TaskId>) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn add_predecessor(mut self, predecessor: impl Into<TaskId>, lag: u32) -> Self {
        self.add_predecessors
            .push(Relation::new(predecessor.into(), lag));
        self
    }

    pub fn remove_predecessor(mut self, predecessor: impl Into<TaskId>) -> Self {
        self.remove_predecessors.push(predecessor.into());
        self
    }

    pub fn span_change(&self) -> SpanChange {
        SpanChange {
            start_date: self.start_date,
            due_date: self.due_date,
            duration: self.duration,
            day_counting: self.day_counting,
        }
    }

    /// Whether the edit touches nothing at all.
    pub fn is_noop(&self) -> bool {
        self.subject.is_none()
            && self.span_change().is_empty()
            && self.scheduling_mode.is_none()
            && self.milestone.is_none()
            && self.parent.is_none()
            && self.add_predecessors.is_empty()
            && self.remove_predecessors.is_empty()
    }
}

/// One logical change request: new tasks plus edits to existing ones.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRequest {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub create: Vec<Task>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub changes: Vec<TaskChange>,
}

impl ChangeRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(mut self, task: Task) -> Self {
        self.create.push(task);
        self
    }

    pub fn change(mut self, change: TaskChange) -> Self {
        self.changes.push(change);
        self
    }

    /// Recompute `ids` without editing them.
    pub fn touch<I>(ids: I) -> Self
    where
        I: IntoIterator<Item = TaskId>,
    {
        Self {
            create: Vec::new(),
            changes: ids.into_iter().map(TaskChange::new).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.create.is_empty() && self.changes.is_empty()
    }
}

/// Serde glue for `Option<Option<T>>`: a missing field stays `None`, an
/// explicit `null` becomes `Some(None)`.
mod double_option {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S, T>(value: &Option<Option<T>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
        T: Serialize,
    {
        match value {
            Some(inner) => inner.serialize(serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
    where
        D: Deserializer<'de>,
        T: Deserialize<'de>,
    {
        Option::<T>::deserialize(deserializer).map(Some)
    }
}
