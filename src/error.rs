use crate::calendar::CalendarError;
use crate::graph::GraphReadError;
use crate::task::{TaskAttribute, TaskId};
use chrono::NaiveDate;
use thiserror::Error;

/// A rejected change request. Raised before anything is recomputed, and
/// attributed to the field the caller should highlight.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("task {successor} cannot follow {predecessor}: it would be linked with its own descendant")]
    CyclicRelation {
        predecessor: TaskId,
        successor: TaskId,
    },

    #[error("task {child} cannot be placed under {parent}: it would become its own descendant")]
    CyclicHierarchy { child: TaskId, parent: TaskId },

    #[error("task {task} is part of a dependency cycle")]
    Cycle { task: TaskId },

    #[error("duration of task {task} must be greater than 0")]
    ZeroDuration { task: TaskId },

    #[error("task {task} has children and cannot be a milestone")]
    MilestoneWithChildren { task: TaskId },

    #[error("due date {due} of task {task} is before its start date {start}")]
    DueBeforeStart {
        task: TaskId,
        start: NaiveDate,
        due: NaiveDate,
    },
}

impl ValidationError {
    /// The task the error is reported on.
    pub fn task(&self) -> TaskId {
        match self {
            ValidationError::CyclicRelation { successor, .. } => *successor,
            ValidationError::CyclicHierarchy { child, .. } => *child,
            ValidationError::Cycle { task }
            | ValidationError::ZeroDuration { task }
            | ValidationError::MilestoneWithChildren { task }
            | ValidationError::DueBeforeStart { task, .. } => *task,
        }
    }

    pub fn attribute(&self) -> TaskAttribute {
        match self {
            ValidationError::CyclicRelation { .. } | ValidationError::Cycle { .. } => {
                TaskAttribute::Relations
            }
            ValidationError::CyclicHierarchy { .. } => TaskAttribute::Parent,
            ValidationError::ZeroDuration { .. } => TaskAttribute::Duration,
            ValidationError::MilestoneWithChildren { .. } => TaskAttribute::Milestone,
            ValidationError::DueBeforeStart { .. } => TaskAttribute::DueDate,
        }
    }

    /// Machine-readable code for the UI layer.
    pub fn code(&self) -> &'static str {
        match self {
            ValidationError::CyclicRelation { .. }
            | ValidationError::CyclicHierarchy { .. }
            | ValidationError::Cycle { .. } => "cant_link_a_work_package_with_a_descendant",
            ValidationError::ZeroDuration { .. } => "greater_than",
            ValidationError::MilestoneWithChildren { .. } => "cannot_be_milestone_with_children",
            ValidationError::DueBeforeStart { .. } => "greater_than_or_equal_to_start_date",
        }
    }
}

#[derive(Debug, Error)]
pub enum SchedulingError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("task {0} not found")]
    TaskNotFound(TaskId),

    #[error("task {0} already exists")]
    DuplicateTask(TaskId),

    #[error(transparent)]
    Read(#[from] GraphReadError),

    #[error("calendar arithmetic failed: {0}")]
    Calendar(#[from] CalendarError),
}

impl SchedulingError {
    pub fn validation(&self) -> Option<&ValidationError> {
        match self {
            SchedulingError::Validation(err) => Some(err),
            _ => None,
        }
    }
}

pub type SchedulingResult<T> = Result<T, SchedulingError>;
