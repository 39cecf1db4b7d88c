//! Dependency-driven scheduling of work packages.
//!
//! A [`Scheduler`] takes a [`ChangeRequest`] against a stored task graph
//! (read through [`TaskGraphReader`]) and a [`WorkingCalendar`], and returns
//! the [`ChangeSet`] of tasks whose dates, durations or modes moved.

pub mod calculations;
pub mod calendar;
pub mod change;
pub mod change_set;
pub mod date_span;
pub mod error;
pub mod graph;
#[cfg(feature = "cli")]
pub mod logging;
pub mod persistence;
pub mod schedule;
pub mod task;
pub mod task_validation;

pub use calendar::{CalendarError, DayCounting, WorkCalendar, WorkCalendarConfig, WorkingCalendar};
pub use change::{ChangeRequest, TaskChange};
pub use change_set::{ChangeSet, TaskUpdate};
pub use date_span::{DateSpan, SpanChange};
pub use error::{SchedulingError, SchedulingResult, ValidationError};
pub use graph::{AffectedGraph, GraphReadError, TaskGraphReader};
pub use persistence::{
    PersistenceError, PersistenceResult, ProjectGraph, ProjectSnapshot,
    load_change_request_from_json, load_project_from_json, load_tasks_from_csv,
    save_project_to_json, save_tasks_to_csv, write_change_set_csv,
};
#[cfg(feature = "sqlite")]
pub use persistence::SqliteTaskStore;
pub use schedule::Scheduler;
pub use task::{Relation, SchedulingMode, Task, TaskAttribute, TaskId};
