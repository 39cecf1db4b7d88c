//! Derivation rules between a task's start date, due date and duration.
//!
//! Any two of the three determine the third. Which one gets derived after an
//! edit depends on which fields the edit touched: touched values are kept,
//! untouched ones give way.

use crate::calendar::{CalendarError, DayCounting, WorkingCalendar};
use crate::task::Task;
use chrono::NaiveDate;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateSpan {
    pub start_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    pub duration: Option<u32>,
    pub day_counting: DayCounting,
}

/// A proposed edit. The outer `Option` says whether a field is touched, the
/// inner one whether it is set or cleared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SpanChange {
    pub start_date: Option<Option<NaiveDate>>,
    pub due_date: Option<Option<NaiveDate>>,
    pub duration: Option<Option<u32>>,
    pub day_counting: Option<DayCounting>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Start,
    Due,
    Duration,
}

impl SpanChange {
    pub fn is_empty(&self) -> bool {
        self.start_date.is_none()
            && self.due_date.is_none()
            && self.duration.is_none()
            && self.day_counting.is_none()
    }

    fn sets(&self, field: Field) -> bool {
        match field {
            Field::Start => matches!(self.start_date, Some(Some(_))),
            Field::Due => matches!(self.due_date, Some(Some(_))),
            Field::Duration => matches!(self.duration, Some(Some(_))),
        }
    }
}

impl DateSpan {
    pub fn of(task: &Task) -> Self {
        Self {
            start_date: task.start_date,
            due_date: task.due_date,
            duration: task.duration,
            day_counting: task.day_counting,
        }
    }

    pub fn write_to(&self, task: &mut Task) {
        task.start_date = self.start_date;
        task.due_date = self.due_date;
        task.duration = self.duration;
        task.day_counting = self.day_counting;
    }

    /// Exactly one date and no duration.
    pub fn is_single_date(&self) -> bool {
        self.start_date.is_some() != self.due_date.is_some() && self.duration.is_none()
    }

    /// Both dates set.
    pub fn is_range(&self) -> bool {
        self.start_date.is_some() && self.due_date.is_some()
    }

    /// Applies `change` and re-derives whatever the touched fields leave open.
    pub fn apply<C>(mut self, change: &SpanChange, calendar: &C) -> Result<Self, CalendarError>
    where
        C: WorkingCalendar + ?Sized,
    {
        if let Some(mode) = change.day_counting {
            if mode != self.day_counting {
                self.day_counting = mode;
                self = self.snap_to_working_days(calendar)?;
            }
        }

        if let Some(start) = change.start_date {
            self.start_date = start;
        }
        if let Some(due) = change.due_date {
            self.due_date = due;
        }
        if let Some(duration) = change.duration {
            self.duration = duration;
        }

        // Clearing one field drops the field that was derived from it.
        if change.duration == Some(None) && change.due_date.is_none() && self.start_date.is_some() {
            self.due_date = None;
        }
        if change.start_date == Some(None) && change.duration.is_none() && self.due_date.is_some() {
            self.duration = None;
        }
        if change.due_date == Some(None) && change.duration.is_none() {
            self.duration = None;
        }

        let derived = self.field_to_derive(change);
        self.derive(derived, calendar)
    }

    /// Snaps both dates forward to working days (working-days mode only).
    /// Callers recount afterwards.
    pub fn snap_to_working_days<C>(mut self, calendar: &C) -> Result<Self, CalendarError>
    where
        C: WorkingCalendar + ?Sized,
    {
        if self.day_counting == DayCounting::WorkingDaysOnly {
            self.start_date = self
                .start_date
                .map(|date| calendar.soonest_working_day(date, self.day_counting))
                .transpose()?;
            self.due_date = self
                .due_date
                .map(|date| calendar.soonest_working_day(date, self.day_counting))
                .transpose()?;
        }
        Ok(self)
    }

    /// Recomputes the duration when both dates are set.
    pub fn recount<C>(mut self, calendar: &C) -> Result<Self, CalendarError>
    where
        C: WorkingCalendar + ?Sized,
    {
        if let (Some(start), Some(due)) = (self.start_date, self.due_date) {
            self.duration = Some(calendar.day_count(start, due, self.day_counting)?);
        }
        Ok(self)
    }

    fn field_to_derive(&self, change: &SpanChange) -> Field {
        let start = change.sets(Field::Start);
        let due = change.sets(Field::Due);
        let duration = change.sets(Field::Duration);

        match (start, due, duration) {
            (true, true, _) => Field::Duration,
            (true, false, true) => Field::Due,
            (false, true, true) => Field::Start,
            (true, false, false) => {
                if self.duration.is_some() {
                    Field::Due
                } else {
                    Field::Duration
                }
            }
            (false, true, false) => {
                if self.start_date.is_some() {
                    Field::Duration
                } else {
                    Field::Start
                }
            }
            (false, false, true) => {
                if self.start_date.is_some() {
                    Field::Due
                } else {
                    Field::Start
                }
            }
            (false, false, false) => {
                if self.is_range() {
                    Field::Duration
                } else if self.start_date.is_some() {
                    Field::Due
                } else {
                    Field::Start
                }
            }
        }
    }

    fn derive<C>(mut self, field: Field, calendar: &C) -> Result<Self, CalendarError>
    where
        C: WorkingCalendar + ?Sized,
    {
        let mode = self.day_counting;
        let duration = self.duration.filter(|days| *days > 0);
        match field {
            Field::Duration => {}
            Field::Due => {
                if let (Some(start), Some(days)) = (self.start_date, duration) {
                    self.due_date = Some(calendar.shift_by_duration(start, days, mode)?);
                }
            }
            Field::Start => {
                if let (Some(due), Some(days)) = (self.due_date, duration) {
                    self.start_date = Some(calendar.shift_back_by_duration(due, days, mode)?);
                }
            }
        }
        self.recount(calendar)
    }
}
