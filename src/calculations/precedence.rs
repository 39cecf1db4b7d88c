use crate::calendar::{CalendarError, WorkingCalendar};
use crate::date_span::DateSpan;
use crate::graph::TaskArena;
use crate::task::Task;
use chrono::NaiveDate;

/// Earliest start allowed by the follows relations of `task` and of its
/// ancestors. `None` when no predecessor has a due date.
///
/// Lag is counted in the successor's own day-counting mode.
pub fn soonest_start<C>(
    calendar: &C,
    arena: &TaskArena,
    task: &Task,
) -> Result<Option<NaiveDate>, CalendarError>
where
    C: WorkingCalendar + ?Sized,
{
    let mode = task.day_counting;
    let ancestors = arena.ancestors(task.id);
    let mut soonest = None;
    for relation in std::iter::once(task)
        .chain(ancestors.iter().filter_map(|id| arena.get(*id)))
        .flat_map(|owner| owner.predecessors.iter())
    {
        let Some(due) = arena.get(relation.predecessor).and_then(|pred| pred.due_date) else {
            continue;
        };
        let start = calendar.soonest_start_after(due, relation.lag, mode)?;
        soonest = soonest.max(Some(start));
    }
    Ok(soonest)
}

/// Moves `span` as little as needed so it starts on or after `soonest`, then
/// snaps it onto working days.
pub fn follow<C>(
    calendar: &C,
    span: DateSpan,
    milestone: bool,
    soonest: Option<NaiveDate>,
) -> Result<DateSpan, CalendarError>
where
    C: WorkingCalendar + ?Sized,
{
    let mode = span.day_counting;

    if milestone {
        let date = match (span.start_date.or(span.due_date), soonest) {
            (Some(date), Some(earliest)) => Some(date.max(earliest)),
            (date, earliest) => date.or(earliest),
        };
        let date = date
            .map(|date| calendar.soonest_working_day(date, mode))
            .transpose()?;
        return Ok(DateSpan {
            start_date: date,
            due_date: date,
            duration: None,
            day_counting: mode,
        });
    }

    let mut span = span;
    if let Some(earliest) = soonest {
        let derived_due = span
            .duration
            .filter(|days| *days > 0)
            .map(|days| calendar.shift_by_duration(earliest, days, mode))
            .transpose()?;

        match (span.start_date, span.due_date) {
            (None, None) => {
                span.start_date = Some(earliest);
                span.due_date = derived_due;
            }
            (None, Some(due)) => {
                span.start_date = Some(earliest);
                span.due_date = Some(due.max(earliest));
            }
            (Some(start), due) if start < earliest => {
                span.start_date = Some(earliest);
                span.due_date = match due {
                    Some(due) if due >= earliest => Some(due),
                    Some(_) => derived_due.or(Some(earliest)),
                    None => derived_due,
                };
            }
            _ => {}
        }
    }

    span.snap_to_working_days(calendar)?.recount(calendar)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::{DayCounting, WorkCalendar};

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn span(start: Option<NaiveDate>, due: Option<NaiveDate>, duration: Option<u32>) -> DateSpan {
        DateSpan {
            start_date: start,
            due_date: due,
            duration,
            day_counting: DayCounting::WorkingDaysOnly,
        }
    }

    #[test]
    fn dateless_task_gets_start_only() {
        let cal = WorkCalendar::default();
        let out = follow(&cal, span(None, None, None), false, Some(d(2025, 1, 7))).unwrap();
        assert_eq!(out, span(Some(d(2025, 1, 7)), None, None));
    }

    #[test]
    fn dateless_task_with_duration_gets_range() {
        let cal = WorkCalendar::default();
        let out = follow(&cal, span(None, None, Some(3)), false, Some(d(2025, 1, 9))).unwrap();
        // Thu, Fri, Mon
        assert_eq!(out, span(Some(d(2025, 1, 9)), Some(d(2025, 1, 13)), Some(3)));
    }

    #[test]
    fn due_date_is_kept_when_still_after_start() {
        let cal = WorkCalendar::default();
        let out = follow(
            &cal,
            span(Some(d(2025, 1, 6)), Some(d(2025, 1, 10)), Some(5)),
            false,
            Some(d(2025, 1, 9)),
        )
        .unwrap();
        assert_eq!(out, span(Some(d(2025, 1, 9)), Some(d(2025, 1, 10)), Some(2)));
    }

    #[test]
    fn overtaken_due_date_is_rederived_from_duration() {
        let cal = WorkCalendar::default();
        let out = follow(
            &cal,
            span(Some(d(2025, 1, 6)), Some(d(2025, 1, 7)), Some(2)),
            false,
            Some(d(2025, 1, 9)),
        )
        .unwrap();
        assert_eq!(out, span(Some(d(2025, 1, 9)), Some(d(2025, 1, 10)), Some(2)));
    }

    #[test]
    fn satisfied_task_does_not_move() {
        let cal = WorkCalendar::default();
        let current = span(Some(d(2025, 1, 13)), Some(d(2025, 1, 14)), Some(2));
        let out = follow(&cal, current, false, Some(d(2025, 1, 9))).unwrap();
        assert_eq!(out, current);
    }

    #[test]
    fn weekend_start_drifts_to_monday() {
        let cal = WorkCalendar::default();
        let out = follow(&cal, span(Some(d(2025, 1, 11)), Some(d(2025, 1, 14)), Some(2)), false, None)
            .unwrap();
        assert_eq!(out, span(Some(d(2025, 1, 13)), Some(d(2025, 1, 14)), Some(2)));
    }

    #[test]
    fn milestone_stays_single_day() {
        let cal = WorkCalendar::default();
        let out = follow(&cal, span(Some(d(2025, 1, 6)), Some(d(2025, 1, 6)), None), true, Some(d(2025, 1, 8)))
            .unwrap();
        assert_eq!(out, span(Some(d(2025, 1, 8)), Some(d(2025, 1, 8)), None));
    }
}
