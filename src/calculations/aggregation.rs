use crate::calendar::{CalendarError, DayCounting, WorkingCalendar};
use crate::date_span::DateSpan;
use crate::task::Task;
use chrono::NaiveDate;

/// The span covering every dated child, or `None` if no child has a date.
///
/// The parent counts working days only if every dated child does.
pub fn aggregate_children<'t, C, I>(calendar: &C, children: I) -> Result<Option<DateSpan>, CalendarError>
where
    C: WorkingCalendar + ?Sized,
    I: IntoIterator<Item = &'t Task>,
{
    let mut start = None;
    let mut due = None;
    let mut day_counting = DayCounting::WorkingDaysOnly;

    for child in children.into_iter().filter(|child| child.is_dated()) {
        if let Some(date) = child.effective_start() {
            start = Some(start.map_or(date, |current: NaiveDate| current.min(date)));
        }
        due = due.max(child.effective_due());
        if child.day_counting == DayCounting::AllDays {
            day_counting = DayCounting::AllDays;
        }
    }

    let (Some(start), Some(due)) = (start, due) else {
        return Ok(None);
    };
    DateSpan {
        start_date: Some(start),
        due_date: Some(due),
        duration: None,
        day_counting,
    }
    .recount(calendar)
    .map(Some)
}
