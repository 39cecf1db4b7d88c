//! Working-day calendar.
//!
//! A project calendar decides which dates are working days. All day counting
//! and date shifting used by the scheduler goes through [`WorkingCalendar`],
//! so alternative calendars (e.g. one backed by a database) can be injected.

use chrono::{Datelike, Days, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

/// How a task counts days toward its duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DayCounting {
    /// Only working days count, and dates snap to working days.
    #[default]
    WorkingDaysOnly,
    /// Every calendar day counts.
    AllDays,
}

impl DayCounting {
    pub fn as_str(&self) -> &'static str {
        match self {
            DayCounting::WorkingDaysOnly => "working_days_only",
            DayCounting::AllDays => "all_days",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CalendarError {
    #[error("due date {due} is before start date {start}")]
    DueBeforeStart { start: NaiveDate, due: NaiveDate },

    #[error("calendar requires at least one working weekday")]
    NoWorkingDays,

    #[error("invalid year range {start_year}..={end_year}")]
    InvalidYearRange { start_year: i32, end_year: i32 },

    #[error("date arithmetic from {date} leaves the supported calendar range")]
    OutOfRange { date: NaiveDate },
}

/// Day arithmetic over a working-day predicate.
///
/// Only [`is_working_day`](WorkingCalendar::is_working_day) is required; the
/// other operations are derived from it. Implementations must guarantee that
/// a working day is always reachable in both directions, otherwise the shift
/// operations do not terminate.
pub trait WorkingCalendar {
    fn is_working_day(&self, date: NaiveDate) -> bool;

    /// Whether `date` counts under `mode`.
    fn is_working(&self, date: NaiveDate, mode: DayCounting) -> bool {
        match mode {
            DayCounting::AllDays => true,
            DayCounting::WorkingDaysOnly => self.is_working_day(date),
        }
    }

    /// Number of days spanned by `start..=due` under `mode`.
    fn day_count(
        &self,
        start: NaiveDate,
        due: NaiveDate,
        mode: DayCounting,
    ) -> Result<u32, CalendarError> {
        if due < start {
            return Err(CalendarError::DueBeforeStart { start, due });
        }
        let span = (due - start).num_days() + 1;
        if mode == DayCounting::AllDays {
            return u32::try_from(span).map_err(|_| CalendarError::OutOfRange { date: start });
        }

        let mut count: u32 = 0;
        for current in start.iter_days().take_while(|date| *date <= due) {
            if self.is_working_day(current) {
                count += 1;
            }
        }
        Ok(count)
    }

    /// Earliest date on or after `date` that counts under `mode`.
    fn soonest_working_day(
        &self,
        date: NaiveDate,
        mode: DayCounting,
    ) -> Result<NaiveDate, CalendarError> {
        let mut current = date;
        while !self.is_working(current, mode) {
            current = current
                .succ_opt()
                .ok_or(CalendarError::OutOfRange { date })?;
        }
        Ok(current)
    }

    /// The due date such that `day_count(start, due, mode) == duration`.
    ///
    /// A zero duration spans nothing and returns `start` unchanged.
    fn shift_by_duration(
        &self,
        start: NaiveDate,
        duration: u32,
        mode: DayCounting,
    ) -> Result<NaiveDate, CalendarError> {
        if duration == 0 {
            return Ok(start);
        }
        let out_of_range = CalendarError::OutOfRange { date: start };
        // Any mode needs at least `duration - 1` calendar days.
        let lower_bound = start
            .checked_add_days(Days::new(u64::from(duration) - 1))
            .ok_or(out_of_range.clone())?;
        if mode == DayCounting::AllDays {
            return Ok(lower_bound);
        }

        let mut current = start;
        let mut remaining = duration;
        loop {
            if self.is_working_day(current) {
                remaining -= 1;
                if remaining == 0 {
                    return Ok(current);
                }
            }
            current = current.succ_opt().ok_or(out_of_range.clone())?;
        }
    }

    /// The start date such that `day_count(start, due, mode) == duration`.
    fn shift_back_by_duration(
        &self,
        due: NaiveDate,
        duration: u32,
        mode: DayCounting,
    ) -> Result<NaiveDate, CalendarError> {
        if duration == 0 {
            return Ok(due);
        }
        let out_of_range = CalendarError::OutOfRange { date: due };
        let upper_bound = due
            .checked_sub_days(Days::new(u64::from(duration) - 1))
            .ok_or(out_of_range.clone())?;
        if mode == DayCounting::AllDays {
            return Ok(upper_bound);
        }

        let mut current = due;
        let mut remaining = duration;
        loop {
            if self.is_working_day(current) {
                remaining -= 1;
                if remaining == 0 {
                    return Ok(current);
                }
            }
            current = current.pred_opt().ok_or(out_of_range.clone())?;
        }
    }

    /// First admissible start for a task following a predecessor due on
    /// `predecessor_due` with `lag` days of gap, counted in `mode`.
    fn soonest_start_after(
        &self,
        predecessor_due: NaiveDate,
        lag: u32,
        mode: DayCounting,
    ) -> Result<NaiveDate, CalendarError> {
        let out_of_range = CalendarError::OutOfRange {
            date: predecessor_due,
        };
        // The start is at least `lag + 1` calendar days out in any mode.
        let lower_bound = predecessor_due
            .checked_add_days(Days::new(u64::from(lag) + 1))
            .ok_or(out_of_range.clone())?;
        let after_lag = if mode == DayCounting::AllDays {
            lower_bound
        } else {
            let mut current = predecessor_due;
            let mut remaining = lag;
            while remaining > 0 {
                current = current.succ_opt().ok_or(out_of_range.clone())?;
                if self.is_working_day(current) {
                    remaining -= 1;
                }
            }
            current.succ_opt().ok_or(out_of_range)?
        };
        self.soonest_working_day(after_lag, mode)
    }
}

impl<T: WorkingCalendar + ?Sized> WorkingCalendar for &T {
    fn is_working_day(&self, date: NaiveDate) -> bool {
        (**self).is_working_day(date)
    }
}

/// Weekday rules plus single-date overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkCalendar {
    non_working_days: HashSet<Weekday>,
    holidays: HashSet<NaiveDate>,
    working_overrides: HashSet<NaiveDate>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearRange {
    pub start_year: i32,
    pub end_year: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkCalendarConfig {
    working_days: Vec<Weekday>,
    #[serde(default)]
    holidays: Vec<NaiveDate>,
    #[serde(default)]
    working_overrides: Vec<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    us_federal_holidays: Option<YearRange>,
}

impl Default for WorkCalendar {
    fn default() -> Self {
        Self {
            non_working_days: HashSet::from([Weekday::Sat, Weekday::Sun]),
            holidays: HashSet::new(),
            working_overrides: HashSet::new(),
        }
    }
}

impl WorkingCalendar for WorkCalendar {
    fn is_working_day(&self, date: NaiveDate) -> bool {
        if self.working_overrides.contains(&date) {
            return true;
        }
        !self.holidays.contains(&date) && !self.non_working_days.contains(&date.weekday())
    }
}

impl WorkCalendar {
    const ALL_WEEKDAYS: [Weekday; 7] = [
        Weekday::Mon,
        Weekday::Tue,
        Weekday::Wed,
        Weekday::Thu,
        Weekday::Fri,
        Weekday::Sat,
        Weekday::Sun,
    ];

    pub fn custom<I, J>(working_days: I, holidays: J) -> Result<Self, CalendarError>
    where
        I: IntoIterator<Item = Weekday>,
        J: IntoIterator<Item = NaiveDate>,
    {
        let config = WorkCalendarConfig::new(working_days, holidays)?;
        Self::from_config(&config)
    }

    pub fn from_config(config: &WorkCalendarConfig) -> Result<Self, CalendarError> {
        let working_set: HashSet<Weekday> = config.working_days.iter().copied().collect();
        if working_set.is_empty() {
            return Err(CalendarError::NoWorkingDays);
        }
        let non_working_days = Self::ALL_WEEKDAYS
            .into_iter()
            .filter(|day| !working_set.contains(day))
            .collect();

        let mut calendar = Self {
            non_working_days,
            holidays: config.holidays.iter().copied().collect(),
            working_overrides: config.working_overrides.iter().copied().collect(),
        };
        if let Some(range) = config.us_federal_holidays {
            calendar.add_us_federal_holidays(range.start_year, range.end_year)?;
        }
        Ok(calendar)
    }

    pub fn to_config(&self) -> WorkCalendarConfig {
        WorkCalendarConfig::from(self)
    }

    /// Mark a single date as non-working.
    pub fn add_holiday(&mut self, date: NaiveDate) {
        self.holidays.insert(date);
    }

    pub fn add_holidays(&mut self, dates: &[NaiveDate]) {
        self.holidays.extend(dates);
    }

    /// Mark a single date as working, regardless of weekday or holidays.
    pub fn add_working_day(&mut self, date: NaiveDate) {
        self.working_overrides.insert(date);
    }

    /// Replace the weekday rules (e.g. Mon-Sat for six-day weeks).
    pub fn set_working_days(&mut self, days: &[Weekday]) -> Result<(), CalendarError> {
        if days.is_empty() {
            return Err(CalendarError::NoWorkingDays);
        }
        self.non_working_days = Self::ALL_WEEKDAYS
            .into_iter()
            .filter(|day| !days.contains(day))
            .collect();
        Ok(())
    }

    /// Add US federal holidays for `start_year..=end_year`.
    pub fn add_us_federal_holidays(
        &mut self,
        start_year: i32,
        end_year: i32,
    ) -> Result<(), CalendarError> {
        if start_year > end_year {
            return Err(CalendarError::InvalidYearRange {
                start_year,
                end_year,
            });
        }
        for year in start_year..=end_year {
            let dates = [
                NaiveDate::from_ymd_opt(year, 1, 1),
                Self::nth_weekday(year, 1, Weekday::Mon, 3),
                Self::nth_weekday(year, 2, Weekday::Mon, 3),
                Self::last_weekday(year, 5, Weekday::Mon),
                NaiveDate::from_ymd_opt(year, 7, 4),
                Self::nth_weekday(year, 9, Weekday::Mon, 1),
                Self::nth_weekday(year, 10, Weekday::Mon, 2),
                NaiveDate::from_ymd_opt(year, 11, 11),
                Self::nth_weekday(year, 11, Weekday::Thu, 4),
                NaiveDate::from_ymd_opt(year, 12, 25),
            ];
            let Some(dates) = dates.into_iter().collect::<Option<Vec<_>>>() else {
                return Err(CalendarError::InvalidYearRange {
                    start_year,
                    end_year,
                });
            };
            self.holidays.extend(dates);
        }
        Ok(())
    }

    /// The nth occurrence of a weekday in a month.
    fn nth_weekday(year: i32, month: u32, weekday: Weekday, n: u8) -> Option<NaiveDate> {
        NaiveDate::from_weekday_of_month_opt(year, month, weekday, n)
    }

    /// The last occurrence of a weekday in a month.
    fn last_weekday(year: i32, month: u32, weekday: Weekday) -> Option<NaiveDate> {
        let first_of_next = if month == 12 {
            NaiveDate::from_ymd_opt(year + 1, 1, 1)?
        } else {
            NaiveDate::from_ymd_opt(year, month + 1, 1)?
        };
        let mut date = first_of_next.pred_opt()?;
        while date.weekday() != weekday {
            date = date.pred_opt()?;
        }
        Some(date)
    }
}

impl WorkCalendarConfig {
    pub fn new<I, J>(working_days: I, holidays: J) -> Result<Self, CalendarError>
    where
        I: IntoIterator<Item = Weekday>,
        J: IntoIterator<Item = NaiveDate>,
    {
        let mut working: Vec<Weekday> = working_days.into_iter().collect();
        if working.is_empty() {
            return Err(CalendarError::NoWorkingDays);
        }
        working.sort_by_key(|wd| wd.num_days_from_monday());
        working.dedup();

        let mut holidays: Vec<NaiveDate> = holidays.into_iter().collect();
        holidays.sort();
        holidays.dedup();

        Ok(Self {
            working_days: working,
            holidays,
            working_overrides: Vec::new(),
            us_federal_holidays: None,
        })
    }

    pub fn with_working_overrides<I>(mut self, dates: I) -> Self
    where
        I: IntoIterator<Item = NaiveDate>,
    {
        self.working_overrides.extend(dates);
        self.working_overrides.sort();
        self.working_overrides.dedup();
        self
    }

    pub fn with_us_federal_holidays(mut self, start_year: i32, end_year: i32) -> Self {
        self.us_federal_holidays = Some(YearRange {
            start_year,
            end_year,
        });
        self
    }

    pub fn working_days(&self) -> &[Weekday] {
        &self.working_days
    }

    pub fn holidays(&self) -> &[NaiveDate] {
        &self.holidays
    }

    pub fn working_overrides(&self) -> &[NaiveDate] {
        &self.working_overrides
    }
}

impl Default for WorkCalendarConfig {
    fn default() -> Self {
        WorkCalendarConfig::from(&WorkCalendar::default())
    }
}

impl From<&WorkCalendar> for WorkCalendarConfig {
    fn from(calendar: &WorkCalendar) -> Self {
        let working_days = WorkCalendar::ALL_WEEKDAYS
            .into_iter()
            .filter(|day| !calendar.non_working_days.contains(day))
            .collect();

        let mut holidays: Vec<NaiveDate> = calendar.holidays.iter().copied().collect();
        holidays.sort();
        let mut working_overrides: Vec<NaiveDate> =
            calendar.working_overrides.iter().copied().collect();
        working_overrides.sort();

        Self {
            working_days,
            holidays,
            working_overrides,
            us_federal_holidays: None,
        }
    }
}
