//! Business day arithmetic. Upstream rates only move Monday to Friday.

use chrono::{Datelike, Days, NaiveDate, Weekday};

pub struct BusinessDayCalendar;

impl BusinessDayCalendar {
    pub fn is_business_day(date: NaiveDate) -> bool {
        !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
    }

    /// Weekdays in `[from, to]`, ascending. Empty when `from > to`.
    pub fn business_days_in_range(from: NaiveDate, to: NaiveDate) -> Vec<NaiveDate> {
        from.iter_days()
            .take_while(|day| *day <= to)
            .filter(|day| Self::is_business_day(*day))
            .collect()
    }

    /// Saturday steps back one day, Sunday two.
    pub fn last_business_day_on_or_before(date: NaiveDate) -> NaiveDate {
        let back = match date.weekday() {
            Weekday::Sat => 1,
            Weekday::Sun => 2,
            _ => 0,
        };
        date.checked_sub_days(Days::new(back)).unwrap_or(date)
    }
}
