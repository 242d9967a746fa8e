//! Calendar date dimension

use crate::model::DimDate;
use chrono::{Datelike, NaiveDate, NaiveTime};

/// One row per day in `start..=end`; empty when `start > end`
pub fn date_dimension(start: NaiveDate, end: NaiveDate) -> Vec<DimDate> {
    start
        .iter_days()
        .take_while(|day| *day <= end)
        .map(|day| {
            let weekday = day.weekday().num_days_from_monday();
            DimDate {
                date: day.and_time(NaiveTime::MIN),
                quarter: (day.month() - 1) / 3 + 1,
                month: day.month(),
                year: day.year(),
                // Same as strftime %W: weeks start on Monday, days before
                // the first Monday fall in week 0
                week_by_year: (day.ordinal0() + 7 - weekday) / 7,
                day: day.day(),
                weekday,
                weekday_name: day.format("%A").to_string(),
            }
        })
        .collect()
}
