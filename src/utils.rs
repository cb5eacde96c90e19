use chrono::{Datelike as _, Duration, NaiveDate};

pub fn is_leap_year(year: i32) -> bool {
    year % 4 == 0 && (year % 100 != 0 || year % 400 == 0)
}

pub fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        4 | 6 | 9 | 11 => 30,
        2 if is_leap_year(year) => 29,
        2 => 28,
        _ => 31,
    }
}

/// Monday on or before `date`, `None` when that Monday predates `NaiveDate::MIN`
pub fn start_of_week(date: NaiveDate) -> Option<NaiveDate> {
    date.checked_sub_signed(Duration::days(date.weekday().num_days_from_monday() as i64))
}

pub fn start_of_month(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.day0() as i64)
}

pub fn end_of_month(date: NaiveDate) -> NaiveDate {
    start_of_month(date) + Duration::days(days_in_month(date.year(), date.month()) as i64 - 1)
}

pub fn start_of_year(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.ordinal0() as i64)
}
