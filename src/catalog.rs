use chrono::{Datelike, NaiveDate, Weekday};

const TUESDAY: &[&str] = &["10:00 – 11:00", "11:30 – 12:00", "13:00 – 14:00"];
const FRIDAY: &[&str] = &["10:00 – 11:00", "11:30 – 12:30", "13:00 – 14:00"];

/// Ordered slot labels offered on `weekday`. Empty when there are no sessions.
pub fn slots_for(weekday: Weekday) -> &'static [&'static str] {
    match weekday {
        Weekday::Tue => TUESDAY,
        Weekday::Fri => FRIDAY,
        _ => &[],
    }
}

pub fn slots_on(date: NaiveDate) -> &'static [&'static str] {
    slots_for(date.weekday())
}

/// True if `time` is one of the labels offered on the weekday of `date`.
pub fn offers(date: NaiveDate, time: &str) -> bool {
    slots_on(date).contains(&time)
}
