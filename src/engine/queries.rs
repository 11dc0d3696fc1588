use chrono::{Datelike, NaiveDate, TimeDelta};

use crate::catalog;
use crate::limits::RECENT_ACTIVITY_LEN;
use crate::model::*;
use crate::store;

use super::availability::{slot_state, SlotState};
use super::{BookingError, Engine};

impl Engine {
    pub async fn bookings(&self) -> Result<Vec<Booking>, BookingError> {
        Ok(store::load(self.store.as_ref()).await?)
    }

    pub async fn blocked_periods(&self) -> Result<Vec<BlockedPeriod>, BookingError> {
        Ok(store::load(self.store.as_ref()).await?)
    }

    /// Fresh copy of both collections, for views and reports.
    pub async fn snapshot(&self) -> Result<Schedule, BookingError> {
        Ok(store::load_schedule(self.store.as_ref()).await?)
    }
}

// ── Week calendar ─────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotView<'a> {
    pub time: &'static str,
    pub state: SlotState<'a>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayView<'a> {
    pub date: NaiveDate,
    pub slots: Vec<SlotView<'a>>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WeekSummary {
    pub total: usize,
    pub booked: usize,
    pub blocked: usize,
    pub available: usize,
}

/// Monday to Friday of one week, listing only days that have sessions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeekView<'a> {
    pub monday: NaiveDate,
    pub friday: NaiveDate,
    pub days: Vec<DayView<'a>>,
    pub summary: WeekSummary,
}

impl WeekView<'_> {
    pub fn next_anchor(&self) -> NaiveDate {
        shift(self.monday, 7)
    }

    pub fn prev_anchor(&self) -> NaiveDate {
        shift(self.monday, -7)
    }
}

fn shift(date: NaiveDate, days: i64) -> NaiveDate {
    date.checked_add_signed(TimeDelta::days(days)).unwrap_or(date)
}

/// Monday of the week shown for `anchor`. A Sunday looks ahead to the
/// following Monday.
pub fn week_monday(anchor: NaiveDate) -> NaiveDate {
    let from_sunday = i64::from(anchor.weekday().num_days_from_sunday());
    shift(anchor, 1 - from_sunday)
}

pub fn week_view(schedule: &Schedule, anchor: NaiveDate) -> WeekView<'_> {
    let monday = week_monday(anchor);
    let mut summary = WeekSummary::default();
    let mut days = Vec::new();

    for offset in 0..5 {
        let date = shift(monday, offset);
        let times = catalog::slots_on(date);
        if times.is_empty() {
            continue;
        }
        let slots: Vec<SlotView<'_>> = times
            .iter()
            .map(|&time| {
                let state = slot_state(&schedule.bookings, &schedule.blocked, date, time);
                summary.total += 1;
                match state {
                    SlotState::Booked(_) => summary.booked += 1,
                    SlotState::Blocked => summary.blocked += 1,
                    SlotState::Available => summary.available += 1,
                }
                SlotView { time, state }
            })
            .collect();
        days.push(DayView { date, slots });
    }

    debug_assert_eq!(summary.available, summary.total - summary.booked - summary.blocked);
    WeekView {
        monday,
        friday: shift(monday, 4),
        days,
        summary,
    }
}

// ── Analytics ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct Analytics<'a> {
    /// Non-cancelled bookings created in the last 7 days.
    pub week_bookings: usize,
    /// Non-cancelled bookings created in the last 30 days.
    pub month_bookings: usize,
    /// Percentage of bookings created in the last 30 days that were cancelled.
    pub cancel_rate: f64,
    pub avg_per_day: f64,
    /// Most recently created bookings, newest first.
    pub recent: Vec<&'a Booking>,
}

pub fn analytics(bookings: &[Booking], now: Timestamp) -> Analytics<'_> {
    let week_ago = now - TimeDelta::days(7);
    let month_ago = now - TimeDelta::days(30);

    let week_bookings = bookings
        .iter()
        .filter(|b| b.created_at >= week_ago && b.is_active())
        .count();
    let month: Vec<&Booking> = bookings.iter().filter(|b| b.created_at >= month_ago).collect();
    let month_bookings = month.iter().filter(|b| b.is_active()).count();
    let cancelled = month.len() - month_bookings;

    let cancel_rate = if month.is_empty() {
        0.0
    } else {
        cancelled as f64 / month.len() as f64 * 100.0
    };

    let mut recent: Vec<&Booking> = bookings.iter().collect();
    recent.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    recent.truncate(RECENT_ACTIVITY_LEN);

    Analytics {
        week_bookings,
        month_bookings,
        cancel_rate,
        avg_per_day: week_bookings as f64 / 7.0,
        recent,
    }
}
